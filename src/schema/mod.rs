//! Schema subsystem for typed-dto
//!
//! A schema is the declared shape of a DTO: an ordered list of fields, each
//! with a type declaration and an optional default.
//!
//! # Design Principles
//!
//! - Declarations are parsed best effort; a bad annotation never fails
//! - Class references are resolved lazily, by name, against the registry
//! - Schemas are immutable once registered
//! - Compiled schemas are shared read-only across constructions

mod errors;
mod parser;
mod registry;
mod types;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use parser::{compile_field, parse_type, ParseContext};
pub use registry::SchemaRegistry;
pub use types::{
    CompiledSchema, FieldDecl, FieldSpec, ScalarKind, Schema, SchemaRef, SequenceSyntax,
    TypeDeclaration, TypeDescriptor,
};
