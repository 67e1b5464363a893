//! typed-dto - Strictly validated data transfer objects
//!
//! Schemas declare fields with native types or textual annotations such as
//! `string|null`, `Child[]` or `array<string, int>`. Loosely typed input is
//! cast into nested instances where a schema is named and checked against
//! every declaration; all violations of one construction are reported
//! together.

pub mod config;
pub mod dto;
pub mod schema;
pub mod value;

pub use config::{ConfigError, EngineConfig};
pub use dto::{Diagnostic, Dto, DtoCollection, DtoError, DtoResult, ValidationError, Violation};
pub use schema::{FieldDecl, Schema, SchemaError, SchemaRegistry, TypeDescriptor};
pub use value::{Key, Map, Value, ValueKind};
