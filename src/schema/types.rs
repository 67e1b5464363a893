//! Schema and type descriptor definitions
//!
//! Recognized descriptor shapes:
//! - any: accepts every value, null included
//! - scalar: string, integer, float, boolean (exact runtime kind)
//! - class: an instance of a named schema, or a mapping castable into one
//! - list: a sequence whose elements all match the element descriptor
//! - map: an associative container whose keys and values all match
//! - union: at least one alternative matches
//! - nullable: null, or whatever the inner descriptor accepts

use std::fmt;
use std::sync::Arc;

use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::Value;

/// Scalar kinds, matched against runtime kinds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Boolean,
}

impl ScalarKind {
    /// Resolves a scalar keyword (`int` and `integer`, `float` and `double`,
    /// `bool` and `boolean`, `string`), case-insensitively.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "string" => Some(ScalarKind::String),
            "int" | "integer" => Some(ScalarKind::Integer),
            "float" | "double" => Some(ScalarKind::Float),
            "bool" | "boolean" => Some(ScalarKind::Boolean),
            _ => None,
        }
    }

    /// Returns the canonical name, which is also the runtime kind name.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "double",
            ScalarKind::Boolean => "boolean",
        }
    }

    /// True iff the value's runtime kind is exactly this kind.
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ScalarKind::String, Value::String(_))
                | (ScalarKind::Integer, Value::Int(_))
                | (ScalarKind::Float, Value::Float(_))
                | (ScalarKind::Boolean, Value::Bool(_))
        )
    }
}

/// Reference to a schema by name, resolved lazily against a registry.
///
/// Resolution never happens while descriptors are built, so schemas may
/// refer to themselves or to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaRef {
    /// The name as declared, used when rendering
    written: String,
    /// Fully qualified names to try, in order
    candidates: Vec<String>,
    absolute: bool,
}

impl SchemaRef {
    /// A reference to a fully qualified schema name.
    pub fn absolute(name: impl Into<String>) -> Self {
        let written = name.into();
        let qualified = written.trim_start_matches('\\').to_string();
        Self {
            written,
            candidates: vec![qualified],
            absolute: true,
        }
    }

    /// A reference as written inside a schema living in `namespace`.
    ///
    /// A leading `\` makes the name absolute. Otherwise the name is tried
    /// relative to the namespace first, then as an absolute name.
    pub fn relative(written: impl Into<String>, namespace: Option<&str>) -> Self {
        let written = written.into();
        if written.starts_with('\\') {
            return Self::absolute(written);
        }
        let mut candidates = Vec::with_capacity(2);
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            candidates.push(format!("{}\\{}", ns, written));
        }
        candidates.push(written.clone());
        Self {
            written,
            candidates,
            absolute: false,
        }
    }

    pub fn written(&self) -> &str {
        &self.written
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

/// Which syntax declared a list, kept for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceSyntax {
    /// `T[]`
    Brackets,
    /// `iterable<T>`
    Iterable,
}

/// Structured representation of the shapes a field accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// Matches every value, including null
    Any,
    /// Matches values of exactly this runtime kind
    Scalar(ScalarKind),
    /// Matches instances of the referenced schema, or castable mappings
    ClassType(SchemaRef),
    /// Matches sequences whose every element matches `element`
    ListOf {
        element: Box<TypeDescriptor>,
        syntax: SequenceSyntax,
    },
    /// Matches associative containers with conforming keys and values
    MapOf {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    /// Matches if any alternative matches, tried left to right
    Union(Vec<TypeDescriptor>),
    /// Matches null or whatever `inner` matches
    Nullable(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    pub fn string() -> Self {
        TypeDescriptor::Scalar(ScalarKind::String)
    }

    pub fn int() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Integer)
    }

    pub fn float() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Float)
    }

    pub fn bool() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Boolean)
    }

    /// A class reference to a fully qualified schema name.
    pub fn class(name: impl Into<String>) -> Self {
        TypeDescriptor::ClassType(SchemaRef::absolute(name))
    }

    /// `T[]`
    pub fn list_of(element: TypeDescriptor) -> Self {
        TypeDescriptor::ListOf {
            element: Box::new(element),
            syntax: SequenceSyntax::Brackets,
        }
    }

    /// `iterable<T>`
    pub fn iterable_of(element: TypeDescriptor) -> Self {
        TypeDescriptor::ListOf {
            element: Box::new(element),
            syntax: SequenceSyntax::Iterable,
        }
    }

    /// `array<K, V>`
    pub fn map_of(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::MapOf {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Combines alternatives. A single alternative collapses to itself and
    /// any `Any` alternative absorbs the whole union.
    pub fn union(mut alternatives: Vec<TypeDescriptor>) -> Self {
        if alternatives.iter().any(TypeDescriptor::is_any) {
            return TypeDescriptor::Any;
        }
        if alternatives.len() == 1 {
            return alternatives.remove(0);
        }
        TypeDescriptor::Union(alternatives)
    }

    /// Wraps in `Nullable` unless the descriptor already accepts null.
    pub fn nullable(inner: TypeDescriptor) -> Self {
        match inner {
            TypeDescriptor::Any | TypeDescriptor::Nullable(_) => inner,
            other => TypeDescriptor::Nullable(Box::new(other)),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TypeDescriptor::Any)
    }

    /// True if casting may apply: the descriptor is a class reference or
    /// holds one among its alternatives or container element types.
    pub fn contains_class(&self) -> bool {
        match self {
            TypeDescriptor::ClassType(_) => true,
            TypeDescriptor::ListOf { element, .. } => element.contains_class(),
            TypeDescriptor::MapOf { value, .. } => value.contains_class(),
            TypeDescriptor::Union(alts) => alts.iter().any(TypeDescriptor::contains_class),
            TypeDescriptor::Nullable(inner) => inner.contains_class(),
            TypeDescriptor::Any | TypeDescriptor::Scalar(_) => false,
        }
    }
}

impl TypeDescriptor {
    /// Annotation text that reads back to this descriptor from any
    /// namespace. Absolute class references keep a leading `\`.
    pub fn to_annotation(&self) -> String {
        struct Annotation<'a>(&'a TypeDescriptor);

        impl fmt::Display for Annotation<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.write(f, true)
            }
        }

        Annotation(self).to_string()
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, annotation: bool) -> fmt::Result {
        match self {
            TypeDescriptor::Any => f.write_str("mixed"),
            TypeDescriptor::Scalar(kind) => f.write_str(kind.name()),
            TypeDescriptor::ClassType(schema) if annotation && schema.absolute => {
                write!(f, "\\{}", schema.written.trim_start_matches('\\'))
            }
            TypeDescriptor::ClassType(schema) => f.write_str(schema.written()),
            TypeDescriptor::ListOf { element, syntax } => match (syntax, element.as_ref()) {
                (SequenceSyntax::Iterable, TypeDescriptor::Any) => f.write_str("iterable"),
                (SequenceSyntax::Iterable, element) => {
                    f.write_str("iterable<")?;
                    element.write(f, annotation)?;
                    f.write_str(">")
                }
                (
                    SequenceSyntax::Brackets,
                    element @ (TypeDescriptor::Union(_) | TypeDescriptor::Nullable(_)),
                ) => {
                    f.write_str("(")?;
                    element.write(f, annotation)?;
                    f.write_str(")[]")
                }
                (SequenceSyntax::Brackets, element) => {
                    element.write(f, annotation)?;
                    f.write_str("[]")
                }
            },
            TypeDescriptor::MapOf { key, value } => {
                if key.is_any() && value.is_any() {
                    return f.write_str("array");
                }
                f.write_str("array<")?;
                key.write(f, annotation)?;
                f.write_str(", ")?;
                value.write(f, annotation)?;
                f.write_str(">")
            }
            TypeDescriptor::Union(alts) if alts.is_empty() => f.write_str("never"),
            TypeDescriptor::Union(alts) => {
                for (i, alt) in alts.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    alt.write(f, annotation)?;
                }
                Ok(())
            }
            TypeDescriptor::Nullable(inner) => match inner.as_ref() {
                TypeDescriptor::Union(alts) if alts.is_empty() => f.write_str("null"),
                inner => {
                    inner.write(f, annotation)?;
                    f.write_str("|null")
                }
            },
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, false)
    }
}

/// How a field's type is declared.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypeDeclaration {
    /// No declaration: accepts any value
    #[default]
    Untyped,
    /// A native type token, optionally marked nullable by the declaration
    Native { name: String, nullable: bool },
    /// A textual annotation such as `string|null` or `Child[]`
    Annotation(String),
    /// A descriptor built directly in Rust
    Descriptor(TypeDescriptor),
}

/// One declared field of a schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawFieldDecl")]
pub struct FieldDecl {
    /// Field name, unique within the schema
    pub name: String,
    /// Type declaration
    pub declaration: TypeDeclaration,
    /// Default used when the input has no entry; never type-checked
    pub default: Option<Value>,
    /// Input key to read instead of `name`
    pub alias: Option<String>,
    /// Shared fields are not part of instance data
    pub is_static: bool,
}

impl FieldDecl {
    fn with_declaration(name: impl Into<String>, declaration: TypeDeclaration) -> Self {
        Self {
            name: name.into(),
            declaration,
            default: None,
            alias: None,
            is_static: false,
        }
    }

    /// A field without any type declaration.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::with_declaration(name, TypeDeclaration::Untyped)
    }

    /// A field typed by a textual annotation.
    pub fn annotated(name: impl Into<String>, annotation: impl Into<String>) -> Self {
        Self::with_declaration(name, TypeDeclaration::Annotation(annotation.into()))
    }

    /// A field with a native type token.
    pub fn native(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::with_declaration(
            name,
            TypeDeclaration::Native {
                name: type_name.into(),
                nullable: false,
            },
        )
    }

    /// A field typed by a descriptor built in Rust.
    pub fn typed(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self::with_declaration(name, TypeDeclaration::Descriptor(descriptor))
    }

    /// Marks a native declaration nullable (`?T`). Other declarations get
    /// their descriptor wrapped in `Nullable`.
    pub fn nullable(mut self) -> Self {
        self.declaration = match self.declaration {
            TypeDeclaration::Native { name, .. } => TypeDeclaration::Native {
                name,
                nullable: true,
            },
            TypeDeclaration::Descriptor(d) => {
                TypeDeclaration::Descriptor(TypeDescriptor::nullable(d))
            }
            TypeDeclaration::Annotation(text) => TypeDeclaration::Annotation(format!("{}|null", text)),
            TypeDeclaration::Untyped => TypeDeclaration::Untyped,
        };
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn alias(mut self, key: impl Into<String>) -> Self {
        self.alias = Some(key.into());
        self
    }

    pub fn shared(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Returns the input key this field reads from.
    pub fn source_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// On-disk shape of a field declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFieldDecl {
    name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    native: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    nullable: bool,
    #[serde(rename = "var", default, skip_serializing_if = "Option::is_none")]
    annotation: Option<String>,
    // An explicit `null` still counts as a declared default
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    #[serde(rename = "static", default, skip_serializing_if = "std::ops::Not::not")]
    is_static: bool,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl From<RawFieldDecl> for FieldDecl {
    fn from(raw: RawFieldDecl) -> Self {
        let declaration = match (raw.native, raw.annotation) {
            (Some(name), _) => TypeDeclaration::Native {
                name,
                nullable: raw.nullable,
            },
            (None, Some(text)) => TypeDeclaration::Annotation(text),
            (None, None) => TypeDeclaration::Untyped,
        };
        Self {
            name: raw.name,
            declaration,
            default: raw.default.map(Value::from),
            alias: raw.alias,
            is_static: raw.is_static,
        }
    }
}

impl TryFrom<&FieldDecl> for RawFieldDecl {
    type Error = String;

    fn try_from(decl: &FieldDecl) -> Result<Self, Self::Error> {
        let (native, nullable, annotation) = match &decl.declaration {
            TypeDeclaration::Untyped => (None, false, None),
            TypeDeclaration::Native { name, nullable } => (Some(name.clone()), *nullable, None),
            TypeDeclaration::Annotation(text) => (None, false, Some(text.clone())),
            TypeDeclaration::Descriptor(d) => (None, false, Some(d.to_annotation())),
        };
        let default = decl
            .default
            .as_ref()
            .map(default_to_json)
            .transpose()
            .map_err(|e| format!("Field '{}' has a default with no file form: {}", decl.name, e))?;
        Ok(Self {
            name: decl.name.clone(),
            native,
            nullable,
            annotation,
            default,
            alias: decl.alias.clone(),
            is_static: decl.is_static,
        })
    }
}

/// File form of a default. Instances and non-finite floats have none.
fn default_to_json(value: &Value) -> Result<serde_json::Value, String> {
    match value {
        Value::Object(dto) => Err(format!("instance of {}", dto.schema_name())),
        Value::Float(f) if !f.is_finite() => Err(format!("non-finite float {}", f)),
        Value::List(items) => items
            .iter()
            .map(default_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(serde_json::Value::Array),
        Value::Map(map) => map
            .iter()
            .map(|(k, v)| Ok((k.to_string(), default_to_json(v)?)))
            .collect::<Result<serde_json::Map<_, _>, String>>()
            .map(serde_json::Value::Object),
        other => serde_json::to_value(other).map_err(|e| e.to_string()),
    }
}

impl Serialize for FieldDecl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawFieldDecl::try_from(self)
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

/// A schema definition: the declared shape of a DTO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name, optionally namespaced with `\`
    pub name: String,
    /// Parent schema whose fields come first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Ignore unknown input keys instead of reporting them
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub flexible: bool,
    /// Field declarations in order
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: None,
            flexible: false,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn flexible(mut self) -> Self {
        self.flexible = true;
        self
    }

    /// Returns the namespace part of the name (before the last `\`).
    pub fn namespace(&self) -> Option<&str> {
        namespace_of(&self.name)
    }

    /// Validates the schema definition itself (not a document).
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.name.trim_start_matches('\\').is_empty() {
            return Err("Schema name must not be empty".into());
        }

        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(format!("Schema '{}' declares a field with an empty name", self.name));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(format!("Field '{}' is declared more than once", field.name));
            }
        }

        Ok(())
    }
}

/// Returns the namespace part of a qualified name.
pub(crate) fn namespace_of(name: &str) -> Option<&str> {
    name.trim_start_matches('\\').rsplit_once('\\').map(|(ns, _)| ns)
}

/// A compiled field: name, parsed descriptor and default.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    /// Input key the value is read from
    pub source_key: String,
    pub descriptor: TypeDescriptor,
    /// Type rendering used in diagnostics
    pub rendered: String,
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// A schema with its inheritance flattened and every field parsed.
///
/// Compiled once per schema and shared read-only by every construction.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub name: Arc<str>,
    /// This schema's name followed by its ancestors, nearest first
    pub lineage: Vec<String>,
    pub flexible: bool,
    pub fields: Vec<FieldSpec>,
}

impl CompiledSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True if this schema is `name` or inherits from it.
    pub fn is_a(&self, name: &str) -> bool {
        self.lineage.iter().any(|n| n == name)
    }
}
