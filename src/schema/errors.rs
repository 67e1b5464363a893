//! Schema definition error types
//!
//! Error codes:
//! - DTO_UNKNOWN_SCHEMA
//! - DTO_SCHEMA_IMMUTABLE
//! - DTO_SCHEMA_MALFORMED
//! - DTO_UNKNOWN_PARENT
//! - DTO_INHERITANCE_CYCLE

use std::fmt;

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Schema name not registered
    DtoUnknownSchema,
    /// Attempt to register a name twice
    DtoSchemaImmutable,
    /// Schema definition or file is invalid
    DtoSchemaMalformed,
    /// `extends` names a schema that is not registered
    DtoUnknownParent,
    /// `extends` chain loops back on itself
    DtoInheritanceCycle,
}

impl SchemaErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::DtoUnknownSchema => "DTO_UNKNOWN_SCHEMA",
            SchemaErrorCode::DtoSchemaImmutable => "DTO_SCHEMA_IMMUTABLE",
            SchemaErrorCode::DtoSchemaMalformed => "DTO_SCHEMA_MALFORMED",
            SchemaErrorCode::DtoUnknownParent => "DTO_UNKNOWN_PARENT",
            SchemaErrorCode::DtoInheritanceCycle => "DTO_INHERITANCE_CYCLE",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    /// Schema name if applicable
    schema: Option<String>,
}

impl SchemaError {
    /// Create an unknown schema error
    pub fn unknown_schema(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: SchemaErrorCode::DtoUnknownSchema,
            message: format!("Schema '{}' not found", name),
            schema: Some(name),
        }
    }

    /// Create a schema immutable error
    pub fn schema_immutable(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: SchemaErrorCode::DtoSchemaImmutable,
            message: format!("Schema '{}' is already registered and immutable", name),
            schema: Some(name),
        }
    }

    /// Create an error for a malformed definition or schema file
    pub fn malformed_schema(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::DtoSchemaMalformed,
            message: format!("Malformed schema '{}': {}", origin.into(), reason.into()),
            schema: None,
        }
    }

    /// Create an unknown parent error
    pub fn unknown_parent(name: impl Into<String>, parent: &str) -> Self {
        let name = name.into();
        Self {
            code: SchemaErrorCode::DtoUnknownParent,
            message: format!("Schema '{}' extends unknown schema '{}'", name, parent),
            schema: Some(name),
        }
    }

    /// Create an inheritance cycle error
    pub fn inheritance_cycle(name: impl Into<String>, chain: &[String]) -> Self {
        let name = name.into();
        Self {
            code: SchemaErrorCode::DtoInheritanceCycle,
            message: format!(
                "Schema '{}' has an inheritance cycle: {}",
                name,
                chain.join(" -> ")
            ),
            schema: Some(name),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the schema name if applicable
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
