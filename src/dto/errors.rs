//! DTO construction errors
//!
//! Violation codes:
//! - DTO_INVALID_TYPE: a field value does not conform to its declaration
//! - DTO_UNKNOWN_FIELDS: input keys with no matching field
//!
//! One construction attempt raises at most one [`ValidationError`], holding
//! every violation found in that attempt, nested instances included.

use std::fmt;

use thiserror::Error;

use crate::schema::{FieldSpec, SchemaError};
use crate::value::{Value, ValueKind};

/// Result type for DTO operations
pub type DtoResult<T> = Result<T, DtoError>;

/// One field that failed type conformance.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Schema declaring the field
    pub schema: String,
    pub field: String,
    /// Rendered declared type
    pub expected: String,
    /// Rendered offending value
    pub actual: String,
    /// Runtime kind of the offending value
    pub kind: ValueKind,
    /// The input had no entry and the field has no default
    pub missing: bool,
}

impl Diagnostic {
    pub(crate) fn new(schema: &str, spec: &FieldSpec, actual: &Value, missing: bool) -> Self {
        Self {
            schema: schema.to_string(),
            field: spec.name.clone(),
            expected: spec.rendered.clone(),
            actual: actual.render(),
            kind: actual.kind(),
            missing,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid type: expected `{}::{}` to be of type `{}`, instead got value `{}`, which is {}.",
            self.schema, self.field, self.expected, self.actual, self.kind
        )
    }
}

/// A single reason a construction was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    InvalidType(Diagnostic),
    UnknownFields { schema: String, fields: Vec<String> },
}

impl Violation {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            Violation::InvalidType(_) => "DTO_INVALID_TYPE",
            Violation::UnknownFields { .. } => "DTO_UNKNOWN_FIELDS",
        }
    }

    /// Schema the violation was found on.
    pub fn schema(&self) -> &str {
        match self {
            Violation::InvalidType(diag) => &diag.schema,
            Violation::UnknownFields { schema, .. } => schema,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::InvalidType(diag) => diag.fmt(f),
            Violation::UnknownFields { schema, fields } => write!(
                f,
                "Public properties `{}` not found on {}",
                fields.join("`, `"),
                schema
            ),
        }
    }
}

/// Every violation found in one construction attempt.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", join_lines(.violations))]
pub struct ValidationError {
    schema: String,
    violations: Vec<Violation>,
}

fn join_lines(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl ValidationError {
    pub fn new(schema: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            schema: schema.into(),
            violations,
        }
    }

    /// Schema whose construction was rejected.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Type diagnostics only, in report order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.violations.iter().filter_map(|v| match v {
            Violation::InvalidType(diag) => Some(diag),
            Violation::UnknownFields { .. } => None,
        })
    }

    /// Names of the fields that failed, in report order.
    pub fn fields(&self) -> Vec<&str> {
        self.diagnostics().map(|d| d.field.as_str()).collect()
    }

    /// Unknown input keys reported for the rejected schema itself.
    pub fn unknown_fields(&self) -> Vec<&str> {
        self.violations
            .iter()
            .filter_map(|v| match v {
                Violation::UnknownFields { schema, fields } if *schema == self.schema => Some(fields),
                _ => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

/// DTO errors
#[derive(Debug, Clone, Error)]
pub enum DtoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Cannot construct {schema} from a value of kind {kind}")]
    NotAMapping { schema: String, kind: ValueKind },

    #[error("Cannot build {schema} instances from a value of kind {kind}")]
    NotASequence { schema: String, kind: ValueKind },

    #[error("Element {index} is not a valid {schema}: {source}")]
    InvalidElement {
        schema: String,
        index: usize,
        source: Box<DtoError>,
    },

    #[error("Nesting {schema} exceeds the maximum depth of {limit}")]
    DepthExceeded { schema: String, limit: usize },
}

impl DtoError {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            DtoError::Validation(_) => "DTO_VALIDATION_FAILED",
            DtoError::Schema(e) => e.code().code(),
            DtoError::NotAMapping { .. } => "DTO_NOT_A_MAPPING",
            DtoError::NotASequence { .. } => "DTO_NOT_A_SEQUENCE",
            DtoError::InvalidElement { .. } => "DTO_INVALID_ELEMENT",
            DtoError::DepthExceeded { .. } => "DTO_DEPTH_EXCEEDED",
        }
    }

    /// Returns the aggregated validation error, looking through
    /// `InvalidElement` wrappers.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            DtoError::Validation(e) => Some(e),
            DtoError::InvalidElement { source, .. } => source.validation(),
            _ => None,
        }
    }
}
