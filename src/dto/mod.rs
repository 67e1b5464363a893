//! DTO construction for typed-dto
//!
//! Builds validated instances from loosely typed mappings. Every declared
//! field is cast and checked; all violations of one attempt are reported
//! together in a single [`ValidationError`].
//!
//! # Design Principles
//!
//! - All-or-nothing: no partially constructed instances
//! - No coercion between scalar kinds
//! - Defaults are trusted and never checked
//! - Nested schemas are constructed recursively, up to a depth limit

mod builder;
mod caster;
mod errors;
mod validator;

pub use errors::{Diagnostic, DtoError, DtoResult, ValidationError, Violation};

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::schema::CompiledSchema;
use crate::value::{Map, Value};

/// A validated instance of a schema.
///
/// Field values are stored in declaration order and were checked against
/// their declarations (or taken from defaults) when the instance was built.
#[derive(Clone)]
pub struct Dto {
    schema: Arc<CompiledSchema>,
    fields: Vec<(String, Value)>,
}

impl Dto {
    pub(crate) fn new(schema: Arc<CompiledSchema>, fields: Vec<(String, Value)>) -> Self {
        Self { schema, fields }
    }

    /// Name of the schema this instance was built from.
    pub fn schema_name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    /// True if the instance's schema is `name` or inherits from it.
    pub fn is_a(&self, name: &str) -> bool {
        self.schema.is_a(name.trim_start_matches('\\'))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.iter().find(|(name, _)| name == field).map(|(_, v)| v)
    }

    /// Iterates over fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, v)| (name.as_str(), v))
    }

    /// Field name to value, in declaration order.
    pub fn all(&self) -> Map {
        self.fields
            .iter()
            .map(|(name, v)| (name.as_str(), v.clone()))
            .collect()
    }

    /// A copy restricted to the named fields.
    pub fn only(&self, names: &[&str]) -> Dto {
        self.filtered(|field| names.contains(&field))
    }

    /// A copy without the named fields.
    pub fn except(&self, names: &[&str]) -> Dto {
        self.filtered(|field| !names.contains(&field))
    }

    fn filtered(&self, keep: impl Fn(&str) -> bool) -> Dto {
        Dto {
            schema: Arc::clone(&self.schema),
            fields: self
                .fields
                .iter()
                .filter(|(name, _)| keep(name.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Plain-data projection: nested instances are replaced by their own
    /// projection at any depth, inside containers too.
    pub fn to_array(&self) -> Value {
        Value::Map(
            self.fields
                .iter()
                .map(|(name, v)| (name.as_str(), v.to_plain()))
                .collect(),
        )
    }

    pub fn into_fields(self) -> Vec<(String, Value)> {
        self.fields
    }
}

impl PartialEq for Dto {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name && self.fields == other.fields
    }
}

impl fmt::Debug for Dto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(&self.schema.name);
        for (name, value) in &self.fields {
            s.field(name, value);
        }
        s.finish()
    }
}

impl Serialize for Dto {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

/// Instances built from a sequence of mappings, in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DtoCollection {
    items: Vec<Dto>,
}

impl DtoCollection {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Dto> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dto> {
        self.items.iter()
    }

    /// Plain-data projection of every instance.
    pub fn to_array(&self) -> Value {
        Value::List(self.items.iter().map(Dto::to_array).collect())
    }

    pub fn into_vec(self) -> Vec<Dto> {
        self.items
    }
}

impl From<Vec<Dto>> for DtoCollection {
    fn from(items: Vec<Dto>) -> Self {
        Self { items }
    }
}

impl Index<usize> for DtoCollection {
    type Output = Dto;

    fn index(&self, index: usize) -> &Dto {
        &self.items[index]
    }
}

impl IntoIterator for DtoCollection {
    type Item = Dto;
    type IntoIter = std::vec::IntoIter<Dto>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a DtoCollection {
    type Item = &'a Dto;
    type IntoIter = std::slice::Iter<'a, Dto>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Serialize for DtoCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}
