//! Value conformance
//!
//! Decides whether a value conforms to a descriptor. Never mutates the
//! value; the only side effect is the trial construction done to check a
//! mapping against a class reference, whose result is discarded.

use super::builder::Engine;
use super::errors::{DtoError, DtoResult};
use crate::schema::TypeDescriptor;
use crate::value::{Key, Value};

impl Engine<'_> {
    /// Checks `value` against `descriptor`.
    ///
    /// Only failures that are not about conformance (unknown schema,
    /// depth limit) surface as errors.
    pub(crate) fn conforms(&self, value: &Value, descriptor: &TypeDescriptor) -> DtoResult<bool> {
        match descriptor {
            TypeDescriptor::Any => Ok(true),
            TypeDescriptor::Scalar(kind) => Ok(kind.matches(value)),
            TypeDescriptor::Nullable(inner) => {
                if value.is_null() {
                    return Ok(true);
                }
                self.conforms(value, inner)
            }
            TypeDescriptor::Union(alternatives) => {
                for alternative in alternatives {
                    if self.conforms(value, alternative)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            TypeDescriptor::ClassType(reference) => {
                // Unresolvable names carry no checkable meaning
                let Some(name) = self.registry().resolve(reference) else {
                    return Ok(true);
                };
                if let Value::Object(dto) = value {
                    return Ok(dto.is_a(name));
                }
                let Some(mapping) = value.as_mapping() else {
                    return Ok(false);
                };
                match self.build(name, &mapping) {
                    Ok(_) => Ok(true),
                    Err(DtoError::Validation(_)) => Ok(false),
                    Err(e) => Err(e),
                }
            }
            TypeDescriptor::ListOf { element, .. } => {
                let Value::List(items) = value else {
                    return Ok(false);
                };
                for item in items {
                    if !self.conforms(item, element)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            TypeDescriptor::MapOf { key, value: entry } => match value {
                Value::Map(map) => {
                    for (k, v) in map.iter() {
                        if !self.conforms(&k.to_value(), key)? || !self.conforms(v, entry)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                // A sequence is an associative container keyed by index
                Value::List(items) => {
                    for (index, item) in items.iter().enumerate() {
                        let k = Key::Int(index as i64).to_value();
                        if !self.conforms(&k, key)? || !self.conforms(item, entry)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
        }
    }
}
