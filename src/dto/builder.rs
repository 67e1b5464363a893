//! Construction pass
//!
//! One pass over a compiled schema: for every field, pick the incoming
//! value (input entry, else default, else null), cast it, check it, and
//! record a violation instead of stopping. Unknown input keys are reported
//! together as one violation. Construction is all-or-nothing.

use std::sync::Arc;

use tracing::{debug, trace};

use super::caster::Cast;
use super::errors::{Diagnostic, DtoError, DtoResult, ValidationError, Violation};
use super::{Dto, DtoCollection};
use crate::schema::{SchemaRegistry, TypeDescriptor};
use crate::value::{Key, Map, Value};

/// Validate-and-cast engine bound to a registry at one nesting depth.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Engine<'a> {
    registry: &'a SchemaRegistry,
    /// Number of instances under construction above this point
    depth: usize,
}

impl<'a> Engine<'a> {
    pub(crate) fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry, depth: 0 }
    }

    pub(crate) fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    /// Constructs an instance of the schema named `name` from `input`.
    pub(crate) fn build(&self, name: &str, input: &Map) -> DtoResult<Dto> {
        let limit = self.registry.config().max_depth;
        if self.depth >= limit {
            return Err(DtoError::DepthExceeded {
                schema: name.to_string(),
                limit,
            });
        }

        let schema = self.registry.compiled(name)?;
        let inner = Engine {
            registry: self.registry,
            depth: self.depth + 1,
        };

        let absent = Value::Null;
        let mut violations = Vec::new();
        let mut fields = Vec::with_capacity(schema.fields.len());

        for spec in &schema.fields {
            let (raw, missing) = match input.get_str(&spec.source_key) {
                Some(raw) => (raw, false),
                None => match &spec.default {
                    // Defaults are trusted, never checked
                    Some(default) => {
                        fields.push((spec.name.clone(), default.clone()));
                        continue;
                    }
                    None => (&absent, true),
                },
            };

            let before = violations.len();
            let cast = inner.cast(raw, &spec.descriptor, &mut violations)?;
            if violations.len() > before {
                continue;
            }

            let value = match cast {
                Cast::Done(value) if inner.conforms(&value, &spec.descriptor)? => value,
                // Rejected unions were already checked against every alternative
                Cast::Done(_) | Cast::Rejected => {
                    violations.push(Violation::InvalidType(Diagnostic::new(
                        &schema.name,
                        spec,
                        raw,
                        missing,
                    )));
                    continue;
                }
            };

            fields.push((spec.name.clone(), value));
        }

        if !schema.flexible {
            let unknown: Vec<String> = input
                .keys()
                .filter(|key| {
                    !schema
                        .fields
                        .iter()
                        .any(|spec| Key::from(spec.source_key.as_str()) == **key)
                })
                .map(Key::to_string)
                .collect();
            if !unknown.is_empty() {
                violations.push(Violation::UnknownFields {
                    schema: schema.name.to_string(),
                    fields: unknown,
                });
            }
        }

        if !violations.is_empty() {
            debug!(
                event = "DTO_REJECTED",
                schema = %schema.name,
                violations = violations.len(),
                depth = inner.depth,
            );
            return Err(ValidationError::new(schema.name.to_string(), violations).into());
        }

        trace!(
            event = "DTO_CONSTRUCTED",
            schema = %schema.name,
            fields = fields.len(),
            depth = inner.depth,
        );
        Ok(Dto::new(Arc::clone(&schema), fields))
    }
}

impl SchemaRegistry {
    /// Constructs an instance of the schema named `name`.
    ///
    /// `input` must be a mapping; an empty list counts as an empty mapping.
    pub fn construct(&self, name: &str, input: impl Into<Value>) -> DtoResult<Dto> {
        let input = input.into();
        let mapping = input.as_mapping().ok_or_else(|| DtoError::NotAMapping {
            schema: name.to_string(),
            kind: input.kind(),
        })?;
        Engine::new(self).build(name, &mapping)
    }

    /// Constructs one instance per element of a sequence of mappings.
    ///
    /// Stops at the first element that fails, reporting its index.
    pub fn array_of(&self, name: &str, input: impl Into<Value>) -> DtoResult<DtoCollection> {
        let input = input.into();
        let kind = input.kind();
        let Value::List(items) = input else {
            return Err(DtoError::NotASequence {
                schema: name.to_string(),
                kind,
            });
        };

        let mut dtos = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let dto = self
                .construct(name, item)
                .map_err(|e| DtoError::InvalidElement {
                    schema: name.to_string(),
                    index,
                    source: Box::new(e),
                })?;
            dtos.push(dto);
        }
        Ok(DtoCollection::from(dtos))
    }

    /// Checks a value against a descriptor without keeping any result.
    ///
    /// Failures unrelated to conformance, such as a nested schema that
    /// cannot be compiled, count as non-conforming.
    pub fn validate(&self, value: &Value, descriptor: &TypeDescriptor) -> bool {
        Engine::new(self).conforms(value, descriptor).unwrap_or(false)
    }

    /// Casts a value toward a descriptor, building nested instances.
    ///
    /// Violations found in nested instances are returned together as one
    /// validation error. The result is not checked against `descriptor`.
    pub fn cast(&self, value: &Value, descriptor: &TypeDescriptor) -> DtoResult<Value> {
        let mut violations = Vec::new();
        let cast = match Engine::new(self).cast(value, descriptor, &mut violations)? {
            Cast::Done(cast) => cast,
            Cast::Rejected => value.clone(),
        };
        match violations.first() {
            None => Ok(cast),
            Some(first) => {
                let schema = first.schema().to_string();
                Err(ValidationError::new(schema, violations).into())
            }
        }
    }
}
