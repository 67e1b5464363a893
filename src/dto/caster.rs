//! Value casting
//!
//! Turns mappings into nested instances wherever a descriptor names a
//! schema, directly or inside a container, union or nullable. Everything
//! else passes through unchanged.
//!
//! Violations found while constructing nested instances are pushed into the
//! caller's sink rather than returned, so a parent construction can report
//! them alongside its own. Only failures unrelated to conformance are
//! returned as errors.

use super::builder::Engine;
use super::errors::{DtoError, DtoResult, Violation};
use crate::schema::TypeDescriptor;
use crate::value::{Map, Value};

/// Outcome of casting one value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cast {
    /// The value after casting. At a position whose nested construction
    /// failed, the uncast input is kept and the violations are in the sink.
    Done(Value),
    /// A union with schema-bearing alternatives matched none of them.
    /// The value is known not to conform.
    Rejected,
}

impl Engine<'_> {
    /// Casts `value` toward `descriptor`.
    pub(crate) fn cast(
        &self,
        value: &Value,
        descriptor: &TypeDescriptor,
        sink: &mut Vec<Violation>,
    ) -> DtoResult<Cast> {
        if value.is_null() || !descriptor.contains_class() {
            return Ok(Cast::Done(value.clone()));
        }

        match descriptor {
            TypeDescriptor::ClassType(reference) => {
                // Existing instances are accepted as-is, never re-cast
                if matches!(value, Value::Object(_)) {
                    return Ok(Cast::Done(value.clone()));
                }
                let (Some(name), Some(mapping)) =
                    (self.registry().resolve(reference), value.as_mapping())
                else {
                    return Ok(Cast::Done(value.clone()));
                };
                match self.build(name, &mapping) {
                    Ok(dto) => Ok(Cast::Done(Value::Object(dto))),
                    Err(DtoError::Validation(e)) => {
                        sink.extend(e.into_violations());
                        Ok(Cast::Done(value.clone()))
                    }
                    Err(e) => Err(e),
                }
            }
            TypeDescriptor::Nullable(inner) => self.cast(value, inner, sink),
            TypeDescriptor::ListOf { element, .. } => match value {
                Value::List(items) => self.cast_items(items, element, sink),
                other => Ok(Cast::Done(other.clone())),
            },
            TypeDescriptor::MapOf { value: entry, .. } => match value {
                Value::Map(map) => {
                    let mut cast = Map::with_capacity(map.len());
                    for (k, v) in map.iter() {
                        match self.cast(v, entry, sink)? {
                            Cast::Done(v) => {
                                cast.insert(k.clone(), v);
                            }
                            Cast::Rejected => return Ok(Cast::Rejected),
                        }
                    }
                    Ok(Cast::Done(Value::Map(cast)))
                }
                Value::List(items) => self.cast_items(items, entry, sink),
                other => Ok(Cast::Done(other.clone())),
            },
            TypeDescriptor::Union(alternatives) => self.cast_union(value, alternatives),
            TypeDescriptor::Any | TypeDescriptor::Scalar(_) => Ok(Cast::Done(value.clone())),
        }
    }

    fn cast_items(
        &self,
        items: &[Value],
        element: &TypeDescriptor,
        sink: &mut Vec<Violation>,
    ) -> DtoResult<Cast> {
        let mut cast = Vec::with_capacity(items.len());
        for item in items {
            match self.cast(item, element, sink)? {
                Cast::Done(v) => cast.push(v),
                Cast::Rejected => return Ok(Cast::Rejected),
            }
        }
        Ok(Cast::Done(Value::List(cast)))
    }

    /// Tries alternatives left to right; the first one the value conforms
    /// to, after casting toward it, wins.
    ///
    /// Each nested construction runs once here. A value no alternative
    /// accepts is `Rejected` so callers report it without building it again.
    fn cast_union(&self, value: &Value, alternatives: &[TypeDescriptor]) -> DtoResult<Cast> {
        for alternative in alternatives {
            if !alternative.contains_class() {
                if self.conforms(value, alternative)? {
                    return Ok(Cast::Done(value.clone()));
                }
                continue;
            }

            let mut scratch = Vec::new();
            if let Cast::Done(cast) = self.cast(value, alternative, &mut scratch)? {
                if scratch.is_empty() && self.conforms(&cast, alternative)? {
                    return Ok(Cast::Done(cast));
                }
            }
        }
        Ok(Cast::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::Cast;
    use crate::dto::builder::Engine;
    use crate::dto::DtoError;
    use crate::schema::{FieldDecl, Schema, SchemaRegistry, TypeDescriptor};
    use crate::value::Value;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register(Schema::new("Child").field(FieldDecl::annotated("name", "string")))
            .unwrap();
        registry
    }

    fn cast(registry: &SchemaRegistry, value: serde_json::Value, descriptor: &TypeDescriptor) -> Value {
        registry.cast(&Value::from(value), descriptor).unwrap()
    }

    #[test]
    fn test_mapping_becomes_instance() {
        let registry = registry();
        let value = cast(&registry, json!({"name": "child"}), &TypeDescriptor::class("Child"));
        let dto = value.as_object().unwrap();
        assert_eq!(dto.schema_name(), "Child");
        assert_eq!(dto.get("name"), Some(&Value::from("child")));
    }

    #[test]
    fn test_null_is_never_cast() {
        let registry = registry();
        let descriptor = TypeDescriptor::nullable(TypeDescriptor::class("Child"));
        assert_eq!(cast(&registry, json!(null), &descriptor), Value::Null);
    }

    #[test]
    fn test_non_mapping_passes_through() {
        let registry = registry();
        assert_eq!(
            cast(&registry, json!("child"), &TypeDescriptor::class("Child")),
            Value::from("child")
        );
        assert_eq!(
            cast(&registry, json!([1, 2]), &TypeDescriptor::class("Child")),
            Value::from(vec![1, 2])
        );
    }

    #[test]
    fn test_list_elements_cast() {
        let registry = registry();
        let descriptor = TypeDescriptor::list_of(TypeDescriptor::class("Child"));
        let value = cast(&registry, json!([{"name": "a"}, {"name": "b"}]), &descriptor);
        let items = value.as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.as_object().is_some()));
        assert_eq!(items[1].as_object().unwrap().get("name"), Some(&Value::from("b")));
    }

    #[test]
    fn test_map_values_cast() {
        let registry = registry();
        let descriptor = TypeDescriptor::map_of(TypeDescriptor::string(), TypeDescriptor::class("Child"));
        let value = cast(&registry, json!({"first": {"name": "a"}}), &descriptor);
        let map = value.as_map().unwrap();
        assert!(map.get_str("first").unwrap().as_object().is_some());
    }

    #[test]
    fn test_union_picks_first_conforming_alternative() {
        let registry = registry();
        let descriptor = TypeDescriptor::union(vec![
            TypeDescriptor::string(),
            TypeDescriptor::class("Child"),
        ]);
        assert_eq!(cast(&registry, json!("plain"), &descriptor), Value::from("plain"));
        assert!(cast(&registry, json!({"name": "a"}), &descriptor).as_object().is_some());
        // Nothing fits: passed through untouched
        assert_eq!(
            cast(&registry, json!({"name": 1}), &descriptor),
            Value::from(json!({"name": 1}))
        );
    }

    #[test]
    fn test_union_without_winner_is_rejected() {
        let registry = registry();
        let descriptor = TypeDescriptor::union(vec![
            TypeDescriptor::int(),
            TypeDescriptor::class("Child"),
        ]);
        let mut sink = Vec::new();
        let engine = Engine::new(&registry);

        let cast = engine
            .cast(&Value::from(json!({"name": 1})), &descriptor, &mut sink)
            .unwrap();
        assert_eq!(cast, Cast::Rejected);
        assert!(sink.is_empty());

        // Rejection inside a container rejects the whole container
        let list = TypeDescriptor::list_of(descriptor);
        let cast = engine
            .cast(&Value::from(json!([1, {"name": "a"}, "x"])), &list, &mut sink)
            .unwrap();
        assert_eq!(cast, Cast::Rejected);
    }

    #[test]
    fn test_nested_violations_reported() {
        let registry = registry();
        let descriptor = TypeDescriptor::list_of(TypeDescriptor::class("Child"));
        let err = registry
            .cast(&Value::from(json!([{"name": 1}, {"name": false}])), &descriptor)
            .unwrap_err();

        match err {
            DtoError::Validation(e) => {
                assert_eq!(e.len(), 2);
                assert_eq!(e.schema(), "Child");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_instance_accepted_as_is() {
        let registry = registry();
        let child = registry.construct("Child", json!({"name": "c"})).unwrap();
        let value = Value::Object(child.clone());
        assert_eq!(
            registry.cast(&value, &TypeDescriptor::class("Child")).unwrap(),
            Value::Object(child)
        );
    }
}
