//! DTO Construction Tests
//!
//! Tests for the validate-and-cast construction pass:
//! - Scalar kinds match exactly, no coercion
//! - Union and nullable declarations
//! - Defaults are used when the input has no entry
//! - Unknown keys are reported together
//! - Nested schemas are cast from mappings, recursively
//! - Every violation of one attempt is reported at once

use serde_json::json;
use typed_dto::schema::{FieldDecl, Schema, SchemaRegistry, TypeDescriptor};
use typed_dto::{DtoError, Map, ValidationError, Value};

// =============================================================================
// Helper Functions
// =============================================================================

/// Registry with the nested test schemas under `App\Dto`.
fn setup_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();

    registry
        .register(Schema::new("App\\Dto\\NestedChild").field(FieldDecl::annotated("name", "string")))
        .unwrap();
    registry
        .register(
            Schema::new("App\\Dto\\NestedParent")
                .field(FieldDecl::annotated("name", "string"))
                .field(FieldDecl::annotated("child", "NestedChild")),
        )
        .unwrap();
    registry
        .register(
            Schema::new("App\\Dto\\NestedParentOfMany")
                .field(FieldDecl::annotated("name", "string"))
                .field(FieldDecl::annotated("children", "\\App\\Dto\\NestedChild[]")),
        )
        .unwrap();
    registry.register(Schema::new("App\\Dto\\EmptyChild")).unwrap();
    registry.register(Schema::new("App\\Dto\\DummyClass")).unwrap();
    registry.register(Schema::new("App\\Dto\\OtherClass")).unwrap();
    registry
        .register(Schema::new("App\\Dto\\TestDto").field(FieldDecl::native("testProperty", "int")))
        .unwrap();

    registry
}

/// Registers a one-off schema and constructs it.
fn construct_with(
    registry: &mut SchemaRegistry,
    schema: Schema,
    input: serde_json::Value,
) -> Result<typed_dto::Dto, DtoError> {
    let name = schema.name.clone();
    registry.register(schema).unwrap();
    registry.construct(&name, input)
}

fn single_field(name: &str, annotation: &str) -> Schema {
    Schema::new(name).field(FieldDecl::annotated("foo", annotation))
}

fn validation(err: DtoError) -> ValidationError {
    match err {
        DtoError::Validation(e) => e,
        other => panic!("expected validation error, got {:?}", other),
    }
}

// =============================================================================
// Scalar Tests
// =============================================================================

/// Only the declared kind may be passed.
#[test]
fn test_only_declared_type_may_be_passed() {
    let mut registry = setup_registry();
    let ok = construct_with(&mut registry, single_field("Ok", "string"), json!({"foo": "value"}));
    assert!(ok.is_ok());

    let err = construct_with(&mut registry, single_field("Bad", "string"), json!({"foo": false}));
    let message = err.unwrap_err().to_string();
    assert!(message.contains("Bad::foo` to be of type `string`, instead got value ``, which is boolean"));
}

/// Floats are accepted where float is declared.
#[test]
fn test_float_is_supported() {
    let mut registry = setup_registry();
    let dto = construct_with(&mut registry, single_field("F", "float"), json!({"foo": 5.1})).unwrap();
    assert_eq!(dto.get("foo"), Some(&Value::Float(5.1)));
}

/// Integers are not widened to floats, nor floats narrowed to integers.
#[test]
fn test_no_numeric_widening() {
    let mut registry = setup_registry();
    assert!(construct_with(&mut registry, single_field("F", "float"), json!({"foo": 5})).is_err());
    assert!(construct_with(&mut registry, single_field("I", "int"), json!({"foo": 5.0})).is_err());
    assert!(construct_with(&mut registry, single_field("S", "string"), json!({"foo": 5})).is_err());
}

/// Native declarations render canonically.
#[test]
fn test_native_declaration_rendering() {
    let mut registry = setup_registry();
    let schema = Schema::new("Native").field(FieldDecl::native("count", "int"));
    let err = construct_with(&mut registry, schema, json!({"count": "3"})).unwrap_err();
    assert!(err
        .to_string()
        .contains("`Native::count` to be of type `integer`, instead got value `3`, which is string."));
}

// =============================================================================
// Union and Nullable Tests
// =============================================================================

#[test]
fn test_union_types_are_supported() {
    let mut registry = setup_registry();
    registry.register(single_field("U", "string|bool")).unwrap();

    assert!(registry.construct("U", json!({"foo": "value"})).is_ok());
    assert!(registry.construct("U", json!({"foo": false})).is_ok());
    assert!(registry.construct("U", json!({"foo": 1})).is_err());
}

#[test]
fn test_nullable_types_are_supported() {
    let mut registry = setup_registry();
    let dto = construct_with(&mut registry, single_field("N", "string|null"), json!({"foo": null}))
        .unwrap();
    assert_eq!(dto.get("foo"), Some(&Value::Null));
}

/// Null is only allowed if explicitly declared.
#[test]
fn test_null_is_allowed_only_if_explicitly_specified() {
    let mut registry = setup_registry();
    let err = construct_with(&mut registry, single_field("N", "string"), json!({"foo": null}))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("N::foo` to be of type `string`, instead got value `null`, which is NULL"));
}

/// A nullable field with no entry and no default is stored as null.
#[test]
fn test_missing_nullable_field_is_null() {
    let mut registry = setup_registry();
    let schema = Schema::new("E")
        .field(FieldDecl::annotated("foo", "string").with_default("abc"))
        .field(FieldDecl::annotated("bar", "bool|null"));
    let dto = construct_with(&mut registry, schema, json!({})).unwrap();

    assert_eq!(dto.get("foo"), Some(&Value::from("abc")));
    assert_eq!(dto.get("bar"), Some(&Value::Null));
}

// =============================================================================
// Default and Any Tests
// =============================================================================

#[test]
fn test_default_values_are_supported() {
    let mut registry = setup_registry();
    let schema = Schema::new("D")
        .field(FieldDecl::annotated("foo", "string").with_default("abc"))
        .field(FieldDecl::annotated("bar", "bool"));
    let dto = construct_with(&mut registry, schema, json!({"bar": true})).unwrap();

    assert_eq!(
        dto.all(),
        [("foo", Value::from("abc")), ("bar", Value::Bool(true))]
            .into_iter()
            .collect::<Map>()
    );
}

/// Defaults are not checked against the declaration.
#[test]
fn test_default_is_trusted() {
    let mut registry = setup_registry();
    let schema = Schema::new("T").field(FieldDecl::annotated("foo", "int").with_default("not an int"));
    let dto = construct_with(&mut registry, schema, json!({})).unwrap();
    assert_eq!(dto.get("foo"), Some(&Value::from("not an int")));
}

/// An explicit input entry is checked even when a default exists.
#[test]
fn test_explicit_value_overrides_default_and_is_checked() {
    let mut registry = setup_registry();
    let schema = Schema::new("T").field(FieldDecl::annotated("foo", "int").with_default(1));
    let err = construct_with(&mut registry, schema, json!({"foo": "x"})).unwrap_err();
    assert_eq!(validation(err).fields(), vec!["foo"]);
}

#[test]
fn test_mixed_is_supported() {
    let mut registry = setup_registry();
    registry.register(single_field("M", "mixed")).unwrap();
    assert!(registry.construct("M", json!({"foo": "abc"})).is_ok());
    assert!(registry.construct("M", json!({"foo": 1})).is_ok());
}

#[test]
fn test_empty_type_declaration_allows_everything() {
    let mut registry = setup_registry();
    registry
        .register(Schema::new("Untyped").field(FieldDecl::untyped("foo")))
        .unwrap();
    let dummy = registry.construct("App\\Dto\\DummyClass", json!({})).unwrap();

    for value in [Value::Object(dummy), Value::Null, Value::Int(1), Value::from("x")] {
        let mut input = Map::new();
        input.insert("foo", value.clone());
        let dto = registry.construct("Untyped", input).unwrap();
        assert_eq!(dto.get("foo"), Some(&value));
    }
}

// =============================================================================
// Unknown Field Tests
// =============================================================================

#[test]
fn test_unknown_properties_throw_an_error() {
    let mut registry = setup_registry();
    let err = construct_with(&mut registry, Schema::new("Empty"), json!({"bar": null})).unwrap_err();
    assert!(err.to_string().contains("Public properties `bar` not found on Empty"));
}

#[test]
fn test_unknown_properties_reported_together() {
    let mut registry = setup_registry();
    let err = construct_with(&mut registry, Schema::new("Empty"), json!({"foo": null, "bar": null}))
        .unwrap_err();
    let err = validation(err);

    assert_eq!(err.len(), 1);
    let message = err.to_string();
    assert!(message.contains("`foo`"));
    assert!(message.contains("`bar`"));
    let mut unknown = err.unknown_fields();
    unknown.sort();
    assert_eq!(unknown, vec!["bar", "foo"]);
}

/// Flexible schemas ignore unknown keys.
#[test]
fn test_flexible_schema_ignores_unknown_keys() {
    let mut registry = setup_registry();
    let schema = single_field("Flex", "string").flexible();
    let dto = construct_with(&mut registry, schema, json!({"foo": "a", "bar": 1})).unwrap();
    assert_eq!(dto.all().len(), 1);
}

/// Static fields are not instance data, and their names are unknown keys.
#[test]
fn test_static_fields_are_ignored() {
    let mut registry = setup_registry();
    registry
        .register(
            Schema::new("S")
                .field(FieldDecl::annotated("foo", "string"))
                .field(FieldDecl::untyped("prop").shared()),
        )
        .unwrap();

    let dto = registry.construct("S", json!({"foo": "bar"})).unwrap();
    assert_eq!(dto.all(), [("foo", Value::from("bar"))].into_iter().collect::<Map>());

    assert!(registry.construct("S", json!({"foo": "bar", "prop": 1})).is_err());
}

// =============================================================================
// Aggregation Tests
// =============================================================================

/// Every failing field is reported, not just the first.
#[test]
fn test_multiple_required_properties_are_reported() {
    let mut registry = setup_registry();
    let schema = Schema::new("Req")
        .field(FieldDecl::native("i_am_required", "string"))
        .field(FieldDecl::native("so_am_i", "int"));
    let err = construct_with(&mut registry, schema, json!({})).unwrap_err();
    let message = err.to_string();

    assert!(message.contains("i_am_required` to be of type `string`, instead got value `null`"));
    assert!(message.contains("so_am_i` to be of type `integer`, instead got value `null`"));
    assert!(validation(err).diagnostics().all(|d| d.missing));
}

/// Type violations come in declaration order, unknown keys last.
#[test]
fn test_violation_order() {
    let mut registry = setup_registry();
    let schema = Schema::new("Order")
        .field(FieldDecl::annotated("a", "int"))
        .field(FieldDecl::annotated("b", "int"))
        .field(FieldDecl::annotated("c", "int"));
    let err = construct_with(&mut registry, schema, json!({"zzz": 1, "c": "x", "a": "y", "b": 2}))
        .unwrap_err();
    let err = validation(err);

    assert_eq!(err.fields(), vec!["a", "c"]);
    assert_eq!(err.violations().last().map(|v| v.code()), Some("DTO_UNKNOWN_FIELDS"));
    assert_eq!(err.to_string().lines().count(), 3);
}

// =============================================================================
// Class Tests
// =============================================================================

#[test]
fn test_classes_are_supported() {
    let mut registry = setup_registry();
    registry
        .register(single_field("C", "\\App\\Dto\\DummyClass"))
        .unwrap();

    let dummy = registry.construct("App\\Dto\\DummyClass", json!({})).unwrap();
    let mut input = Map::new();
    input.insert("foo", dummy);
    assert!(registry.construct("C", input).is_ok());

    let other = registry.construct("App\\Dto\\OtherClass", json!({})).unwrap();
    let mut input = Map::new();
    input.insert("foo", other);
    let err = registry.construct("C", input).unwrap_err();
    assert!(err.to_string().contains(
        "C::foo` to be of type `\\App\\Dto\\DummyClass`, instead got value `App\\Dto\\OtherClass`, which is object"
    ));
}

#[test]
fn test_generic_collections_are_supported() {
    let mut registry = setup_registry();
    registry
        .register(single_field("G", "\\App\\Dto\\DummyClass[]"))
        .unwrap();

    let dummy = registry.construct("App\\Dto\\DummyClass", json!({})).unwrap();
    let mut input = Map::new();
    input.insert("foo", vec![Value::Object(dummy)]);
    assert!(registry.construct("G", input).is_ok());

    let other = registry.construct("App\\Dto\\OtherClass", json!({})).unwrap();
    let mut input = Map::new();
    input.insert("foo", vec![Value::Object(other)]);
    let err = registry.construct("G", input).unwrap_err();
    assert!(err
        .to_string()
        .contains("G::foo` to be of type `\\App\\Dto\\DummyClass[]`, instead got value `array`"));
}

#[test]
fn test_generic_collection_of_null() {
    let mut registry = setup_registry();
    let err = construct_with(&mut registry, single_field("L", "string[]"), json!({"foo": [null]}))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("L::foo` to be of type `string[]`, instead got value `array`, which is array."));
}

// =============================================================================
// Nested Cast Tests
// =============================================================================

#[test]
fn test_nested_dtos_are_cast_from_mappings() {
    let registry = setup_registry();
    let parent = registry
        .construct(
            "App\\Dto\\NestedParent",
            json!({"name": "parent", "child": {"name": "child"}}),
        )
        .unwrap();

    let child = parent.get("child").and_then(Value::as_object).unwrap();
    assert_eq!(child.schema_name(), "App\\Dto\\NestedChild");
    assert!(child.is_a("\\App\\Dto\\NestedChild"));
    assert_eq!(parent.get("name"), Some(&Value::from("parent")));
    assert_eq!(child.get("name"), Some(&Value::from("child")));
}

#[test]
fn test_nested_dtos_to_array() {
    let mut registry = setup_registry();
    let parent = registry
        .construct(
            "App\\Dto\\NestedParent",
            json!({"name": "parent", "child": {"name": "child"}}),
        )
        .unwrap();
    let array = parent.to_array();
    assert_eq!(
        array.as_map().unwrap().get_str("child"),
        Some(&Value::from(json!({"name": "child"})))
    );

    registry
        .register(Schema::new("Holder").field(FieldDecl::annotated(
            "childs",
            "App\\Dto\\NestedChild[]",
        )))
        .unwrap();
    let child = registry
        .construct("App\\Dto\\NestedChild", json!({"name": "child"}))
        .unwrap();
    let mut input = Map::new();
    input.insert("childs", vec![Value::Object(child)]);
    let holder = registry.construct("Holder", input).unwrap();

    assert_eq!(
        serde_json::to_value(holder.to_array()).unwrap(),
        json!({"childs": [{"name": "child"}]})
    );
    assert!(holder.to_array().is_plain());
}

#[test]
fn test_nested_lists_are_cast_to_lists_of_dtos() {
    let registry = setup_registry();
    let parent = registry
        .construct(
            "App\\Dto\\NestedParentOfMany",
            json!({"name": "parent", "children": [{"name": "child"}]}),
        )
        .unwrap();

    let children = parent.get("children").and_then(Value::as_list).unwrap();
    assert_eq!(children.len(), 1);
    let child = children[0].as_object().unwrap();
    assert_eq!(child.schema_name(), "App\\Dto\\NestedChild");
    assert_eq!(child.get("name"), Some(&Value::from("child")));
}

#[test]
fn test_nested_lists_are_cast_recursively() {
    let mut registry = setup_registry();
    registry
        .register(Schema::new("Tree").field(FieldDecl::annotated(
            "children",
            "\\App\\Dto\\NestedParentOfMany[]",
        )))
        .unwrap();

    let tree = registry
        .construct(
            "Tree",
            json!({"children": [{"name": "child", "children": [{"name": "grandchild"}]}]}),
        )
        .unwrap();

    let array = serde_json::to_value(tree.to_array()).unwrap();
    assert_eq!(array["children"][0]["children"][0], json!({"name": "grandchild"}));
}

#[test]
fn test_nested_lists_cannot_cast_null() {
    let registry = setup_registry();
    let err = registry
        .construct("App\\Dto\\NestedParentOfMany", json!({"name": "parent"}))
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Invalid type: expected `App\\Dto\\NestedParentOfMany::children` to be of type `\\App\\Dto\\NestedChild[]`, instead got value `null`, which is NULL."
    );
}

#[test]
fn test_nested_lists_can_be_nullable() {
    let mut registry = setup_registry();
    let schema = Schema::new("NullableChildren").field(FieldDecl::annotated(
        "children",
        "App\\Dto\\NestedChild[]|null",
    ));
    let dto = construct_with(&mut registry, schema, json!({"children": null})).unwrap();
    assert_eq!(dto.get("children"), Some(&Value::Null));
}

#[test]
fn test_empty_dto_cast_from_empty_list() {
    let mut registry = setup_registry();
    let schema = Schema::new("HasEmpty").field(FieldDecl::annotated("child", "\\App\\Dto\\EmptyChild"));
    let dto = construct_with(&mut registry, schema, json!({"child": []})).unwrap();
    let child = dto.get("child").and_then(Value::as_object).unwrap();
    assert_eq!(child.schema_name(), "App\\Dto\\EmptyChild");
}

/// Violations inside a nested instance name the nested schema and field.
#[test]
fn test_nested_violations_keep_nested_names() {
    let registry = setup_registry();
    let err = registry
        .construct(
            "App\\Dto\\NestedParent",
            json!({"name": 1, "child": {"name": false}}),
        )
        .unwrap_err();
    let err = validation(err);

    assert_eq!(err.schema(), "App\\Dto\\NestedParent");
    let diags: Vec<(&str, &str)> = err
        .diagnostics()
        .map(|d| (d.schema.as_str(), d.field.as_str()))
        .collect();
    assert_eq!(
        diags,
        vec![
            ("App\\Dto\\NestedParent", "name"),
            ("App\\Dto\\NestedChild", "name")
        ]
    );
}

/// A mapping no class alternative accepts is one violation against the union.
#[test]
fn test_union_of_classes_without_match() {
    let mut registry = setup_registry();
    let schema = Schema::new("App\\Dto\\Holder").field(FieldDecl::annotated("foo", "NestedChild|DummyClass"));
    let err = construct_with(&mut registry, schema, json!({"foo": {"name": 1}})).unwrap_err();
    let err = validation(err);

    assert_eq!(err.len(), 1);
    assert_eq!(
        err.to_string(),
        "Invalid type: expected `App\\Dto\\Holder::foo` to be of type `NestedChild|DummyClass`, \
         instead got value `array`, which is array."
    );
    let diag = err.diagnostics().next().unwrap();
    assert_eq!(diag.schema, "App\\Dto\\Holder");
    assert_eq!(diag.field, "foo");
}

/// A long chain through a class union with one bad leaf fails promptly.
#[test]
fn test_deep_union_chain_rejected() {
    let mut registry = SchemaRegistry::new();
    registry
        .register(
            Schema::new("Node")
                .field(FieldDecl::annotated("label", "string"))
                .field(FieldDecl::annotated("next", "Node|Leaf|null").with_default(Value::Null)),
        )
        .unwrap();
    registry
        .register(Schema::new("Leaf").field(FieldDecl::annotated("value", "string")))
        .unwrap();

    let chain = |bottom: serde_json::Value| {
        (0..39).fold(bottom, |next, i| json!({"label": format!("n{}", i), "next": next}))
    };

    let started = std::time::Instant::now();
    let err = validation(registry.construct("Node", chain(json!({"label": 1}))).unwrap_err());
    assert!(started.elapsed() < std::time::Duration::from_secs(10));

    assert_eq!(err.len(), 1);
    let diag = err.diagnostics().next().unwrap();
    assert_eq!((diag.schema.as_str(), diag.field.as_str()), ("Node", "next"));
    assert_eq!(diag.expected, "Node|Leaf|null");

    let ok = registry.construct("Node", chain(json!({"label": "end"}))).unwrap();
    let array = serde_json::to_value(ok.to_array()).unwrap();
    assert_eq!(array["next"]["label"], json!("n37"));
}

#[test]
fn test_null_against_non_nullable_class_fails() {
    let registry = setup_registry();
    let err = registry
        .construct("App\\Dto\\NestedParent", json!({"name": "p", "child": null}))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("NestedParent::child` to be of type `NestedChild`, instead got value `null`, which is NULL."));
}

// =============================================================================
// Iterable and Map Tests
// =============================================================================

#[test]
fn test_iterable_is_supported() {
    let mut registry = setup_registry();
    registry.register(single_field("It", "iterable<string>")).unwrap();
    registry.register(single_field("Mixed", "iterable")).unwrap();

    assert!(registry.construct("It", json!({"foo": ["foo", "bar"]})).is_ok());

    let mut input = Map::new();
    input.insert("foo", Value::from_iterable(["foo", "bar"].into_iter()));
    assert!(registry.construct("It", input).is_ok());

    assert!(registry.construct("Mixed", json!({"foo": ["foo", 1]})).is_ok());
}

#[test]
fn test_incoherent_iterable_type() {
    let mut registry = setup_registry();
    let err = construct_with(&mut registry, single_field("It", "iterable<string>"), json!({"foo": ["foo", 1]}))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("It::foo` to be of type `iterable<string>`, instead got value `array`."));
}

#[test]
fn test_iterable_union_casts_nested() {
    let mut registry = setup_registry();
    let schema = Schema::new("IterUnion").field(FieldDecl::annotated(
        "children",
        "iterable<\\App\\Dto\\NestedChild>|iterable<string>",
    ));
    let dto = construct_with(
        &mut registry,
        schema,
        json!({"children": [{"name": "Alice"}, {"name": "Bob"}]}),
    )
    .unwrap();

    let children = dto.get("children").and_then(Value::as_list).unwrap();
    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|c| c.as_object().is_some()));
    assert_eq!(children[1].as_object().unwrap().get("name"), Some(&Value::from("Bob")));
}

#[test]
fn test_map_values_are_type_checked() {
    let mut registry = setup_registry();
    registry.register(Schema::new("Spaced").field(FieldDecl::annotated("map", "array<string, int>"))).unwrap();
    registry.register(Schema::new("Tight").field(FieldDecl::annotated("map", "array<string,int>"))).unwrap();

    assert!(registry.construct("Spaced", json!({"map": {"a": 1, "b": 2}})).is_ok());
    assert!(registry.construct("Tight", json!({"map": {"a": 1, "b": 2}})).is_ok());

    let err = registry
        .construct("Spaced", json!({"map": {"a": 1, "b": "wrong"}}))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("Spaced::map` to be of type `array<string, int>`, instead got value `array`."));
}

#[test]
fn test_map_keys_are_type_checked() {
    let mut registry = setup_registry();
    registry.register(Schema::new("Spaced").field(FieldDecl::annotated("map", "array<string, int>"))).unwrap();
    registry.register(Schema::new("Tight").field(FieldDecl::annotated("map", "array<string,int>"))).unwrap();

    let err = registry
        .construct("Spaced", json!({"map": {"1": 1, "b": 2}}))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("Spaced::map` to be of type `array<string, int>`, instead got value `array`."));

    let err = registry
        .construct("Tight", json!({"map": {"1": 1, "b": 2}}))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("Tight::map` to be of type `array<string,int>`, instead got value `array`."));
}

// =============================================================================
// Alias, Inheritance and Rust Descriptor Tests
// =============================================================================

#[test]
fn test_alias_reads_other_input_key() {
    let mut registry = setup_registry();
    let schema = Schema::new("Aliased").field(FieldDecl::untyped("name").alias("Name"));
    let dto = construct_with(&mut registry, schema, json!({"Name": "Alice"})).unwrap();
    assert_eq!(dto.get("name"), Some(&Value::from("Alice")));

    // The field's own name is not an accepted key
    assert!(registry.construct("Aliased", json!({"name": "Alice"})).is_err());
}

#[test]
fn test_child_schema_satisfies_parent_class() {
    let mut registry = setup_registry();
    registry
        .register(
            Schema::new("App\\Dto\\SpecialChild")
                .extends("NestedChild")
                .field(FieldDecl::annotated("age", "int")),
        )
        .unwrap();

    let special = registry
        .construct("App\\Dto\\SpecialChild", json!({"name": "kid", "age": 7}))
        .unwrap();
    let keys: Vec<&str> = special.fields().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["name", "age"]);

    let mut input = Map::new();
    input.insert("name", "parent");
    input.insert("child", special);
    assert!(registry.construct("App\\Dto\\NestedParent", input).is_ok());
}

#[test]
fn test_self_referential_schema() {
    let mut registry = setup_registry();
    registry
        .register(
            Schema::new("Category")
                .field(FieldDecl::annotated("title", "string"))
                .field(FieldDecl::annotated("children", "self[]").with_default(Value::List(vec![]))),
        )
        .unwrap();

    let root = registry
        .construct(
            "Category",
            json!({"title": "root", "children": [{"title": "a"}, {"title": "b", "children": [{"title": "c"}]}]}),
        )
        .unwrap();

    let array = serde_json::to_value(root.to_array()).unwrap();
    assert_eq!(array["children"][1]["children"][0]["title"], json!("c"));
}

#[test]
fn test_rust_descriptor_declaration() {
    let mut registry = setup_registry();
    let schema = Schema::new("Typed")
        .field(FieldDecl::typed(
            "ids",
            TypeDescriptor::list_of(TypeDescriptor::int()),
        ))
        .field(FieldDecl::typed(
            "child",
            TypeDescriptor::nullable(TypeDescriptor::class("App\\Dto\\NestedChild")),
        ));

    registry.register(schema).unwrap();
    let dto = registry
        .construct("Typed", json!({"ids": [1, 2], "child": {"name": "c"}}))
        .unwrap();
    assert!(dto.get("child").and_then(Value::as_object).is_some());

    let err = registry
        .construct("Typed", json!({"ids": [1, "2"], "child": null}))
        .unwrap_err();
    assert!(err.to_string().contains("`Typed::ids` to be of type `integer[]`"));
}

// =============================================================================
// Collection Tests
// =============================================================================

#[test]
fn test_array_of_dtos() {
    let registry = setup_registry();
    let collection = registry
        .array_of("App\\Dto\\TestDto", json!([{"testProperty": 1}, {"testProperty": 2}]))
        .unwrap();

    assert_eq!(collection.len(), 2);
    assert_eq!(collection[0].get("testProperty"), Some(&Value::Int(1)));
    assert_eq!(collection[1].get("testProperty"), Some(&Value::Int(2)));
}

/// A collection stops at the first failing element.
#[test]
fn test_array_of_fails_fast() {
    let registry = setup_registry();
    let err = registry
        .array_of(
            "App\\Dto\\TestDto",
            json!([{"testProperty": 1}, {"testProperty": "2"}, {"testProperty": "3"}]),
        )
        .unwrap_err();

    match &err {
        DtoError::InvalidElement { index, schema, .. } => {
            assert_eq!(*index, 1);
            assert_eq!(schema, "App\\Dto\\TestDto");
        }
        other => panic!("expected invalid element, got {:?}", other),
    }
    assert_eq!(err.validation().map(|e| e.len()), Some(1));
}
