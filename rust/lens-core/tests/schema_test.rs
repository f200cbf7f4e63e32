//! Readable schema text for hand-written and generated schemas.

use lens_core::schema::{format_schema, format_schema_value, readable_schema_for, schema_json_for};
use schemars::JsonSchema;
use serde_json::json;

#[derive(JsonSchema)]
#[allow(dead_code, reason = "only the schema derive reads these fields")]
struct Address {
    street: String,
    zip: Option<String>,
}

#[derive(JsonSchema)]
#[allow(dead_code, reason = "only the schema derive reads these fields")]
struct Customer {
    name: String,
    address: Address,
    tags: Vec<String>,
}

#[derive(JsonSchema)]
#[allow(dead_code, reason = "only the schema derive reads these fields")]
struct Category {
    name: String,
    children: Vec<Category>,
}

#[test]
fn test_min_length_round_trip() {
    let text = format_schema(r#"{"type":"string","minLength":3}"#);
    assert!(text.contains("Type: string"));
    assert!(text.contains("Minimum length: 3"));
}

#[test]
fn test_ref_formats_like_inlined_definition() {
    let inlined = format_schema(r#"{"type":"object","properties":{"n":{"type":"string"}}}"#);
    let referenced = format_schema(
        r##"{"$ref":"#/definitions/Foo","definitions":{"Foo":{"type":"object","properties":{"n":{"type":"string"}}}}}"##,
    );
    assert_eq!(referenced, inlined);

    let missing = format_schema(r##"{"$ref":"#/definitions/Missing"}"##);
    assert!(missing.contains("Reference: #/definitions/Missing (unresolved)"));
}

#[test]
fn test_nested_ref_inside_property() {
    let text = format_schema_value(&json!({
        "type": "object",
        "properties": {"owner": {"$ref": "#/$defs/User"}},
        "$defs": {"User": {"type": "object", "properties": {"email": {"type": "string", "format": "email"}}}}
    }));
    assert!(text.contains("  - owner:\n    Type: object\n    Properties:\n      - email:"));
    assert!(text.contains("        Format: email"));
}

#[test]
fn test_generated_schema_inlines_definitions() {
    let json = schema_json_for::<Customer>();
    assert!(json.contains("#/definitions/Address"));

    let text = readable_schema_for::<Customer>();
    assert!(text.contains("- address (required):"));
    assert!(text.contains("- street (required):"));
    assert!(text.contains("- tags (required):"));
    assert!(!text.contains("(unresolved)"));
}

#[test]
fn test_recursive_type_stops_at_cycle() {
    let text = readable_schema_for::<Category>();
    assert!(text.contains("(circular)"));
    assert!(text.contains("- children (required):"));
}

#[test]
fn test_invalid_json_never_panics() {
    let text = format_schema("{\"type\": ");
    assert!(text.starts_with("Invalid JSON schema"));
}
