//! Plain-text rendering of JSON Schema documents.
//!
//! Output is one fact per line, nested blocks indented by two spaces.
//! Formatting never fails: bad input becomes an inline message.

use serde_json::{Map, Value};

const INDENT: &str = "  ";

/// Format a JSON Schema given as text.
#[must_use]
pub fn format_schema(json: &str) -> String {
    match serde_json::from_str::<Value>(json) {
        Ok(schema) => format_schema_value(&schema),
        Err(e) => format!("Invalid JSON schema: {e}"),
    }
}

/// Format a parsed JSON Schema.
///
/// Local `$ref`s (`#`, `#/definitions/..`, `#/$defs/..`) are expanded in
/// place, so a reference renders exactly like its inlined target.
#[must_use]
pub fn format_schema_value(schema: &Value) -> String {
    let mut formatter = Formatter {
        root: schema,
        lines: Vec::new(),
        visiting: Vec::new(),
    };
    formatter.node(schema, 0);
    formatter.lines.join("\n")
}

/// Compact JSON rendering of a value.
fn show(value: &Value) -> String {
    value.to_string()
}

fn show_all(values: &[Value]) -> String {
    values.iter().map(show).collect::<Vec<_>>().join(", ")
}

struct Formatter<'a> {
    root: &'a Value,
    lines: Vec<String>,
    /// `$ref`s currently being expanded, outermost first.
    visiting: Vec<String>,
}

impl<'a> Formatter<'a> {
    fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        self.lines.push(format!("{}{}", INDENT.repeat(depth), text.as_ref()));
    }

    fn resolve(&self, reference: &str) -> Option<&'a Value> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(self.root);
        }
        self.root.pointer(pointer)
    }

    fn node(&mut self, schema: &'a Value, depth: usize) {
        let object = match schema {
            Value::Object(object) => object,
            Value::Bool(true) => return self.line(depth, "Any value"),
            Value::Bool(false) => return self.line(depth, "No value allowed"),
            other => return self.line(depth, format!("Invalid schema node: {}", show(other))),
        };

        if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
            return self.reference(reference, depth);
        }

        let before = self.lines.len();
        self.annotations(object, depth);
        self.kind(object, depth);
        self.string_rules(object, depth);
        self.number_rules(object, depth);
        self.values(object, depth);
        self.object_rules(object, depth);
        self.array_rules(object, depth);
        self.combinators(object, depth);

        if self.lines.len() == before {
            self.line(depth, "Any value");
        }
    }

    fn reference(&mut self, reference: &str, depth: usize) {
        if self.visiting.iter().any(|r| r == reference) {
            return self.line(depth, format!("Reference: {reference} (circular)"));
        }
        match self.resolve(reference) {
            Some(target) => {
                self.visiting.push(reference.to_string());
                self.node(target, depth);
                self.visiting.pop();
            }
            None => self.line(depth, format!("Reference: {reference} (unresolved)")),
        }
    }

    fn annotations(&mut self, object: &Map<String, Value>, depth: usize) {
        if let Some(title) = object.get("title").and_then(Value::as_str) {
            self.line(depth, format!("Title: {title}"));
        }
        if let Some(description) = object.get("description").and_then(Value::as_str) {
            self.line(depth, format!("Description: {description}"));
        }
    }

    fn kind(&mut self, object: &Map<String, Value>, depth: usize) {
        match object.get("type") {
            Some(Value::String(kind)) => self.line(depth, format!("Type: {kind}")),
            Some(Value::Array(kinds)) => {
                let kinds: Vec<_> = kinds.iter().filter_map(Value::as_str).collect();
                self.line(depth, format!("Type: {}", kinds.join(" | ")));
            }
            _ => {}
        }
    }

    fn string_rules(&mut self, object: &Map<String, Value>, depth: usize) {
        if let Some(format) = object.get("format").and_then(Value::as_str) {
            self.line(depth, format!("Format: {format}"));
        }
        if let Some(min) = object.get("minLength") {
            self.line(depth, format!("Minimum length: {}", show(min)));
        }
        if let Some(max) = object.get("maxLength") {
            self.line(depth, format!("Maximum length: {}", show(max)));
        }
        if let Some(pattern) = object.get("pattern").and_then(Value::as_str) {
            self.line(depth, format!("Pattern: {pattern}"));
        }
    }

    fn number_rules(&mut self, object: &Map<String, Value>, depth: usize) {
        let bounds = [
            ("minimum", "exclusiveMinimum", "Minimum", "Exclusive minimum"),
            ("maximum", "exclusiveMaximum", "Maximum", "Exclusive maximum"),
        ];
        for (inclusive, exclusive, label, exclusive_label) in bounds {
            match (object.get(inclusive), object.get(exclusive)) {
                // Draft 4: boolean flag modifies the inclusive bound.
                (Some(bound), Some(Value::Bool(true))) => {
                    self.line(depth, format!("{exclusive_label}: {}", show(bound)));
                }
                (bound, limit) => {
                    if let Some(bound) = bound {
                        self.line(depth, format!("{label}: {}", show(bound)));
                    }
                    if let Some(limit) = limit.filter(|l| l.is_number()) {
                        self.line(depth, format!("{exclusive_label}: {}", show(limit)));
                    }
                }
            }
        }
        if let Some(step) = object.get("multipleOf") {
            self.line(depth, format!("Multiple of: {}", show(step)));
        }
    }

    fn values(&mut self, object: &Map<String, Value>, depth: usize) {
        if let Some(Value::Array(options)) = object.get("enum") {
            self.line(depth, format!("Allowed values: {}", show_all(options)));
        }
        if let Some(constant) = object.get("const") {
            self.line(depth, format!("Constant value: {}", show(constant)));
        }
        if let Some(default) = object.get("default") {
            self.line(depth, format!("Default: {}", show(default)));
        }
        match object.get("examples") {
            Some(Value::Array(examples)) => {
                self.line(depth, format!("Examples: {}", show_all(examples)));
            }
            Some(example) => self.line(depth, format!("Examples: {}", show(example))),
            None => {}
        }
    }

    fn object_rules(&mut self, object: &'a Map<String, Value>, depth: usize) {
        let required: Vec<&str> = object
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        if let Some(Value::Object(properties)) = object.get("properties") {
            self.line(depth, "Properties:");
            for (name, property) in properties {
                let marker = if required.contains(&name.as_str()) {
                    " (required)"
                } else {
                    ""
                };
                self.line(depth + 1, format!("- {name}{marker}:"));
                self.node(property, depth + 2);
            }
        }

        let undeclared: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| {
                !object
                    .get("properties")
                    .and_then(Value::as_object)
                    .is_some_and(|p| p.contains_key(*name))
            })
            .collect();
        if !undeclared.is_empty() {
            self.line(depth, format!("Required: {}", undeclared.join(", ")));
        }

        match object.get("additionalProperties") {
            Some(Value::Bool(true)) => self.line(depth, "Additional properties: allowed"),
            Some(Value::Bool(false)) => self.line(depth, "Additional properties: not allowed"),
            Some(schema @ Value::Object(_)) => {
                self.line(depth, "Additional properties:");
                self.node(schema, depth + 1);
            }
            _ => {}
        }

        if let Some(min) = object.get("minProperties") {
            self.line(depth, format!("Minimum properties: {}", show(min)));
        }
        if let Some(max) = object.get("maxProperties") {
            self.line(depth, format!("Maximum properties: {}", show(max)));
        }
    }

    fn array_rules(&mut self, object: &'a Map<String, Value>, depth: usize) {
        match object.get("items") {
            Some(Value::Array(items)) => {
                self.line(depth, "Items (tuple):");
                for (i, item) in items.iter().enumerate() {
                    self.line(depth + 1, format!("- Item {}:", i + 1));
                    self.node(item, depth + 2);
                }
            }
            Some(items) => {
                self.line(depth, "Items:");
                self.node(items, depth + 1);
            }
            None => {}
        }
        if let Some(min) = object.get("minItems") {
            self.line(depth, format!("Minimum items: {}", show(min)));
        }
        if let Some(max) = object.get("maxItems") {
            self.line(depth, format!("Maximum items: {}", show(max)));
        }
        if object.get("uniqueItems") == Some(&Value::Bool(true)) {
            self.line(depth, "Unique items: yes");
        }
    }

    fn combinators(&mut self, object: &'a Map<String, Value>, depth: usize) {
        let groups = [
            ("oneOf", "One of:", "Option"),
            ("anyOf", "Any of:", "Option"),
            ("allOf", "All of:", "Constraint"),
        ];
        for (key, heading, item) in groups {
            if let Some(Value::Array(schemas)) = object.get(key) {
                self.line(depth, heading);
                for (i, schema) in schemas.iter().enumerate() {
                    self.line(depth + 1, format!("- {item} {}:", i + 1));
                    self.node(schema, depth + 2);
                }
            }
        }
        if let Some(schema) = object.get("not") {
            self.line(depth, "Not:");
            self.node(schema, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_constraints() {
        let text = format_schema(r#"{"type":"string","minLength":3}"#);
        assert!(text.contains("Type: string"));
        assert!(text.contains("Minimum length: 3"));
    }

    #[test]
    fn test_invalid_json_is_reported_inline() {
        assert!(format_schema("{not json").starts_with("Invalid JSON schema:"));
    }

    #[test]
    fn test_object_with_required_fields() {
        let text = format_schema_value(&json!({
            "type": "object",
            "properties": {
                "email": {"type": "string", "format": "email"},
                "age": {"type": "integer", "minimum": 0, "exclusiveMaximum": 150}
            },
            "required": ["email"],
            "additionalProperties": false
        }));
        assert_eq!(
            text,
            [
                "Type: object",
                "Properties:",
                "  - email (required):",
                "    Type: string",
                "    Format: email",
                "  - age:",
                "    Type: integer",
                "    Minimum: 0",
                "    Exclusive maximum: 150",
                "Additional properties: not allowed",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_properties_keep_declaration_order() {
        let text = format_schema(
            r#"{"properties":{"zeta":{"type":"string"},"alpha":{"type":"number"}}}"#,
        );
        let zeta = text.find("- zeta:").unwrap();
        let alpha = text.find("- alpha:").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn test_array_and_values() {
        let text = format_schema_value(&json!({
            "type": "array",
            "items": {"enum": ["a", "b"]},
            "minItems": 1,
            "uniqueItems": true,
            "default": ["a"]
        }));
        assert!(text.contains("Items:\n  Allowed values: \"a\", \"b\""));
        assert!(text.contains("Minimum items: 1"));
        assert!(text.contains("Unique items: yes"));
        assert!(text.contains("Default: [\"a\"]"));
    }

    #[test]
    fn test_combinators_are_enumerated() {
        let text = format_schema_value(&json!({
            "oneOf": [{"type": "string"}, {"type": "null"}],
            "allOf": [{"minLength": 1}]
        }));
        assert!(text.contains("One of:\n  - Option 1:\n    Type: string\n  - Option 2:\n    Type: null"));
        assert!(text.contains("All of:\n  - Constraint 1:\n    Minimum length: 1"));
    }

    #[test]
    fn test_ref_matches_inlined_target() {
        let foo = json!({"type": "object", "properties": {"n": {"type": "string"}}});
        let referenced = json!({
            "$ref": "#/definitions/Foo",
            "definitions": {"Foo": foo.clone()}
        });
        assert_eq!(format_schema_value(&referenced), format_schema_value(&foo));
    }

    #[test]
    fn test_unresolved_ref() {
        let text = format_schema(r##"{"$ref":"#/definitions/Missing","definitions":{}}"##);
        assert_eq!(text, "Reference: #/definitions/Missing (unresolved)");
    }

    #[test]
    fn test_defs_and_escaped_pointer() {
        let text = format_schema_value(&json!({
            "properties": {"x": {"$ref": "#/$defs/a~1b"}},
            "$defs": {"a/b": {"type": "boolean"}}
        }));
        assert!(text.contains("- x:\n    Type: boolean"));
    }

    #[test]
    fn test_circular_ref() {
        let text = format_schema_value(&json!({
            "$ref": "#/definitions/Node",
            "definitions": {
                "Node": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/definitions/Node"}}
                }
            }
        }));
        assert!(text.contains("Reference: #/definitions/Node (circular)"));
    }

    #[test]
    fn test_empty_and_boolean_schemas() {
        assert_eq!(format_schema("{}"), "Any value");
        assert_eq!(format_schema("false"), "No value allowed");
    }
}
