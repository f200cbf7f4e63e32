//! Bridge from Rust types deriving `JsonSchema` to schema strings.

use schemars::JsonSchema;
use serde_json::Value;

use super::readable::format_schema;

/// JSON Schema for `T` as a compact JSON string.
#[must_use]
pub fn schema_json_for<T: JsonSchema>() -> String {
    let schema = schemars::schema_for!(T);
    match serde_json::to_string(&schema) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize generated schema");
            "{}".to_string()
        }
    }
}

/// Readable text for `T`'s JSON Schema.
#[must_use]
pub fn readable_schema_for<T: JsonSchema>() -> String {
    format_schema(&schema_json_for::<T>())
}

/// Canonical string form of a schema value.
///
/// Strings holding JSON are re-serialized; other strings are kept verbatim.
#[must_use]
pub fn canonical_schema_string(value: &Value) -> String {
    match value {
        Value::String(text) => serde_json::from_str::<Value>(text)
            .map(|parsed| parsed.to_string())
            .unwrap_or_else(|_| text.clone()),
        other => other.to_string(),
    }
}
