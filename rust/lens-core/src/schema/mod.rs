//! JSON Schema helpers: readable text and generation from Rust types.

pub mod json_schema;
pub mod readable;

pub use json_schema::{canonical_schema_string, readable_schema_for, schema_json_for};
pub use readable::{format_schema, format_schema_value};
