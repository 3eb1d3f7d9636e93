//! Schema validation helpers.
//!
//! This module validates a `serde_json::Value` against a [`Schema`] before the
//! provider acts on it, producing one [`Diagnostic`] per problem.
//!
//! # Example
//!
//! ```
//! use clerk_provider::schema::{Attribute, Schema};
//! use clerk_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("count", Attribute::optional_computed_int64());
//!
//! let diagnostics = validate(&schema, &json!({"name": "test", "count": 42}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "test", "count": "many"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("count".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use crate::value::is_unknown_marker;
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - The value must be an object (or null, which is treated as empty)
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes may be absent, but a present value is type-checked
/// - Unknown values are accepted for any attribute
/// - Attribute types must match the schema; `int64` accepts only integers
/// - JSON-typed string attributes must parse
/// - Attributes not declared in the schema are rejected
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let empty = serde_json::Map::new();
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    for (name, attr) in &schema.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    for name in obj.keys() {
        if !schema.attributes.contains_key(name) {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", name))
                    .with_detail("An attribute with this name is not expected here")
                    .with_attribute(name.as_str()),
            );
        }
    }

    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
///
/// This is a convenience wrapper around [`validate`] that returns a Result.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) if is_unknown_marker(v) => {},
        Some(v) => validate_attribute_type(attr, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr: &Attribute,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr.attr_type {
        AttributeType::String => match value.as_str() {
            Some(text) if attr.json => {
                if let Some(diag) = validate_json_text(text, path) {
                    diagnostics.push(diag);
                }
            },
            Some(_) => {},
            None => diagnostics.push(type_error(path, "string", value)),
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
    }
}

/// Check that an attribute's text is a JSON document.
///
/// Returns a diagnostic naming the attribute when it is not.
pub fn validate_json_text(text: &str, path: &str) -> Option<Diagnostic> {
    serde_json::from_str::<Value>(text).err().map(|e| {
        Diagnostic::error(format!("Error parsing {}", path))
            .with_detail(format!("Could not parse {} as JSON: {}", path, e))
            .with_attribute(path)
    })
}

// Helper functions

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Integral floats such as `10.0` are rejected: state decoding would.
fn is_int64(value: &Value) -> bool {
    value.as_i64().is_some()
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        ))
        .with_attribute(path)
}
