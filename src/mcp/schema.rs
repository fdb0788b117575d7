//! Validation against the subset of JSON Schema that tool declarations use.
//!
//! Supported keywords: `type` (a name or a list of names), `properties`,
//! `required`, `additionalProperties` (boolean form), `items` (single
//! schema) and `enum`. Anything else, including keywords whose values have
//! the wrong shape, is ignored: a malformed schema constrains nothing.
//!
//! Violations are human-readable strings prefixed with the location of the
//! offending value, e.g. `$.options.format: value must be one of ["json","table"]`.

use serde_json::{Map, Value};

/// Stateless schema validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    /// Validates `value` against `schema`.
    ///
    /// Returns every violation found; an empty list means the value is valid.
    #[must_use]
    pub fn validate(value: &Value, schema: &Value) -> Vec<String> {
        let mut violations = Vec::new();
        check(value, schema, "$", &mut violations);
        violations
    }
}

fn check(value: &Value, schema: &Value, path: &str, out: &mut Vec<String>) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    if let Some(expected) = schema.get("type") {
        if !type_matches(value, expected) {
            out.push(format!(
                "{path}: expected {}, got {}",
                describe_type(expected),
                type_name(value)
            ));
            return;
        }
    }

    if let Some(Value::Array(allowed)) = schema.get("enum") {
        if !allowed.contains(value) {
            out.push(format!(
                "{path}: value must be one of {}",
                Value::Array(allowed.clone())
            ));
        }
    }

    match value {
        Value::Object(obj) => check_object(obj, schema, path, out),
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for (index, item) in items.iter().enumerate() {
                    check(item, item_schema, &format!("{path}[{index}]"), out);
                }
            }
        }
        _ => {}
    }
}

fn check_object(
    obj: &Map<String, Value>,
    schema: &Map<String, Value>,
    path: &str,
    out: &mut Vec<String>,
) {
    let properties = schema.get("properties").and_then(Value::as_object);

    if let Some(Value::Array(required)) = schema.get("required") {
        for name in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(name) {
                out.push(format!("{path}: missing required property '{name}'"));
            }
        }
    }

    if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
        for key in obj.keys() {
            if !properties.is_some_and(|p| p.contains_key(key)) {
                out.push(format!("{path}: unexpected property '{key}'"));
            }
        }
    }

    if let Some(properties) = properties {
        for (key, child) in obj {
            if let Some(child_schema) = properties.get(key) {
                check(child, child_schema, &format!("{path}.{key}"), out);
            }
        }
    }
}

fn type_matches(value: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(name) => is_type(value, name),
        Value::Array(names) => {
            let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
            names.is_empty() || names.iter().any(|name| is_type(value, name))
        }
        _ => true,
    }
}

fn is_type(value: &Value, name: &str) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        // Unknown type names constrain nothing.
        _ => true,
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.as_str().unwrap_or("?").to_string(),
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
