//! Minimal I/O schema representation shared by the `GraphValidator`'s edge
//! type-compatibility check (spec §4.1 step 7) and the `NodeExecutor`'s
//! lenient input/output validation (spec §4.4 steps 2 and 5).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Primitive type tags a field can carry. `Enum` compares equal to
/// `String` across an edge per spec §4.1 step 7 ("enum→string").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Enum,
}

impl FieldType {
    /// Whether two field type tags are compatible across an edge.
    pub fn compatible_with(&self, other: &FieldType) -> bool {
        let norm = |t: &FieldType| if matches!(t, FieldType::Enum) { FieldType::String } else { *t };
        norm(self) == norm(other)
    }
}

/// A node's declared input or output shape: field name → type tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSchema {
    pub fields: HashMap<String, FieldType>,
}

/// The outcome of validating a JSON value against a [`FieldSchema`].
/// Validation in this system is always *lenient* (spec §4.4 step 2,
/// Design Note Open Question): mismatches are collected as warnings and
/// never block execution unless `strict` is set.
pub fn validate_value(schema: &FieldSchema, value: &Value, strict: bool) -> Result<(), Vec<String>> {
    let mut warnings = Vec::new();

    let Some(obj) = value.as_object() else {
        if schema.fields.is_empty() {
            return Ok(());
        }
        warnings.push("expected a JSON object for schema validation".to_string());
        return if strict { Err(warnings) } else { Ok(()) };
    };

    for (field, expected) in &schema.fields {
        match obj.get(field) {
            None => warnings.push(format!("missing field '{field}'")),
            Some(actual) => {
                let actual_type = infer_type(actual);
                if !actual_type.compatible_with(expected) {
                    warnings.push(format!(
                        "field '{field}' expected {expected:?}, found {actual_type:?}"
                    ));
                }
            }
        }
    }

    if warnings.is_empty() {
        Ok(())
    } else if strict {
        Err(warnings)
    } else {
        Ok(())
    }
}

fn infer_type(value: &Value) -> FieldType {
    match value {
        Value::String(_) => FieldType::String,
        Value::Number(_) => FieldType::Number,
        Value::Bool(_) => FieldType::Boolean,
        Value::Array(_) => FieldType::Array,
        Value::Object(_) => FieldType::Object,
        Value::Null => FieldType::Object,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enum_is_compatible_with_string() {
        assert!(FieldType::Enum.compatible_with(&FieldType::String));
        assert!(FieldType::String.compatible_with(&FieldType::Enum));
    }

    #[test]
    fn lenient_validation_never_errors() {
        let mut fields = HashMap::new();
        fields.insert("x".to_string(), FieldType::Number);
        let schema = FieldSchema { fields };
        let value = json!({ "x": "not a number" });
        assert!(validate_value(&schema, &value, false).is_ok());
    }

    #[test]
    fn strict_validation_surfaces_mismatches() {
        let mut fields = HashMap::new();
        fields.insert("x".to_string(), FieldType::Number);
        let schema = FieldSchema { fields };
        let value = json!({ "x": "not a number" });
        assert!(validate_value(&schema, &value, true).is_err());
    }
}
