//! Block type resolution and normalization — used identically by the
//! `GraphValidator` (C1) and the `NodeExecutor` (C5), spec §4.1 step 1 and
//! §4.4 step 1: "same precedence".

use serde_json::Value;

/// Resolve a node's type string with strict priority:
/// `node.type → node.data.type → node.data.blockType → node.data.config.blockType`.
///
/// `node_type` and `data` come from the two places a type can live in the
/// freeform `NodeDefinition.config` payload (spec Design Notes: "Dynamic
/// block shapes"). Returns `None` if no candidate is found.
pub fn resolve_block_type<'a>(node_type: &'a str, data: &'a Value) -> Option<&'a str> {
    if !node_type.is_empty() {
        return Some(node_type);
    }
    if let Some(t) = data.get("type").and_then(Value::as_str) {
        return Some(t);
    }
    if let Some(t) = data.get("blockType").and_then(Value::as_str) {
        return Some(t);
    }
    if let Some(t) = data
        .get("config")
        .and_then(|c| c.get("blockType"))
        .and_then(Value::as_str)
    {
        return Some(t);
    }
    None
}

/// Case-insensitive comparison with `-`/`_` treated as equivalent, per
/// spec §4.1 step 1.
pub fn normalize(type_str: &str) -> String {
    type_str.to_lowercase().replace('-', "_")
}

/// Compare two type strings under the normalization rule above.
pub fn types_match(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_node_type_first() {
        let data = json!({ "type": "ignored" });
        assert_eq!(resolve_block_type("EMAIL", &data), Some("EMAIL"));
    }

    #[test]
    fn falls_back_through_precedence() {
        assert_eq!(
            resolve_block_type("", &json!({ "type": "a" })),
            Some("a")
        );
        assert_eq!(
            resolve_block_type("", &json!({ "blockType": "b" })),
            Some("b")
        );
        assert_eq!(
            resolve_block_type("", &json!({ "config": { "blockType": "c" } })),
            Some("c")
        );
        assert_eq!(resolve_block_type("", &json!({})), None);
    }

    #[test]
    fn normalization_treats_dash_and_underscore_as_equivalent() {
        assert!(types_match("data-transform", "DATA_TRANSFORM"));
        assert!(!types_match("email", "http"));
    }
}
