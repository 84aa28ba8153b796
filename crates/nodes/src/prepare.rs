//! Default-shaped field filling for well-known block types, run by the
//! `NodeExecutor` before handler invocation (spec §4.4 "Block data
//! preparation").

use serde_json::{json, Value};

/// Fill default-shaped fields for block types the executor knows about.
/// Unknown block types pass through unchanged — custom/plug-in blocks are
/// responsible for their own defaults.
pub fn prepare_block_data(block_type: &str, input: Value) -> Value {
    match crate::blocktype::normalize(block_type).as_str() {
        "email" => prepare_email(input),
        _ => input,
    }
}

fn prepare_email(mut input: Value) -> Value {
    let obj = match input.as_object_mut() {
        Some(obj) => obj,
        None => {
            input = json!({});
            input.as_object_mut().expect("just constructed as object")
        }
    };

    obj.entry("to").or_insert_with(|| json!(""));
    obj.entry("subject").or_insert_with(|| json!(""));
    obj.entry("body").or_insert_with(|| json!(""));

    let config = obj
        .entry("config")
        .or_insert_with(|| json!({}));
    if let Some(config_obj) = config.as_object_mut() {
        config_obj.entry("template").or_insert_with(|| json!(""));
        config_obj.entry("attachments").or_insert_with(|| json!([]));
    }

    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_gets_default_shape() {
        let out = prepare_block_data("EMAIL", json!({ "to": "a@b.com" }));
        assert_eq!(out["to"], "a@b.com");
        assert_eq!(out["subject"], "");
        assert_eq!(out["config"]["attachments"], json!([]));
    }

    #[test]
    fn unknown_type_passes_through() {
        let input = json!({ "foo": "bar" });
        assert_eq!(prepare_block_data("custom", input.clone()), input);
    }
}
