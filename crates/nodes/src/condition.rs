//! `ConditionNode` — a test double for branch/gate-shaped nodes.
//!
//! Evaluates a single `field == value` check against its input and returns
//! `{ "matched": bool }`, standing in for real condition-block handlers
//! (out of scope per spec.md §1) in tests that need a node whose output
//! actually depends on its input rather than always returning a fixed value.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{traits::ExecutionContext, ExecutableNode, NodeError};

pub struct ConditionNode {
    field: String,
    expected: Value,
}

impl ConditionNode {
    pub fn equals(field: impl Into<String>, expected: Value) -> Self {
        Self { field: field.into(), expected }
    }
}

#[async_trait]
impl ExecutableNode for ConditionNode {
    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let actual = input.get(&self.field);
        let matched = actual == Some(&self.expected);
        Ok(json!({ "matched": matched }))
    }

    fn validate_config(&self, config: &Value, _user_id: uuid::Uuid) -> Vec<String> {
        if config.get("field").and_then(Value::as_str).is_none() {
            return vec!["condition node config requires a 'field' string".to_string()];
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext {
            node_id: "n".to_string(),
            execution_id: uuid::Uuid::new_v4(),
            workflow_id: uuid::Uuid::new_v4(),
            user_id: uuid::Uuid::new_v4(),
            inputs: Value::Null,
            config: Value::Null,
            previous_outputs: Default::default(),
            workflow_data: Value::Null,
            logger: std::sync::Arc::new(crate::traits::NullLogger),
        }
    }

    #[tokio::test]
    async fn matches_when_field_equals_expected() {
        let node = ConditionNode::equals("status", json!("ok"));
        let out = node.execute(json!({ "status": "ok" }), &ctx()).await.unwrap();
        assert_eq!(out, json!({ "matched": true }));
    }

    #[tokio::test]
    async fn does_not_match_when_field_differs() {
        let node = ConditionNode::equals("status", json!("ok"));
        let out = node.execute(json!({ "status": "error" }), &ctx()).await.unwrap();
        assert_eq!(out, json!({ "matched": false }));
    }

    #[test]
    fn validate_config_requires_field() {
        let node = ConditionNode::equals("status", json!("ok"));
        assert!(!node.validate_config(&json!({}), uuid::Uuid::new_v4()).is_empty());
        assert!(node.validate_config(&json!({ "field": "status" }), uuid::Uuid::new_v4()).is_empty());
    }
}
