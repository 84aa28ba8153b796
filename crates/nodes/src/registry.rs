//! The handler registry — maps normalized block type strings to boxed
//! `ExecutableNode` implementations. Shared by the `GraphValidator` (handler
//! existence check, spec §4.1 step 2) and the `NodeExecutor` (dispatch,
//! spec §4.4 step 4).

use std::collections::HashMap;
use std::sync::Arc;

use crate::{blocktype::normalize, ExecutableNode};

/// `node_type → handler`, keyed by the *normalized* type string so lookups
/// are case-insensitive with `-`/`_` treated as equivalent.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    handlers: HashMap<String, Arc<dyn ExecutableNode>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Register a handler under `block_type`.
    pub fn register(&mut self, block_type: impl Into<String>, handler: Arc<dyn ExecutableNode>) {
        self.handlers.insert(normalize(&block_type.into()), handler);
    }

    /// Look up a handler by an unnormalized type string.
    pub fn get(&self, block_type: &str) -> Option<&Arc<dyn ExecutableNode>> {
        self.handlers.get(&normalize(block_type))
    }

    pub fn contains(&self, block_type: &str) -> bool {
        self.handlers.contains_key(&normalize(block_type))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNode;
    use serde_json::json;

    #[test]
    fn lookup_is_case_and_separator_insensitive() {
        let mut reg = NodeRegistry::new();
        reg.register("data-transform", Arc::new(MockNode::returning("x", json!({}))));
        assert!(reg.contains("DATA_TRANSFORM"));
        assert!(reg.contains("Data-Transform"));
        assert!(!reg.contains("other"));
    }
}
