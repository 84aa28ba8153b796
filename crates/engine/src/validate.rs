//! `GraphValidator` (C1) — the seven-check pipeline run before a workflow
//! may be scheduled or executed (spec §4.1). Cycle detection here uses its
//! own depth-first search distinct from `dag::topological_sort`'s Kahn's
//! algorithm — the two are required to agree (`CycleOrOrphanError` in
//! `dag` is a defensive backstop, not the primary diagnostic).

use std::collections::{HashMap, HashSet};

use nodes::blocktype::{normalize, types_match};
use nodes::NodeRegistry;
use uuid::Uuid;

use crate::error::{TypeWarning, ValidationError};
use crate::models::{Edge, NodeDefinition, Workflow};
use crate::EngineError;

/// Terminal-node category allow-list (spec §4.1 step 6, default
/// `ACTION,TRIGGER`). A node's category is read from
/// `data.category`/`config.category`, defaulting to `ACTION` when absent —
/// most block types (http, email, transform, …) are actions; only trigger
/// nodes need to opt in explicitly.
#[derive(Debug, Clone)]
pub struct GraphValidatorConfig {
    pub terminal_allowed_categories: HashSet<String>,
}

impl Default for GraphValidatorConfig {
    fn default() -> Self {
        Self { terminal_allowed_categories: ["ACTION", "TRIGGER"].into_iter().map(String::from).collect() }
    }
}

pub struct GraphValidator<'a> {
    registry: &'a NodeRegistry,
    config: GraphValidatorConfig,
}

impl<'a> GraphValidator<'a> {
    pub fn new(registry: &'a NodeRegistry, config: GraphValidatorConfig) -> Self {
        Self { registry, config }
    }

    /// Run all seven checks. Returns non-fatal edge type-compatibility
    /// warnings on success.
    pub fn validate(&self, workflow: &Workflow, user_id: Uuid) -> Result<Vec<TypeWarning>, EngineError> {
        self.check_ids_and_types(&workflow.nodes)?;
        self.check_handlers_exist(&workflow.nodes)?;
        self.check_handler_configs(&workflow.nodes, user_id)?;
        self.check_acyclic(&workflow.nodes, &workflow.edges)?;
        self.check_no_orphans(&workflow.nodes, &workflow.edges)?;
        self.check_terminal_categories(&workflow.nodes, &workflow.edges)?;
        Ok(self.check_type_compatibility(&workflow.nodes, &workflow.edges))
    }

    /// Step 1: every node resolves to a non-empty type under the stated
    /// precedence.
    fn check_ids_and_types(&self, nodes: &[NodeDefinition]) -> Result<(), EngineError> {
        let mut errors = Vec::new();
        let mut seen_ids = HashSet::new();

        for node in nodes {
            if node.id.is_empty() {
                errors.push(ValidationError { node_id: node.id.clone(), message: "node has no id".to_string() });
                continue;
            }
            if !seen_ids.insert(node.id.as_str()) {
                errors.push(ValidationError { node_id: node.id.clone(), message: "duplicate node id".to_string() });
            }
            if node.resolve_type().is_none() {
                errors.push(ValidationError { node_id: node.id.clone(), message: "node type could not be resolved".to_string() });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(errors))
        }
    }

    /// Step 2: a handler is registered for each resolved type.
    fn check_handlers_exist(&self, nodes: &[NodeDefinition]) -> Result<(), EngineError> {
        let mut errors = Vec::new();
        for node in nodes {
            let Some(block_type) = node.resolve_type() else { continue };
            if !self.registry.contains(block_type) {
                errors.push(ValidationError {
                    node_id: node.id.clone(),
                    message: format!("no handler registered for type '{block_type}'"),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(errors))
        }
    }

    /// Step 3: each handler's optional `validate_config` returns no errors.
    fn check_handler_configs(&self, nodes: &[NodeDefinition], user_id: Uuid) -> Result<(), EngineError> {
        let mut errors = Vec::new();
        for node in nodes {
            let Some(block_type) = node.resolve_type() else { continue };
            let Some(handler) = self.registry.get(block_type) else { continue };
            for message in handler.validate_config(&node.config, user_id) {
                errors.push(ValidationError { node_id: node.id.clone(), message });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(errors))
        }
    }

    /// Step 4: depth-first cycle detection with a recursion-stack set.
    fn check_acyclic(&self, nodes: &[NodeDefinition], edges: &[Edge]) -> Result<(), EngineError> {
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for node in nodes {
            adjacency.entry(node.id.as_str()).or_default();
        }
        for edge in edges {
            adjacency.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut on_stack: HashSet<&str> = HashSet::new();

        for node in nodes {
            if !visited.contains(node.id.as_str()) {
                self.dfs_visit(node.id.as_str(), &adjacency, &mut visited, &mut on_stack)?;
            }
        }
        Ok(())
    }

    fn dfs_visit<'n>(
        &self,
        node_id: &'n str,
        adjacency: &HashMap<&'n str, Vec<&'n str>>,
        visited: &mut HashSet<&'n str>,
        on_stack: &mut HashSet<&'n str>,
    ) -> Result<(), EngineError> {
        visited.insert(node_id);
        on_stack.insert(node_id);

        if let Some(neighbours) = adjacency.get(node_id) {
            for &neighbour in neighbours {
                if on_stack.contains(neighbour) {
                    return Err(EngineError::CycleError(neighbour.to_string()));
                }
                if !visited.contains(neighbour) {
                    self.dfs_visit(neighbour, adjacency, visited, on_stack)?;
                }
            }
        }

        on_stack.remove(node_id);
        Ok(())
    }

    /// Step 5: in a graph of more than one node, every node has at least
    /// one incident edge.
    fn check_no_orphans(&self, nodes: &[NodeDefinition], edges: &[Edge]) -> Result<(), EngineError> {
        if nodes.len() <= 1 {
            return Ok(());
        }
        let mut has_edge: HashSet<&str> = HashSet::new();
        for edge in edges {
            has_edge.insert(edge.from.as_str());
            has_edge.insert(edge.to.as_str());
        }
        for node in nodes {
            if !has_edge.contains(node.id.as_str()) {
                return Err(EngineError::OrphanError(node.id.clone()));
            }
        }
        Ok(())
    }

    /// Step 6: terminal nodes (no outgoing edge) must carry an allowed
    /// category.
    fn check_terminal_categories(&self, nodes: &[NodeDefinition], edges: &[Edge]) -> Result<(), EngineError> {
        let has_outgoing: HashSet<&str> = edges.iter().map(|e| e.from.as_str()).collect();
        for node in nodes {
            if has_outgoing.contains(node.id.as_str()) {
                continue;
            }
            let category = node_category(node);
            if !self.config.terminal_allowed_categories.contains(&category) {
                return Err(EngineError::TerminalCategoryError { node_id: node.id.clone(), category });
            }
        }
        Ok(())
    }

    /// Step 7: non-fatal edge type-compatibility warnings.
    fn check_type_compatibility(&self, nodes: &[NodeDefinition], edges: &[Edge]) -> Vec<TypeWarning> {
        let by_id: HashMap<&str, &NodeDefinition> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let mut warnings = Vec::new();

        for edge in edges {
            let (Some(&from), Some(&to)) = (by_id.get(edge.from.as_str()), by_id.get(edge.to.as_str())) else {
                continue;
            };
            let (Some(out_schema), Some(in_schema)) = (&from.output_schema, &to.input_schema) else {
                continue;
            };
            for (field, out_type) in &out_schema.fields {
                if let Some(in_type) = in_schema.fields.get(field) {
                    if !out_type.compatible_with(in_type) {
                        warnings.push(TypeWarning {
                            from: edge.from.clone(),
                            to: edge.to.clone(),
                            field: field.clone(),
                            message: format!(
                                "'{}' produces {field}: {out_type:?} but '{}' expects {field}: {in_type:?} — consider a transform node",
                                edge.from, edge.to
                            ),
                        });
                    }
                }
            }
        }
        warnings
    }
}

/// A node's category, read from `data.category`/`config.category`
/// (case-normalized), defaulting to `ACTION`.
fn node_category(node: &NodeDefinition) -> String {
    let raw = node
        .data
        .get("category")
        .and_then(|v| v.as_str())
        .or_else(|| node.config.get("category").and_then(|v| v.as_str()))
        .unwrap_or("ACTION");
    normalize(raw).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodes::mock::MockNode;
    use serde_json::json;
    use std::sync::Arc;

    fn node(id: &str, node_type: &str) -> NodeDefinition {
        NodeDefinition {
            id: id.to_string(),
            node_type: node_type.to_string(),
            data: json!({}),
            config: json!({}),
            input_schema: None,
            output_schema: None,
        }
    }

    fn registry_with_mock() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register("mock", Arc::new(MockNode::returning("mock", json!({}))));
        registry
    }

    #[test]
    fn missing_handler_is_rejected() {
        let registry = NodeRegistry::new();
        let validator = GraphValidator::new(&registry, GraphValidatorConfig::default());
        let workflow = Workflow::new("wf", crate::Trigger::Manual, vec![node("a", "unregistered")], vec![]);
        assert!(matches!(validator.validate(&workflow, Uuid::new_v4()), Err(EngineError::Validation(_))));
    }

    #[test]
    fn b3_single_node_validates_cleanly() {
        let registry = registry_with_mock();
        let validator = GraphValidator::new(&registry, GraphValidatorConfig::default());
        let workflow = Workflow::new("wf", crate::Trigger::Manual, vec![node("a", "mock")], vec![]);
        assert!(validator.validate(&workflow, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn cycle_is_rejected() {
        let registry = registry_with_mock();
        let validator = GraphValidator::new(&registry, GraphValidatorConfig::default());
        let workflow = Workflow::new(
            "wf",
            crate::Trigger::Manual,
            vec![node("a", "mock"), node("b", "mock")],
            vec![Edge { from: "a".into(), to: "b".into() }, Edge { from: "b".into(), to: "a".into() }],
        );
        assert!(matches!(validator.validate(&workflow, Uuid::new_v4()), Err(EngineError::CycleError(_))));
    }

    #[test]
    fn orphan_in_multi_node_graph_is_rejected() {
        let registry = registry_with_mock();
        let validator = GraphValidator::new(&registry, GraphValidatorConfig::default());
        let workflow = Workflow::new("wf", crate::Trigger::Manual, vec![node("a", "mock"), node("b", "mock")], vec![]);
        assert!(matches!(validator.validate(&workflow, Uuid::new_v4()), Err(EngineError::OrphanError(_))));
    }

    #[test]
    fn terminal_node_with_disallowed_category_is_rejected() {
        let registry = registry_with_mock();
        let validator = GraphValidator::new(&registry, GraphValidatorConfig::default());
        let mut n = node("a", "mock");
        n.data = json!({ "category": "LOGIC" });
        let workflow = Workflow::new("wf", crate::Trigger::Manual, vec![n], vec![]);
        assert!(matches!(
            validator.validate(&workflow, Uuid::new_v4()),
            Err(EngineError::TerminalCategoryError { .. })
        ));
    }
}
