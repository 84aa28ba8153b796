//! End-to-end engine tests that exercise validation, scheduling, and
//! per-node execution together without a database — `WorkflowExecutor`
//! itself talks to Postgres directly via `sqlx`, so its own tests need a
//! live instance and are out of scope here.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::dag::topological_sort;
use crate::models::{Edge, NodeDefinition, Trigger, Workflow};
use crate::node_executor::NodeExecutor;
use crate::validate::{GraphValidator, GraphValidatorConfig};
use crate::config::ExecutorConfig;
use breaker::{InMemoryBreakerStore, MultiLevelBreaker};
use nodes::mock::MockNode;
use nodes::traits::NullLogger;
use nodes::NodeRegistry;

fn node(id: &str, node_type: &str) -> NodeDefinition {
    NodeDefinition { id: id.to_string(), node_type: node_type.to_string(), data: json!({}), config: json!({}), input_schema: None, output_schema: None }
}

fn linear_workflow(ids: &[&str]) -> Workflow {
    let nodes: Vec<NodeDefinition> = ids.iter().map(|id| node(id, "mock")).collect();
    let edges: Vec<Edge> = ids.windows(2).map(|w| Edge { from: w[0].into(), to: w[1].into() }).collect();
    Workflow::new("test-linear", Trigger::Manual, nodes, edges)
}

#[test]
fn linear_workflow_validates_and_sorts_correctly() {
    let mut registry = NodeRegistry::new();
    registry.register("mock", Arc::new(MockNode::returning("mock", json!({}))));
    let workflow = linear_workflow(&["step_a", "step_b", "step_c"]);

    let validator = GraphValidator::new(&registry, GraphValidatorConfig::default());
    assert!(validator.validate(&workflow, workflow.user_id).is_ok());

    let schedule = topological_sort(&workflow.nodes, &workflow.edges).expect("should be a valid DAG");
    assert_eq!(schedule.order, vec!["step_a", "step_b", "step_c"]);
}

#[test]
fn cycle_in_linear_workflow_is_detected() {
    let mut workflow = linear_workflow(&["x", "y", "z"]);
    workflow.edges.push(Edge { from: "z".into(), to: "x".into() });
    assert!(topological_sort(&workflow.nodes, &workflow.edges).is_err());
}

#[test]
fn missing_node_reference_leaves_target_orphaned_from_the_sort() {
    // 'b' is referenced by an edge but never declared as a node — the
    // sort only orders declared nodes, so this surfaces as a cycle/orphan
    // mismatch rather than a panic.
    let workflow = Workflow::new(
        "bad",
        Trigger::Manual,
        vec![node("a", "mock")],
        vec![Edge { from: "a".into(), to: "b".into() }],
    );
    let schedule = topological_sort(&workflow.nodes, &workflow.edges).unwrap();
    assert_eq!(schedule.order, vec!["a"]);
}

fn executor(registry: NodeRegistry) -> NodeExecutor {
    let store = Arc::new(InMemoryBreakerStore::default());
    NodeExecutor::new(Arc::new(registry), Arc::new(MultiLevelBreaker::new(store)), ExecutorConfig::default())
}

/// Runs a three-node pipeline manually (mirroring what `WorkflowExecutor`
/// does internally) and asserts each dependent only sees its direct
/// parent's output via `relevantOutputs`.
#[tokio::test]
async fn three_node_pipeline_routes_relevant_outputs() {
    let workflow = linear_workflow(&["node_a", "node_b", "node_c"]);
    let schedule = topological_sort(&workflow.nodes, &workflow.edges).expect("valid dag");
    let node_by_id: HashMap<&str, &NodeDefinition> = workflow.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut registry = NodeRegistry::new();
    registry.register("mock", Arc::new(MockNode::returning("mock", json!({ "step": 1 }))));
    let exec = executor(registry);

    let execution_id = Uuid::new_v4();
    let mut outputs: HashMap<String, Value> = HashMap::new();

    for node_id in &schedule.order {
        let relevant_outputs: HashMap<String, Value> = schedule
            .dependencies
            .get(node_id)
            .into_iter()
            .flatten()
            .filter_map(|parent| outputs.get(parent).map(|v| (parent.clone(), v.clone())))
            .collect();

        let output = exec
            .execute(node_by_id[node_id.as_str()], execution_id, workflow.id, workflow.user_id, relevant_outputs, Value::Null, Arc::new(NullLogger))
            .await
            .expect("node should succeed");
        outputs.insert(node_id.clone(), output);
    }

    assert_eq!(schedule.order, vec!["node_a", "node_b", "node_c"]);
    assert_eq!(outputs["node_b"]["node"], "mock");
}

#[tokio::test]
async fn fatal_node_error_stops_the_pipeline_without_retry() {
    let mut workflow = linear_workflow(&["ok", "boom", "never"]);
    workflow.nodes[1].node_type = "boom".to_string();
    workflow.nodes[2].node_type = "never".to_string();
    let schedule = topological_sort(&workflow.nodes, &workflow.edges).expect("valid dag");
    let node_by_id: HashMap<&str, &NodeDefinition> = workflow.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut registry = NodeRegistry::new();
    registry.register("ok", Arc::new(MockNode::returning("ok", json!({ "ok": true }))));
    registry.register("boom", Arc::new(MockNode::failing_fatal("boom", "something broke irreparably")));
    registry.register("never", Arc::new(MockNode::returning("never", json!({ "should": "not run" }))));

    let exec = executor(registry);
    let execution_id = Uuid::new_v4();
    let mut hit_fatal = false;

    for node_id in &schedule.order {
        let result = exec
            .execute(node_by_id[node_id.as_str()], execution_id, workflow.id, workflow.user_id, HashMap::new(), Value::Null, Arc::new(NullLogger))
            .await;
        if let Err(err) = result {
            assert_eq!(node_id, "boom");
            assert!(matches!(err, crate::EngineError::HandlerError { .. }));
            hit_fatal = true;
            break;
        }
    }

    assert!(hit_fatal, "expected a fatal error at 'boom'");
}
