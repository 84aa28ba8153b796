//! `HttpStubNode` — a test double for HTTP-shaped nodes.
//!
//! Real HTTP block handlers live outside this crate's scope (spec.md §1
//! non-goal: block implementations are modeled, not built). This stub
//! stands in for them in integration tests that exercise the engine's
//! retry/timeout/breaker plumbing against something shaped like a network
//! call, without pulling in an HTTP client.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{traits::ExecutionContext, ExecutableNode, NodeError};

/// Behaviour injected into `HttpStubNode` at construction time.
pub enum HttpStubBehaviour {
    /// Respond as if the given status code came back.
    Status(u16),
    /// Fail `attempts_before_success` times with `NodeError::Retryable`
    /// before responding with `Status(200)`, modeling a flaky upstream.
    FlakyThenOk { attempts_before_success: usize },
}

/// A node that pretends to make an HTTP request and returns a
/// response-shaped JSON value (`{ "status", "body" }`).
pub struct HttpStubNode {
    behaviour: HttpStubBehaviour,
    attempts: AtomicUsize,
}

impl HttpStubNode {
    pub fn status(code: u16) -> Self {
        Self { behaviour: HttpStubBehaviour::Status(code), attempts: AtomicUsize::new(0) }
    }

    pub fn flaky_then_ok(attempts_before_success: usize) -> Self {
        Self { behaviour: HttpStubBehaviour::FlakyThenOk { attempts_before_success }, attempts: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl ExecutableNode for HttpStubNode {
    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        match &self.behaviour {
            HttpStubBehaviour::Status(code) if (500..600).contains(code) => {
                Err(NodeError::Retryable(format!("HTTP {code}: Internal Server Error")))
            }
            HttpStubBehaviour::Status(code) if (400..500).contains(code) => Err(NodeError::Fatal(format!("HTTP {code}"))),
            HttpStubBehaviour::Status(code) => Ok(json!({ "status": code, "body": input })),
            HttpStubBehaviour::FlakyThenOk { attempts_before_success } => {
                let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
                if attempt < *attempts_before_success {
                    Err(NodeError::Retryable("fetch failed: connection reset".to_string()))
                } else {
                    Ok(json!({ "status": 200, "body": input }))
                }
            }
        }
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
    async fn server_error_status_is_retryable() {
        let node = HttpStubNode::status(503);
        let err = node.execute(json!({}), &ctx()).await.unwrap_err();
        assert!(matches!(err, NodeError::Retryable(_)));
    }

    #[tokio::test]
    async fn client_error_status_is_fatal() {
        let node = HttpStubNode::status(404);
        let err = node.execute(json!({}), &ctx()).await.unwrap_err();
        assert!(matches!(err, NodeError::Fatal(_)));
    }

    #[tokio::test]
    async fn flaky_then_ok_succeeds_after_the_given_attempt_count() {
        let node = HttpStubNode::flaky_then_ok(2);
        assert!(node.execute(json!({}), &ctx()).await.is_err());
        assert!(node.execute(json!({}), &ctx()).await.is_err());
        assert!(node.execute(json!({}), &ctx()).await.is_ok());
    }
}
