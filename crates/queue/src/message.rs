//! `QueueMessage` — the broker envelope (spec §3): `executionId`,
//! `workflowId`, `userId`, `payload`, `retryCount`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    pub execution_id: Uuid,
    pub workflow_id: Uuid,
    pub user_id: Uuid,
    /// Arbitrary trigger payload; carries `resumeFromNodeId`/`resumeData`
    /// for resume messages (spec §4.5 "Resume semantics", §4.6 step 4).
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub retry_count: u32,
}

impl QueueMessage {
    pub fn new(execution_id: Uuid, workflow_id: Uuid, user_id: Uuid, payload: Value) -> Self {
        Self { execution_id, workflow_id, user_id, payload, retry_count: 0 }
    }

    pub fn is_resume(&self) -> bool {
        self.payload.get("resumeFromNodeId").and_then(Value::as_str).is_some()
    }

    pub fn resume_from_node_id(&self) -> Option<String> {
        self.payload.get("resumeFromNodeId").and_then(Value::as_str).map(str::to_string)
    }

    pub fn resume_data(&self) -> std::collections::HashMap<String, Value> {
        self.payload
            .get("resumeData")
            .and_then(|v| v.as_object())
            .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    pub fn with_retry_count(&self, retry_count: u32) -> Self {
        Self { retry_count, ..self.clone() }
    }
}
