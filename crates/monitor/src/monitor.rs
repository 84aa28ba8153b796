//! `ExecutionMonitor` (C10) — an in-memory progress view with subscriber
//! rooms, built on a typed `tokio::sync::broadcast` channel per execution
//! rather than a callback-shaped pubsub interface (Design Note).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::events::MonitorEvent;

const CHANNEL_CAPACITY: usize = 256;
const EVICTION_DELAY: Duration = Duration::from_secs(5 * 60);

/// The latest known state for one execution — what a subscriber joining
/// mid-run, or a reconnecting client, reads before following the channel.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ExecutionSnapshot {
    pub status: Option<String>,
    pub completed_nodes: usize,
    pub total_nodes: usize,
    pub outputs: Option<Value>,
    pub error: Option<String>,
}

struct Room {
    sender: broadcast::Sender<MonitorEvent>,
    snapshot: ExecutionSnapshot,
}

#[derive(Clone)]
pub struct ExecutionMonitor {
    rooms: Arc<Mutex<HashMap<Uuid, Room>>>,
}

impl ExecutionMonitor {
    pub fn new() -> Self {
        Self { rooms: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Subscribe to live events for an execution, creating its room if this
    /// is the first subscriber or publisher to touch it.
    pub fn subscribe(&self, execution_id: Uuid) -> broadcast::Receiver<MonitorEvent> {
        let mut rooms = self.rooms.lock().unwrap();
        rooms
            .entry(execution_id)
            .or_insert_with(|| Room { sender: broadcast::channel(CHANNEL_CAPACITY).0, snapshot: ExecutionSnapshot::default() })
            .sender
            .subscribe()
    }

    pub fn snapshot(&self, execution_id: Uuid) -> Option<ExecutionSnapshot> {
        self.rooms.lock().unwrap().get(&execution_id).map(|room| room.snapshot.clone())
    }

    /// Publish an event: update the snapshot, fan it out to subscribers
    /// (a lagging/absent subscriber is not an error — delivery is opaque
    /// per the external interface contract), and schedule eviction if the
    /// event is terminal.
    pub fn publish(&self, event: MonitorEvent) {
        let execution_id = event.execution_id();
        let is_terminal = event.is_terminal();

        {
            let mut rooms = self.rooms.lock().unwrap();
            let room = rooms
                .entry(execution_id)
                .or_insert_with(|| Room { sender: broadcast::channel(CHANNEL_CAPACITY).0, snapshot: ExecutionSnapshot::default() });
            apply_to_snapshot(&mut room.snapshot, &event);
            let _ = room.sender.send(event);
        }

        if is_terminal {
            self.schedule_eviction(execution_id);
        }
    }

    fn schedule_eviction(&self, execution_id: Uuid) {
        let rooms = Arc::clone(&self.rooms);
        tokio::spawn(async move {
            tokio::time::sleep(EVICTION_DELAY).await;
            rooms.lock().unwrap().remove(&execution_id);
        });
    }
}

impl Default for ExecutionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_to_snapshot(snapshot: &mut ExecutionSnapshot, event: &MonitorEvent) {
    match event {
        MonitorEvent::ExecutionStarted { total_nodes, .. } => {
            snapshot.status = Some("running".to_string());
            snapshot.total_nodes = *total_nodes;
        }
        MonitorEvent::NodeExecutionUpdate { status, .. } if status == "completed" => {
            snapshot.completed_nodes += 1;
        }
        MonitorEvent::ExecutionCompleted { outputs, .. } => {
            snapshot.status = Some("completed".to_string());
            snapshot.outputs = Some(outputs.clone());
        }
        MonitorEvent::ExecutionFailed { error, .. } => {
            snapshot.status = Some("failed".to_string());
            snapshot.error = Some(error.clone());
        }
        MonitorEvent::ExecutionPaused { .. } => {
            snapshot.status = Some("paused".to_string());
        }
        MonitorEvent::ExecutionResumed { .. } => {
            snapshot.status = Some("running".to_string());
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn terminal_event_evicts_snapshot_after_five_minutes() {
        let monitor = ExecutionMonitor::new();
        let execution_id = Uuid::new_v4();
        monitor.publish(MonitorEvent::ExecutionCompleted { execution_id, outputs: Value::Null });

        assert!(monitor.snapshot(execution_id).is_some());

        tokio::time::advance(EVICTION_DELAY + Duration::from_secs(1)).await;
        tokio::task::yield_now().await;

        assert!(monitor.snapshot(execution_id).is_none());
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let monitor = ExecutionMonitor::new();
        let execution_id = Uuid::new_v4();
        let mut rx = monitor.subscribe(execution_id);

        monitor.publish(MonitorEvent::ExecutionStarted { execution_id, workflow_id: Uuid::new_v4(), total_nodes: 3 });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, MonitorEvent::ExecutionStarted { .. }));
    }
}
