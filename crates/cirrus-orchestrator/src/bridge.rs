//! Status bridge.
//!
//! Consumer-side correlation of status events: a background task folds the
//! status stream into the latest aggregate state per request id, which
//! callers read to surface progress. A missing `total_steps` is
//! indeterminate progress, never zero or complete.

use chrono::{DateTime, Utc};
use cirrus_bus::{MessageBus, Phase, ResourceDelta, StatusEvent};
use cirrus_core::Slot;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Latest known state of one request.
#[derive(Debug, Clone)]
pub struct RequestState {
    pub phase: Phase,
    pub step: Option<u32>,
    pub total_steps: Option<u32>,
    pub message: String,
    /// Most recent delta per slot.
    pub resources: HashMap<Slot, ResourceDelta>,
    pub updated_at: DateTime<Utc>,
}

impl RequestState {
    fn from_event(event: &StatusEvent) -> Self {
        Self {
            phase: event.phase,
            step: event.step,
            total_steps: event.total_steps,
            message: event.message.clone(),
            resources: HashMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Fraction complete, or `None` when progress is indeterminate.
    pub fn progress_ratio(&self) -> Option<f64> {
        match (self.step, self.total_steps) {
            (Some(step), Some(total)) if total > 0 => Some(f64::from(step) / f64::from(total)),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}

/// Background consumer of the status channel.
pub struct StatusBridge {
    state: Arc<RwLock<HashMap<Uuid, RequestState>>>,
    task: JoinHandle<()>,
}

impl StatusBridge {
    /// Subscribe to the bus and start folding events. Events published
    /// before this call are not seen; the bus does not replay.
    pub fn spawn(bus: &MessageBus) -> Self {
        let mut stream = bus.subscribe_status();
        let state: Arc<RwLock<HashMap<Uuid, RequestState>>> = Arc::new(RwLock::new(HashMap::new()));

        let fold_state = state.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = stream.recv().await {
                let mut map = fold_state.write().await;
                let entry = map
                    .entry(event.request_id)
                    .or_insert_with(|| RequestState::from_event(&event));
                entry.phase = event.phase;
                entry.message = event.message.clone();
                if event.step.is_some() {
                    entry.step = event.step;
                }
                if event.total_steps.is_some() {
                    entry.total_steps = event.total_steps;
                }
                for delta in event.resource_deltas {
                    entry.resources.insert(delta.slot, delta);
                }
                entry.updated_at = Utc::now();
            }
        });

        Self { state, task }
    }

    /// Current aggregate state for a request.
    pub async fn aggregate(&self, request_id: Uuid) -> Option<RequestState> {
        self.state.read().await.get(&request_id).cloned()
    }

    /// Wait until the request reaches a terminal phase, or the deadline
    /// passes. Returns the last state seen either way.
    pub async fn wait_for_terminal(
        &self,
        request_id: Uuid,
        deadline: Duration,
    ) -> Option<RequestState> {
        let poll = Duration::from_millis(25);
        let started = tokio::time::Instant::now();
        loop {
            if let Some(state) = self.aggregate(request_id).await {
                if state.is_terminal() {
                    return Some(state);
                }
                if started.elapsed() >= deadline {
                    return Some(state);
                }
            } else if started.elapsed() >= deadline {
                return None;
            }
            tokio::time::sleep(poll).await;
        }
    }
}

impl Drop for StatusBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_core::ResourceStatus;

    #[tokio::test]
    async fn test_bridge_accumulates_latest_state() {
        let bus = MessageBus::new();
        let bridge = StatusBridge::spawn(&bus);
        let id = Uuid::new_v4();

        bus.publish_status(StatusEvent::started(id, "deploy accepted"));
        bus.publish_status(
            StatusEvent::progress(id, "created network vpc-1")
                .with_step(1, 8)
                .with_delta(ResourceDelta {
                    slot: Slot::Vpc,
                    provider_id: Some("vpc-1".into()),
                    status: ResourceStatus::Created,
                }),
        );
        bus.publish_status(StatusEvent::completed(id, "done"));

        let state = bridge
            .wait_for_terminal(id, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(state.phase, Phase::Completed);
        assert_eq!(state.step, Some(1));
        assert_eq!(state.resources[&Slot::Vpc].provider_id.as_deref(), Some("vpc-1"));
    }

    #[tokio::test]
    async fn test_missing_total_steps_is_indeterminate() {
        let bus = MessageBus::new();
        let bridge = StatusBridge::spawn(&bus);
        let id = Uuid::new_v4();

        let mut event = StatusEvent::progress(id, "scanning");
        event.step = Some(3);
        bus.publish_status(event);

        // Give the fold task a moment.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let state = bridge.aggregate(id).await.unwrap();
        assert_eq!(state.progress_ratio(), None);
    }

    #[tokio::test]
    async fn test_unknown_request_is_none() {
        let bus = MessageBus::new();
        let bridge = StatusBridge::spawn(&bus);
        assert!(bridge.aggregate(Uuid::new_v4()).await.is_none());
    }
}
