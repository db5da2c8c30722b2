//! Message types flowing over the bus.

use crate::error::{BusError, Result};
use cirrus_core::{PowerAction, ResourceKind, ResourceStatus, Slot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A command published to the command channel. Immutable once published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub request_id: Uuid,

    #[serde(flatten)]
    pub command: Command,
}

impl CommandEnvelope {
    pub fn new(command: Command) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            command,
        }
    }
}

/// The closed set of intents the orchestration core accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    Deploy {
        project_slug: String,
    },
    Terminate {
        project_slug: String,
        /// Explicit resource identifiers. Empty means "this project's
        /// tracked resources".
        #[serde(default)]
        resources: Vec<ResourceRef>,
    },
    Power {
        project_slug: String,
        action: PowerAction,
    },
    Scan {
        #[serde(default)]
        regions: Vec<String>,
    },
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Deploy { .. } => "deploy",
            Command::Terminate { .. } => "terminate",
            Command::Power { .. } => "power",
            Command::Scan { .. } => "scan",
        }
    }

    /// Project the command is scoped to, when it has one. Commands sharing a
    /// project are serialized against each other by the listener pool.
    pub fn project_slug(&self) -> Option<&str> {
        match self {
            Command::Deploy { project_slug }
            | Command::Terminate { project_slug, .. }
            | Command::Power { project_slug, .. } => Some(project_slug),
            Command::Scan { .. } => None,
        }
    }
}

impl CommandEnvelope {
    /// Ingestion boundary for external producers. An unknown `kind` is
    /// rejected here and never reaches the dispatch enum; the caller is
    /// expected to publish a no-op `failed` status for it.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| BusError::MalformedCommand(e.to_string()))
    }
}

/// Reference to one provider resource, for explicit terminate requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
}

/// Progress phase of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Started,
    Progress,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Started => "started",
            Phase::Progress => "progress",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Status change of one resource slot, carried inside a status event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDelta {
    pub slot: Slot,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    pub status: ResourceStatus,
}

/// A progress report published to the status channel.
///
/// `total_steps` absent means indeterminate progress; consumers must not
/// treat it as zero or complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub request_id: Uuid,
    pub phase: Phase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u32>,

    pub message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_deltas: Vec<ResourceDelta>,
}

impl StatusEvent {
    pub fn started(request_id: Uuid, message: impl Into<String>) -> Self {
        Self::new(request_id, Phase::Started, message)
    }

    pub fn progress(request_id: Uuid, message: impl Into<String>) -> Self {
        Self::new(request_id, Phase::Progress, message)
    }

    pub fn completed(request_id: Uuid, message: impl Into<String>) -> Self {
        Self::new(request_id, Phase::Completed, message)
    }

    pub fn failed(request_id: Uuid, message: impl Into<String>) -> Self {
        Self::new(request_id, Phase::Failed, message)
    }

    fn new(request_id: Uuid, phase: Phase, message: impl Into<String>) -> Self {
        Self {
            request_id,
            phase,
            step: None,
            total_steps: None,
            message: message.into(),
            resource_deltas: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: u32, total_steps: u32) -> Self {
        self.step = Some(step);
        self.total_steps = Some(total_steps);
        self
    }

    pub fn with_delta(mut self, delta: ResourceDelta) -> Self {
        self.resource_deltas.push(delta);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let envelope = CommandEnvelope::new(Command::Deploy {
            project_slug: "demo-app".into(),
        });
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"kind\":\"deploy\""));
        assert!(json.contains("\"project_slug\":\"demo-app\""));

        let parsed = CommandEnvelope::from_json(&json).unwrap();
        assert_eq!(parsed.request_id, envelope.request_id);
        assert_eq!(parsed.command.kind(), "deploy");
    }

    #[test]
    fn test_unknown_kind_rejected_at_ingestion() {
        let raw = r#"{"request_id":"8c1f3e60-1f6a-4f5e-9b3c-2e4d5a6b7c8d","kind":"reboot"}"#;
        assert!(matches!(
            CommandEnvelope::from_json(raw),
            Err(BusError::MalformedCommand(_))
        ));
    }

    #[test]
    fn test_terminate_defaults_to_tracked_resources() {
        let raw = r#"{"request_id":"8c1f3e60-1f6a-4f5e-9b3c-2e4d5a6b7c8d","kind":"terminate","project_slug":"demo-app"}"#;
        let envelope = CommandEnvelope::from_json(raw).unwrap();
        match envelope.command {
            Command::Terminate { resources, .. } => assert!(resources.is_empty()),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_absent_total_steps_stays_absent() {
        let event = StatusEvent::progress(Uuid::new_v4(), "scanning");
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("total_steps"));
        let parsed: StatusEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_steps, None);
    }
}
