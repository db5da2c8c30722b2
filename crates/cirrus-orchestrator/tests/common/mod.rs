use cirrus_bus::{Command, CommandEnvelope, MessageBus, StatusEvent, StatusStream};
use cirrus_cloud::{MockProvider, ResourceTracker, RetryConfig};
use cirrus_core::{
    Blueprint, DatabaseSection, IngressRule, KeyPairSection, RoleSection, StorageSection,
};
use cirrus_orchestrator::{ListenerPool, OrchestratorContext};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

pub struct Harness {
    #[allow(dead_code)]
    pub dir: TempDir,
    pub bus: MessageBus,
    pub ctx: Arc<OrchestratorContext>,
    pub provider: Arc<MockProvider>,
    #[allow(dead_code)]
    pub pool: ListenerPool,
}

impl Harness {
    #[allow(dead_code)]
    pub async fn new() -> Self {
        Self::with_provider(MockProvider::new("us-east-1")).await
    }

    pub async fn with_provider(provider: MockProvider) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = cirrus_core::BlueprintStore::new(dir.path().join("projects"));
        let tracker = ResourceTracker::load(dir.path().join("resources.json"))
            .await
            .unwrap();
        let bus = MessageBus::new();
        let provider = Arc::new(provider);

        let ctx = Arc::new(
            OrchestratorContext::new(
                store,
                tracker,
                provider.clone(),
                bus.clone(),
                dir.path().join("cache"),
            )
            .with_retry(RetryConfig {
                max_attempts: 3,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(4),
                backoff_multiplier: 2.0,
            })
            .with_step_timeout(Duration::from_secs(5)),
        );
        let pool = ListenerPool::spawn(ctx.clone(), 4);

        Self {
            dir,
            bus,
            ctx,
            provider,
            pool,
        }
    }

    /// Publish a command and collect this request's events through the
    /// terminal one.
    pub async fn run_command(&self, command: Command) -> (Uuid, Vec<StatusEvent>) {
        let mut stream = self.bus.subscribe_status();
        let envelope = CommandEnvelope::new(command);
        let request_id = envelope.request_id;
        self.bus.publish_command(envelope).unwrap();
        let events = collect_until_terminal(&mut stream, request_id).await;
        (request_id, events)
    }
}

pub async fn collect_until_terminal(
    stream: &mut StatusStream,
    request_id: Uuid,
) -> Vec<StatusEvent> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        match tokio::time::timeout_at(deadline, stream.recv()).await {
            Ok(Some(event)) => {
                if event.request_id != request_id {
                    continue;
                }
                let terminal = event.phase.is_terminal();
                events.push(event);
                if terminal {
                    break;
                }
            }
            Ok(None) => break,
            Err(_) => panic!("timed out waiting for terminal event"),
        }
    }
    events
}

/// Step values must be strictly increasing and contiguous from 1.
#[allow(dead_code)]
pub fn assert_contiguous_steps(events: &[StatusEvent]) {
    let steps: Vec<u32> = events.iter().filter_map(|e| e.step).collect();
    for (index, step) in steps.iter().enumerate() {
        assert_eq!(
            *step,
            index as u32 + 1,
            "step sequence not contiguous: {:?}",
            steps
        );
    }
}

/// Network + compute only: no key pair, role, database or storage.
#[allow(dead_code)]
pub fn minimal_blueprint(name: &str) -> Blueprint {
    let mut blueprint = Blueprint::new(name, "us-east-1", "t3.micro");
    blueprint.network.ingress.push(IngressRule {
        protocol: "tcp".into(),
        port: 22,
        cidr: "0.0.0.0/0".into(),
        description: Some("ssh".into()),
    });
    blueprint
}

/// Every optional section populated.
#[allow(dead_code)]
pub fn full_blueprint(name: &str) -> Blueprint {
    let mut blueprint = minimal_blueprint(name);
    blueprint.security.key_pair = Some(KeyPairSection {
        name: format!("{}-key", blueprint.slug()),
        public_key: Some("ssh-ed25519 AAAA test".into()),
        key_id: None,
        status: Default::default(),
    });
    blueprint.security.role = Some(RoleSection {
        name: format!("{}-role", blueprint.slug()),
        role_id: None,
        instance_profile_id: None,
        status: Default::default(),
    });
    blueprint.data.database = Some(DatabaseSection::new("postgres", "db.t3.micro"));
    blueprint.data.storage = Some(StorageSection {
        bucket: format!("{}-assets", blueprint.slug()),
        status: Default::default(),
    });
    blueprint
}
