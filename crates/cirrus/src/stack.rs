//! Wires the in-process orchestration stack together.

use anyhow::Context;
use cirrus_bus::{Command, CommandEnvelope, MessageBus, Phase};
use cirrus_cloud::{CloudProvider, Credentials, ResourceTracker, RetryConfig};
use cirrus_cloud_aws::AwsProvider;
use cirrus_config::Settings;
use cirrus_core::BlueprintStore;
use cirrus_orchestrator::{ListenerPool, OrchestratorContext, StatusBridge};
use std::sync::Arc;
use std::time::Duration;

pub struct Stack {
    pub settings: Settings,
    pub bus: MessageBus,
    pub ctx: Arc<OrchestratorContext>,
    #[allow(dead_code)]
    pool: ListenerPool,
    #[allow(dead_code)]
    bridge: StatusBridge,
}

/// Build settings, store, tracker, provider, bus, listener pool and status
/// bridge for one CLI invocation.
pub async fn build() -> anyhow::Result<Stack> {
    let settings = Settings::load().context("cannot load settings")?;

    let store = BlueprintStore::new(cirrus_config::blueprints_dir()?);
    let tracker = ResourceTracker::load(cirrus_config::tracker_path()?)
        .await
        .context("cannot load resource tracker")?;

    let credentials = match &settings.provider.profile {
        Some(profile) => Credentials::profile(profile),
        None => AwsProvider::credentials_from_env(),
    };
    let provider: Arc<dyn CloudProvider> =
        Arc::new(AwsProvider::new(settings.default_region.clone(), credentials));

    let bus = MessageBus::new();
    let retry = RetryConfig {
        max_attempts: settings.retry.max_attempts,
        initial_delay: Duration::from_millis(settings.retry.initial_delay_ms),
        max_delay: Duration::from_millis(settings.retry.max_delay_ms),
        backoff_multiplier: settings.retry.backoff_multiplier,
    };

    let ctx = Arc::new(
        OrchestratorContext::new(
            store,
            tracker,
            provider,
            bus.clone(),
            cirrus_config::cache_dir()?,
        )
        .with_retry(retry)
        .with_step_timeout(settings.step_timeout())
        .with_scan_regions(vec![settings.default_region.clone()]),
    );

    let bridge = StatusBridge::spawn(&bus);
    let pool = ListenerPool::spawn(ctx.clone(), settings.workers);

    Ok(Stack {
        settings,
        bus,
        ctx,
        pool,
        bridge,
    })
}

impl Stack {
    /// Verify provider credentials before doing anything mutating.
    pub async fn require_auth(&self) -> anyhow::Result<()> {
        let status = self
            .ctx
            .provider
            .check_auth()
            .await
            .context("cannot check provider authentication")?;
        if !status.authenticated {
            anyhow::bail!(
                "provider authentication failed: {}",
                status.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        if let Some(account) = status.account_info {
            tracing::info!("authenticated as {}", account);
        }
        Ok(())
    }

    /// Publish a command and stream its status events to the terminal until
    /// the request reaches a terminal phase.
    pub async fn run_to_completion(&self, command: Command) -> anyhow::Result<()> {
        self.run_envelope(CommandEnvelope::new(command)).await
    }

    pub async fn run_envelope(&self, envelope: CommandEnvelope) -> anyhow::Result<()> {
        let mut stream = self.bus.subscribe_status();
        let request_id = envelope.request_id;
        self.bus
            .publish_command(envelope)
            .context("cannot publish command")?;

        while let Some(event) = stream.recv().await {
            if event.request_id != request_id {
                continue;
            }
            crate::progress::render(&event);
            if event.phase.is_terminal() {
                if event.phase == Phase::Failed {
                    anyhow::bail!("request {} failed", request_id);
                }
                return Ok(());
            }
        }
        anyhow::bail!("status channel closed before request {} finished", request_id)
    }
}
