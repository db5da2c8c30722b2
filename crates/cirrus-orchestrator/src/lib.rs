//! Cirrus orchestrator
//!
//! The command side of the bus ends here: a bounded listener pool consumes
//! command envelopes, serializes work per project, and drives the deployment
//! orchestrator, the dependency-aware deleter and the power/scan handlers
//! against a [`CloudProvider`]. Every unit of work reports back over the
//! status channel with the originating request id.

pub mod bridge;
pub mod cancel;
pub mod delete;
pub mod deploy;
pub mod error;
pub mod listener;
pub mod power;
pub mod recovery;
pub mod scan;

pub use bridge::{RequestState, StatusBridge};
pub use cancel::{CancelFlag, CancelRegistry};
pub use deploy::DeployStep;
pub use error::{OrchestratorError, Result};
pub use listener::ListenerPool;

use cirrus_bus::MessageBus;
use cirrus_cloud::{
    call_with_retry, CloudProvider, DependencyGraph, ProviderError, ResourceTracker, RetryConfig,
};
use cirrus_core::BlueprintStore;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Shared state for the listener pool and its handlers.
///
/// The tracker and the blueprint store are the only mutable shared state;
/// all writers go through the per-project lock held by the pool, readers
/// tolerate transitional statuses.
pub struct OrchestratorContext {
    pub store: BlueprintStore,
    pub tracker: ResourceTracker,
    pub provider: Arc<dyn CloudProvider>,
    pub bus: MessageBus,
    pub graph: DependencyGraph,
    pub retry: RetryConfig,
    pub step_timeout: Duration,
    /// Where per-region scan results are cached.
    pub cache_dir: PathBuf,
    /// Regions scanned when a scan command names none.
    pub scan_regions: Vec<String>,
    pub(crate) locks: listener::ProjectLocks,
    pub(crate) cancels: CancelRegistry,
}

impl OrchestratorContext {
    pub fn new(
        store: BlueprintStore,
        tracker: ResourceTracker,
        provider: Arc<dyn CloudProvider>,
        bus: MessageBus,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            tracker,
            provider,
            bus,
            graph: DependencyGraph::standard(),
            retry: RetryConfig::default(),
            step_timeout: Duration::from_secs(300),
            cache_dir: cache_dir.into(),
            scan_regions: vec!["us-east-1".to_string()],
            locks: listener::ProjectLocks::default(),
            cancels: CancelRegistry::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_scan_regions(mut self, regions: Vec<String>) -> Self {
        self.scan_regions = regions;
        self
    }

    /// Request best-effort cancellation of an in-flight request. The flag is
    /// honoured between steps.
    pub fn cancel(&self, request_id: Uuid) -> bool {
        self.cancels.cancel(request_id)
    }
}

/// One provider call under the per-call timeout and the bounded in-step
/// retry for transient errors. A timeout is a step failure, never
/// "resource does not exist".
pub(crate) async fn provider_call<T, F, Fut>(
    ctx: &OrchestratorContext,
    op: F,
) -> cirrus_cloud::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = cirrus_cloud::Result<T>>,
{
    let step_timeout = ctx.step_timeout;
    call_with_retry(&ctx.retry, move || {
        let attempt = op();
        async move {
            match tokio::time::timeout(step_timeout, attempt).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "no response within {}s",
                    step_timeout.as_secs()
                ))),
            }
        }
    })
    .await
}
