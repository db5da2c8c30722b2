//! Listener pool and command dispatch.
//!
//! One dispatcher task consumes the command channel and hands each envelope
//! to a bounded set of worker tasks. Commands for the same project are
//! serialized via a per-project mutex; commands for different projects run
//! concurrently. A handler panic is caught at the task boundary, reported
//! as a `failed` status event, and the pool keeps serving.

use crate::deploy::DeployStep;
use crate::error::OrchestratorError;
use crate::{delete, deploy, power, scan, OrchestratorContext};
use cirrus_bus::{Command, CommandEnvelope, ResourceDelta, StatusEvent};
use cirrus_core::ResourceStatus;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedMutexGuard, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Per-project mutexes serializing writes to one project's blueprint and
/// tracker entries.
#[derive(Default)]
pub(crate) struct ProjectLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProjectLocks {
    pub(crate) async fn acquire(&self, slug: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().expect("project lock map poisoned");
            map.entry(slug.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }
}

/// Bounded worker pool consuming the command channel.
pub struct ListenerPool {
    dispatcher: JoinHandle<()>,
}

impl ListenerPool {
    /// Subscribe to the command channel and start dispatching with at most
    /// `workers` commands in flight.
    pub fn spawn(ctx: Arc<OrchestratorContext>, workers: usize) -> Self {
        let mut commands = ctx.bus.subscribe_commands();
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));

        let dispatcher = tokio::spawn(async move {
            tracing::info!(workers, "listener pool started");
            while let Some(envelope) = commands.recv().await {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    dispatch(ctx, envelope).await;
                });
            }
            tracing::info!("command channel closed, listener pool stopping");
        });

        Self { dispatcher }
    }

    pub fn shutdown(&self) {
        self.dispatcher.abort();
    }
}

impl Drop for ListenerPool {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

async fn dispatch(ctx: Arc<OrchestratorContext>, envelope: CommandEnvelope) {
    let request_id = envelope.request_id;
    let kind = envelope.command.kind();

    // Serialize commands that share a project; scans take no lock.
    let _guard = match envelope.command.project_slug() {
        Some(slug) => Some(ctx.locks.acquire(slug).await),
        None => None,
    };

    tracing::info!(%request_id, kind, "command accepted");
    ctx.bus
        .publish_status(StatusEvent::started(request_id, format!("{} accepted", kind)));

    let cancel = ctx.cancels.register(request_id);
    let handler_ctx = ctx.clone();
    let command = envelope.command;
    let handle = tokio::spawn(async move {
        run_handler(handler_ctx, request_id, command, cancel).await
    });

    let outcome = match handle.await {
        Ok(result) => result,
        Err(join_error) => {
            if join_error.is_panic() {
                tracing::error!(%request_id, kind, "handler panicked");
            }
            Err(OrchestratorError::WorkerPanicked)
        }
    };
    ctx.cancels.release(request_id);

    match outcome {
        Ok(message) => {
            tracing::info!(%request_id, kind, "command completed");
            ctx.bus
                .publish_status(StatusEvent::completed(request_id, message));
        }
        Err(err) => {
            tracing::error!(%request_id, kind, error = %err, "command failed");
            ctx.bus.publish_status(failure_event(request_id, &err));
        }
    }
}

async fn run_handler(
    ctx: Arc<OrchestratorContext>,
    request_id: Uuid,
    command: Command,
    cancel: crate::CancelFlag,
) -> Result<String, OrchestratorError> {
    match command {
        Command::Deploy { project_slug } => {
            deploy::handle_deploy(&ctx, request_id, &project_slug, &cancel).await
        }
        Command::Terminate {
            project_slug,
            resources,
        } => delete::handle_terminate(&ctx, request_id, &project_slug, &resources, &cancel).await,
        Command::Power {
            project_slug,
            action,
        } => power::handle_power(&ctx, request_id, &project_slug, action).await,
        Command::Scan { regions } => scan::handle_scan(&ctx, request_id, &regions).await,
    }
}

/// The terminal event for a failed request always names the failing step or
/// resource.
fn failure_event(request_id: Uuid, err: &OrchestratorError) -> StatusEvent {
    let mut event = StatusEvent::failed(request_id, err.to_string());
    if let OrchestratorError::StepFailed { step, slot, .. } = err {
        event.step = Some(step.number());
        event.total_steps = Some(DeployStep::TOTAL);
        if let Some(slot) = slot {
            event.resource_deltas.push(ResourceDelta {
                slot: *slot,
                provider_id: None,
                status: ResourceStatus::Failed,
            });
        }
    }
    event
}
