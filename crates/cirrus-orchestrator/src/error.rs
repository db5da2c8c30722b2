use crate::deploy::DeployStep;
use cirrus_bus::BusError;
use cirrus_cloud::ProviderError;
use cirrus_core::{CoreError, Slot};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Malformed command or blueprint, rejected before any provider call.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("step {} of {} ({}) failed: {}", .step.number(), DeployStep::TOTAL, .step.name(), .source)]
    StepFailed {
        step: DeployStep,
        slot: Option<Slot>,
        #[source]
        source: ProviderError,
    },

    #[error("cancelled before step {0}")]
    Cancelled(String),

    #[error("{failed} of {total} deletion(s) failed: {details}")]
    TerminateFailed {
        failed: usize,
        total: usize,
        details: String,
    },

    #[error("failed to {action} {failed} of {total} resource(s): {details}")]
    PowerFailed {
        action: String,
        failed: usize,
        total: usize,
        details: String,
    },

    #[error("scan failed in every region: {0}")]
    ScanFailed(String),

    #[error("worker panicked while handling the command")]
    WorkerPanicked,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Bus(#[from] BusError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
