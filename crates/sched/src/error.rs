use thiserror::Error;

/// Scheduler API errors.
#[derive(Debug, Error)]
pub enum SchedError {
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("unit already queued or loading: {0}")]
    AlreadyQueued(String),

    #[error("unit is not in a failed state: {0}")]
    NotFailed(String),

    #[error("wave run already in progress")]
    RunInProgress,
}

/// Failure of a load task. Recorded on the unit and reported to telemetry,
/// never propagated to the scheduler's caller.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("loader failed: {0}")]
    Loader(String),
}
