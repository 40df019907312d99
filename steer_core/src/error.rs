use thiserror::Error;

/// Why a session stopped before the plan was exhausted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    #[error("user abort")]
    UserAbort,
    #[error("trial could not be persisted")]
    PersistFailure,
}

#[derive(Debug, Error, Clone)]
pub enum SteerError {
    #[error("digitizer error: {0}")]
    Digitizer(String),
    #[error("digitizer fault: {0}")]
    DigitizerFault(String),
    #[error("timeout waiting for digitizer")]
    Timeout,
    #[error("persistence error: {0}")]
    Persist(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("aborted: {reason} ({discarded_samples} samples discarded)")]
    Abort {
        reason: AbortReason,
        discarded_samples: usize,
    },
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing digitizer")]
    MissingDigitizer,
    #[error("missing cue")]
    MissingCue,
    #[error("missing trial sink")]
    MissingSink,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
