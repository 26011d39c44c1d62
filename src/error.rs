//! Custom error types for the engine.
//!
//! This module defines the primary error type, `BrainprintError`, for the
//! entire crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the failures that can occur, from configuration
//! issues to pipeline and collaborator problems.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from the `config` crate, typically file
//!   parsing or format issues in the configuration files.
//! - **`Configuration`**: Semantic errors in the configuration, such as
//!   values that parse fine but are logically invalid (e.g. a zero buffer
//!   capacity). Caught during the validation step.
//! - **`AlreadyRunning`** / **`RunInProgress`**: exclusion violations on the
//!   acquisition task and the authentication pipeline respectively. Both
//!   reject the offending call without changing any state.
//! - **`InsufficientData`**: the capture stage found an empty window; the
//!   run fails without ever reaching the classifier.
//! - **`Classification`**: the classifier collaborator failed or returned an
//!   out-of-contract result. Terminates the run, publishes no partial result.
//! - **`TickIngestion`**: a transient per-tick source failure. Recovered
//!   inside the acquisition task (logged, tick skipped) and never surfaces
//!   to callers.
//!
//! By using `#[from]`, `BrainprintError` can be seamlessly created from
//! underlying error types, simplifying error handling throughout the crate
//! with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, BrainprintError>;

/// Unified error type for acquisition, pipeline, and configuration failures.
#[derive(Error, Debug)]
pub enum BrainprintError {
    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration parsed but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// I/O failure (config files, console).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `start()` was called while the acquisition task is already active.
    #[error("Acquisition is already running")]
    AlreadyRunning,

    /// `trigger()` was called while another authentication run is in flight.
    #[error("An authentication run is already in progress")]
    RunInProgress,

    /// The captured window was empty; nothing to authenticate.
    #[error("Insufficient data captured for authentication")]
    InsufficientData,

    /// The classifier collaborator failed or violated its contract.
    #[error("Classification error: {0}")]
    Classification(String),

    /// A single acquisition tick failed to produce a sample. Recovered
    /// locally by skipping the tick; never terminates the stream.
    #[error("Tick ingestion error: {0}")]
    TickIngestion(String),

    /// A supervised background task could not be joined.
    #[error("Background task failed: {0}")]
    TaskJoin(String),
}

impl BrainprintError {
    /// Short machine-readable kind, used by result sinks when reporting a
    /// failed run to an observer.
    pub fn kind(&self) -> &'static str {
        match self {
            BrainprintError::Config(_) => "config",
            BrainprintError::Configuration(_) => "configuration",
            BrainprintError::Io(_) => "io",
            BrainprintError::AlreadyRunning => "already_running",
            BrainprintError::RunInProgress => "run_in_progress",
            BrainprintError::InsufficientData => "insufficient_data",
            BrainprintError::Classification(_) => "classification",
            BrainprintError::TickIngestion(_) => "tick_ingestion",
            BrainprintError::TaskJoin(_) => "task_join",
        }
    }
}

impl From<tokio::task::JoinError> for BrainprintError {
    fn from(value: tokio::task::JoinError) -> Self {
        BrainprintError::TaskJoin(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(BrainprintError::RunInProgress.kind(), "run_in_progress");
        assert_eq!(
            BrainprintError::InsufficientData.kind(),
            "insufficient_data"
        );
        assert_eq!(
            BrainprintError::Classification("bad tensor".into()).kind(),
            "classification"
        );
    }

    #[test]
    fn display_messages_are_actionable() {
        let err = BrainprintError::Configuration("buffer_capacity must be >= 1".into());
        assert!(err.to_string().contains("buffer_capacity"));
    }

    #[tokio::test]
    async fn join_error_converts_to_task_join() {
        let handle = tokio::spawn(async { panic!("boom") });
        let err = handle.await.unwrap_err();
        let app: BrainprintError = err.into();
        assert_eq!(app.kind(), "task_join");
    }
}
