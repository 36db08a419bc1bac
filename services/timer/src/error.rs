//! services/timer/src/error.rs
//!
//! Defines the primary error types for the timer service.

use crate::config::ConfigError;
use worktimer_core::{PortError, TimeLogError};

/// Failures of a single timer operation (pause, resume, stop).
///
/// These never take the service down; the controller logs them, notifies the
/// user where appropriate and leaves its local state untouched.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("No active timer")]
    NoActiveTimer,

    /// The assignment disappeared between selection and write.
    #[error("Task assignment not found in project {0}")]
    TaskNotFound(String),

    #[error("Invalid timer transition: {0}")]
    InvalidTransition(#[from] TimeLogError),

    #[error("Gave up after {attempts} conflicting writes to project {project_id}")]
    ConflictRetriesExhausted { project_id: String, attempts: u32 },

    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),
}

/// The primary error type for starting and running the `timer` service.
#[derive(Debug, thiserror::Error)]
pub enum TimerServiceError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while applying database migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
