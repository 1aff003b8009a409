//! Error types for timer and engine operations.

use thiserror::Error;

use crate::core::job::JobId;

/// Errors produced by the task timer and its engines.
#[derive(Debug, Error)]
pub enum TimerError {
    /// A task with this name is already registered. Carries the existing job id.
    #[error("task already started: {name} (job {job_id})")]
    DuplicateTask {
        /// Name of the conflicting task.
        name: String,
        /// Job id of the task already registered under that name.
        job_id: JobId,
    },
    /// The engine rejected the schedule expression.
    #[error("invalid schedule spec `{spec}`: {reason}")]
    InvalidSpec {
        /// Spec string as given by the caller.
        spec: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// The engine instance was stopped and accepts no more jobs.
    #[error("engine instance removed")]
    InstanceRemoved,
    /// The timer has been closed.
    #[error("task timer is closed")]
    Closed,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An OS thread could not be spawned.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl TimerError {
    /// Job id of the already registered task when this is a duplicate-name error.
    pub const fn existing_job(&self) -> Option<JobId> {
        match self {
            Self::DuplicateTask { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
