//! The dispatch trait and a plain OS-thread implementation.

use std::sync::Arc;
use std::thread;

use tracing::error;

use crate::core::TimerError;

/// A boxed job run handed to a spawner.
pub type JobRun = Box<dyn FnOnce() + Send + 'static>;

/// Abstraction for running triggered jobs off the scheduling thread.
pub trait Spawn: Send + Sync {
    /// Run `job` on some execution context. Must not block the caller.
    fn spawn(&self, job: JobRun);
}

/// Spawner that starts a fresh OS thread per run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSpawner;

impl Spawn for ThreadSpawner {
    fn spawn(&self, job: JobRun) {
        if let Err(e) = thread::Builder::new()
            .name("cron-job".into())
            .spawn(job)
        {
            error!(error = %e, "failed to spawn job thread; run dropped");
        }
    }
}

/// Spawner used when the caller does not supply one.
///
/// With the `tokio-runtime` feature this is a [`super::TokioSpawner`] owning a
/// dedicated multi-threaded runtime, otherwise a [`ThreadSpawner`].
///
/// # Errors
///
/// Returns `TimerError::Spawn` if the runtime cannot be built.
#[cfg(feature = "tokio-runtime")]
pub fn default_spawner(worker_threads: usize) -> Result<Arc<dyn Spawn>, TimerError> {
    Ok(Arc::new(super::TokioSpawner::with_worker_threads(
        worker_threads,
    )?))
}

/// Spawner used when the caller does not supply one.
///
/// # Errors
///
/// Never fails without the `tokio-runtime` feature.
#[cfg(not(feature = "tokio-runtime"))]
pub fn default_spawner(_worker_threads: usize) -> Result<Arc<dyn Spawn>, TimerError> {
    Ok(Arc::new(ThreadSpawner))
}
