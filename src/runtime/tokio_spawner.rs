//! Tokio runtime spawner implementation.

use tokio::runtime::{Builder, Handle, Runtime};

use super::spawn::{JobRun, Spawn};

/// Tokio-based spawner that runs jobs on a runtime's blocking pool.
///
/// Job bodies are synchronous closures, so they go through `spawn_blocking`
/// and never stall the runtime's async workers.
pub struct TokioSpawner {
    handle: Handle,
    /// Present when this spawner built (and therefore owns) the runtime.
    runtime: Option<Runtime>,
}

impl TokioSpawner {
    /// Create a `TokioSpawner` on an existing runtime handle.
    pub const fn new(handle: Handle) -> Self {
        Self {
            handle,
            runtime: None,
        }
    }

    /// Create a `TokioSpawner` with a new multi-threaded runtime with specified worker threads.
    ///
    /// # Errors
    ///
    /// Returns the I/O error reported by the runtime builder.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, std::io::Error> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("cron-pool-rt")
            .enable_all()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }
}

impl Spawn for TokioSpawner {
    fn spawn(&self, job: JobRun) {
        drop(self.handle.spawn_blocking(job));
    }
}

impl Drop for TokioSpawner {
    fn drop(&mut self) {
        // Dropping a runtime inside an async context panics; shut it down
        // without waiting instead. Running blocking jobs finish on their own.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
