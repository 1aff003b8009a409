//! Contract between the pool manager and a schedule engine.
//!
//! The pool never schedules anything itself. It creates engines through an
//! [`EngineFactory`], registers jobs on them, and reads their entry count to
//! decide load and reclaim eligibility.

use std::sync::Arc;

use crate::core::job::{FuncJob, Job, JobId};
use crate::core::option::OptionSet;
use crate::core::TimerError;

/// Operations the pool requires from a schedule engine.
pub trait ScheduleEngine: Send + Sync {
    /// Begin triggering registered jobs.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine's execution context cannot be started.
    fn start(&self) -> Result<(), TimerError>;

    /// Stop triggering. Runs already dispatched are not interrupted.
    fn stop(&self);

    /// Register `job` under `spec` and return the engine-assigned id.
    ///
    /// # Errors
    ///
    /// Spec validation belongs to the engine; its errors are returned as is.
    fn add_job(&self, spec: &str, job: Arc<dyn Job>) -> Result<JobId, TimerError>;

    /// Register a closure under `spec`.
    ///
    /// # Errors
    ///
    /// Same as [`ScheduleEngine::add_job`].
    fn add_func(
        &self,
        spec: &str,
        func: Box<dyn Fn() + Send + Sync + 'static>,
    ) -> Result<JobId, TimerError> {
        self.add_job(spec, Arc::new(FuncJob(func)))
    }

    /// Number of jobs currently registered.
    fn entries(&self) -> usize;

    /// Deregister a job. Unknown ids are ignored.
    fn remove(&self, id: JobId);
}

/// Builds engines for a given option set.
pub trait EngineFactory: Send + Sync {
    /// Create a new, not yet started engine configured with `options`.
    fn create(&self, options: &OptionSet) -> Box<dyn ScheduleEngine>;
}
