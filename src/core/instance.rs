//! A pooled engine instance and its Idle/Busy/Removed state machine.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::core::engine::ScheduleEngine;
use crate::core::job::{Job, JobId};
use crate::core::option::OptionSet;
use crate::core::TimerError;

/// Stable identifier of an engine instance.
pub type InstanceId = Uuid;

/// Load and lifecycle status of an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Below the busy threshold; eligible for allocation.
    Idle,
    /// At or above the busy threshold.
    Busy,
    /// Stopped. Terminal.
    Removed,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// Point-in-time description of an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    /// Instance identifier.
    pub id: InstanceId,
    /// Whether this is one of the permanent core instances.
    pub core: bool,
    /// Status at snapshot time.
    pub status: InstanceStatus,
    /// Options the instance was created with.
    pub options: OptionSet,
    /// Jobs registered at snapshot time.
    pub jobs: usize,
}

struct InstanceState {
    status: InstanceStatus,
    last_used: Instant,
}

/// One schedule engine plus the bookkeeping the pool needs about it.
///
/// The per-instance lock guards status, last-used time and the stop
/// transition. It is independent of the pool lock.
pub struct EngineInstance {
    id: InstanceId,
    engine: Box<dyn ScheduleEngine>,
    options: OptionSet,
    state: Mutex<InstanceState>,
}

impl EngineInstance {
    /// Start `engine` and wrap it as an idle instance.
    ///
    /// # Errors
    ///
    /// Propagates the engine's start failure.
    pub fn start(engine: Box<dyn ScheduleEngine>, options: OptionSet) -> Result<Self, TimerError> {
        engine.start()?;
        Ok(Self {
            id: Uuid::new_v4(),
            engine,
            options,
            state: Mutex::new(InstanceState {
                status: InstanceStatus::Idle,
                last_used: Instant::now(),
            }),
        })
    }

    /// Instance identifier.
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Options the instance was created with.
    pub const fn options(&self) -> &OptionSet {
        &self.options
    }

    /// Current status.
    pub fn status(&self) -> InstanceStatus {
        self.state.lock().status
    }

    /// True when the instance accepts allocation.
    pub fn is_idle(&self) -> bool {
        self.state.lock().status == InstanceStatus::Idle
    }

    /// True when no jobs are registered. Independent of the status field.
    pub fn is_empty(&self) -> bool {
        self.engine.entries() == 0
    }

    /// Number of jobs registered on the engine.
    pub fn job_count(&self) -> usize {
        self.engine.entries()
    }

    /// Time since the instance was created or last used.
    pub fn idle_for(&self) -> Duration {
        self.state.lock().last_used.elapsed()
    }

    /// Register `job` and promote to `Busy` once `busy_threshold` jobs are held.
    ///
    /// # Errors
    ///
    /// `TimerError::InstanceRemoved` after [`EngineInstance::stop`]; otherwise
    /// whatever the engine reports.
    pub fn add_job(
        &self,
        spec: &str,
        job: Arc<dyn Job>,
        busy_threshold: usize,
    ) -> Result<JobId, TimerError> {
        let mut state = self.state.lock();
        if state.status == InstanceStatus::Removed {
            return Err(TimerError::InstanceRemoved);
        }

        let id = self.engine.add_job(spec, job)?;
        state.last_used = Instant::now();
        if self.engine.entries() >= busy_threshold && state.status == InstanceStatus::Idle {
            state.status = InstanceStatus::Busy;
            debug!(instance = %self.id, jobs = self.engine.entries(), "instance busy");
        }
        Ok(id)
    }

    /// Deregister a job and demote to `Idle` once below `busy_threshold`.
    pub fn remove_job(&self, id: JobId, busy_threshold: usize) {
        let mut state = self.state.lock();
        if state.status == InstanceStatus::Removed {
            return;
        }

        self.engine.remove(id);
        state.last_used = Instant::now();
        if self.engine.entries() < busy_threshold && state.status == InstanceStatus::Busy {
            state.status = InstanceStatus::Idle;
            debug!(instance = %self.id, jobs = self.engine.entries(), "instance idle");
        }
    }

    /// Mark as recently used.
    pub fn touch(&self) {
        self.state.lock().last_used = Instant::now();
    }

    /// Stop the engine and enter `Removed`. Later calls are no-ops.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if state.status == InstanceStatus::Removed {
            return;
        }
        self.engine.stop();
        state.status = InstanceStatus::Removed;
        debug!(instance = %self.id, "instance stopped");
    }

    /// Snapshot for reporting.
    pub fn info(&self, core: bool) -> InstanceInfo {
        InstanceInfo {
            id: self.id,
            core,
            status: self.status(),
            options: self.options.clone(),
            jobs: self.job_count(),
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, by: Duration) {
        let mut state = self.state.lock();
        if let Some(earlier) = state.last_used.checked_sub(by) {
            state.last_used = earlier;
        }
    }
}

impl fmt::Debug for EngineInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineInstance")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("status", &self.status())
            .field("jobs", &self.job_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::memory::MemoryEngine;
    use crate::core::job::FuncJob;

    fn noop() -> Arc<dyn Job> {
        Arc::new(FuncJob(|| {}))
    }

    fn instance() -> EngineInstance {
        EngineInstance::start(Box::new(MemoryEngine::default()), OptionSet::default()).unwrap()
    }

    #[test]
    fn test_busy_exactly_at_threshold() {
        let inst = instance();
        let mut ids = Vec::new();
        for _ in 0..19 {
            ids.push(inst.add_job("@hourly", noop(), 20).unwrap());
        }
        assert_eq!(inst.status(), InstanceStatus::Idle);
        ids.push(inst.add_job("@hourly", noop(), 20).unwrap());
        assert_eq!(inst.status(), InstanceStatus::Busy);
        assert!(!inst.is_idle());

        inst.remove_job(ids.pop().unwrap(), 20);
        assert_eq!(inst.status(), InstanceStatus::Idle);
        assert_eq!(inst.job_count(), 19);
    }

    #[test]
    fn test_failed_add_keeps_state() {
        let inst = instance();
        assert!(inst.add_job("bogus", noop(), 1).is_err());
        assert_eq!(inst.status(), InstanceStatus::Idle);
        assert!(inst.is_empty());
    }

    #[test]
    fn test_removed_is_terminal() {
        let inst = instance();
        let id = inst.add_job("@hourly", noop(), 1).unwrap();
        assert_eq!(inst.status(), InstanceStatus::Busy);
        inst.stop();
        assert_eq!(inst.status(), InstanceStatus::Removed);

        assert!(matches!(
            inst.add_job("@hourly", noop(), 20),
            Err(TimerError::InstanceRemoved)
        ));
        inst.remove_job(id, 20);
        assert_eq!(inst.status(), InstanceStatus::Removed);
        inst.stop();
        assert_eq!(inst.status(), InstanceStatus::Removed);
    }

    #[test]
    fn test_emptiness_is_independent_of_status() {
        let inst = instance();
        assert!(inst.is_empty() && inst.is_idle());
        let id = inst.add_job("@hourly", noop(), 20).unwrap();
        assert!(!inst.is_empty() && inst.is_idle());
        inst.remove_job(id, 20);
        assert!(inst.is_empty());
    }

    #[test]
    fn test_use_refreshes_last_used() {
        let inst = instance();
        inst.backdate(Duration::from_secs(5));
        assert!(inst.idle_for() >= Duration::from_secs(5));
        inst.touch();
        assert!(inst.idle_for() < Duration::from_secs(5));
    }
}
