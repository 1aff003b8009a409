//! The public task timer.
//!
//! `TaskTimer` registers named tasks on pooled engine instances. One coarse
//! lock covers the instance pool and the task registry, so every allocation
//! decision is consistent with the registry it updates. The engine add and
//! remove calls happen under that lock too.
//!
//! ```rust,ignore
//! use cron_pool::{EngineOption, TaskTimer};
//!
//! let timer = TaskTimer::new()?;
//! timer.add_task_by_func("report", "0 * * * *", || send_report(), &[])?;
//! timer.once_task("warmup", "*/5 * * * * *", || warm_caches(), &[EngineOption::Seconds])?;
//! assert!(timer.find_task("report"));
//! timer.remove("report")?;
//! timer.close();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::builders::TimerBuilder;
use crate::config::TimerConfig;
use crate::core::engine::EngineFactory;
use crate::core::instance::{InstanceId, InstanceInfo};
use crate::core::job::{FuncJob, Job, JobId};
use crate::core::option::{EngineOption, OptionSet};
use crate::core::pool::{InstancePool, PoolStats};
use crate::core::reaper::IdleReaper;
use crate::core::registry::{TaskHandle, TaskRegistry};
use crate::core::TimerError;

/// Where a once-task landed. Written under the pool lock during registration.
type Placement = OnceLock<(InstanceId, JobId)>;

/// Statistics about the timer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStats {
    /// Instance occupancy.
    pub pool: PoolStats,
    /// Registered task names.
    pub tasks: usize,
    /// Times the idle reaper was relaunched after a fault.
    pub reaper_restarts: u64,
    /// Whether [`TaskTimer::close`] has run.
    pub closed: bool,
}

struct PoolState {
    pool: InstancePool,
    registry: TaskRegistry,
    closed: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    config: TimerConfig,
}

impl Shared {
    fn register(
        &self,
        name: &str,
        spec: &str,
        job: Arc<dyn Job>,
        options: &OptionSet,
        placement: Option<&Placement>,
    ) -> Result<JobId, TimerError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TimerError::Closed);
        }
        if let Some(existing) = state.registry.get(name) {
            warn!(task = name, job_id = %existing.job_id, "task already started");
            return Err(TimerError::DuplicateTask {
                name: name.to_owned(),
                job_id: existing.job_id,
            });
        }

        let inst = state.pool.allocate(options)?;
        let job_id = inst.add_job(spec, job, self.config.busy_threshold)?;
        state.registry.insert(name, TaskHandle::new(&inst, job_id));
        if let Some(slot) = placement {
            if slot.set((inst.id(), job_id)).is_err() {
                warn!(task = name, "placement already recorded");
            }
        }

        debug!(
            task = name,
            instance = %inst.id(),
            job_id = %job_id,
            options = %options,
            "task registered"
        );
        Ok(job_id)
    }

    /// Remove `name` if `accept` agrees with its handle. Returns whether a
    /// task was removed.
    fn remove_where<F>(&self, name: &str, accept: F) -> Result<bool, TimerError>
    where
        F: FnOnce(&TaskHandle) -> bool,
    {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TimerError::Closed);
        }
        if !state.registry.get(name).is_some_and(accept) {
            return Ok(false);
        }
        let Some(handle) = state.registry.remove(name) else {
            return Ok(false);
        };

        if let Some(inst) = handle.instance.upgrade() {
            inst.remove_job(handle.job_id, self.config.busy_threshold);
        }
        debug!(task = name, job_id = %handle.job_id, "task removed");
        Ok(true)
    }

    fn sweep(&self) -> usize {
        let mut state = self.state.lock();
        if state.closed {
            return 0;
        }
        let removed = state.pool.sweep_idle(self.config.idle_threshold());
        let remaining = state.pool.dynamic().len();
        if removed > 0 {
            info!(removed, remaining, "idle sweep reclaimed instances");
        } else {
            debug!(remaining, "idle sweep found nothing to reclaim");
        }
        removed
    }
}

/// Concurrency-safe registry of named cron tasks over a pool of engines.
///
/// Dropping the timer closes it.
pub struct TaskTimer {
    shared: Arc<Shared>,
    reaper: Mutex<Option<IdleReaper>>,
}

impl TaskTimer {
    /// Create a timer with the default configuration and engine.
    ///
    /// # Errors
    ///
    /// Fails if the job runtime, a core engine or the reaper cannot start.
    pub fn new() -> Result<Self, TimerError> {
        TimerBuilder::new().build()
    }

    /// Create a timer with `config` and the default engine.
    ///
    /// # Errors
    ///
    /// `TimerError::InvalidConfig` for invalid values, otherwise as
    /// [`TaskTimer::new`].
    pub fn with_config(config: TimerConfig) -> Result<Self, TimerError> {
        TimerBuilder::new().config(config).build()
    }

    /// Assemble a timer from a validated config and an engine factory.
    pub(crate) fn from_parts(
        config: TimerConfig,
        factory: Arc<dyn EngineFactory>,
    ) -> Result<Self, TimerError> {
        let pool = InstancePool::new(factory)?;
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                pool,
                registry: TaskRegistry::new(),
                closed: false,
            }),
            config,
        });

        let weak = Arc::downgrade(&shared);
        let reaper = IdleReaper::spawn(shared.config.reap_interval(), move || {
            if let Some(shared) = weak.upgrade() {
                shared.sweep();
            }
        })?;

        info!(
            busy_threshold = shared.config.busy_threshold,
            reap_interval_ms = shared.config.reap_interval_ms,
            idle_threshold_ms = shared.config.idle_threshold_ms,
            "task timer started"
        );
        Ok(Self {
            shared,
            reaper: Mutex::new(Some(reaper)),
        })
    }

    /// Register a closure under a unique task name.
    ///
    /// # Errors
    ///
    /// - `TimerError::DuplicateTask` carrying the existing job id when `name`
    ///   is taken; nothing is registered.
    /// - `TimerError::InvalidSpec` when the engine rejects `spec`.
    /// - `TimerError::Closed` after [`TaskTimer::close`].
    pub fn add_task_by_func<F>(
        &self,
        name: &str,
        spec: &str,
        task: F,
        options: &[EngineOption],
    ) -> Result<JobId, TimerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared
            .register(name, spec, Arc::new(FuncJob(task)), &OptionSet::from_slice(options), None)
    }

    /// Register a [`Job`] under a unique task name.
    ///
    /// # Errors
    ///
    /// Same as [`TaskTimer::add_task_by_func`].
    pub fn add_task_by_job<J>(
        &self,
        name: &str,
        spec: &str,
        job: J,
        options: &[EngineOption],
    ) -> Result<JobId, TimerError>
    where
        J: Job,
    {
        self.shared
            .register(name, spec, Arc::new(job), &OptionSet::from_slice(options), None)
    }

    /// Register a closure that runs once and then deregisters itself.
    ///
    /// After `task` returns or panics, the wrapper waits the configured grace
    /// delay and removes the task. Triggers arriving in the meantime do not run `task`
    /// again. If the name has been re-registered by then, the newer task is
    /// left alone.
    ///
    /// # Errors
    ///
    /// Same as [`TaskTimer::add_task_by_func`].
    pub fn once_task<F>(
        &self,
        name: &str,
        spec: &str,
        task: F,
        options: &[EngineOption],
    ) -> Result<JobId, TimerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let shared = Arc::downgrade(&self.shared);
        let grace = self.shared.config.once_grace();
        let task_name = name.to_owned();
        let placement: Arc<Placement> = Arc::new(OnceLock::new());
        let placed = Arc::clone(&placement);
        let fired = AtomicBool::new(false);

        let wrapped = move || {
            if fired.swap(true, Ordering::AcqRel) {
                return;
            }
            // Deregisters on drop, so a panicking task is removed as well.
            let _cleanup = OnceCleanup {
                shared: &shared,
                name: &task_name,
                placement: &placed,
                grace,
            };
            task();
        };

        self.shared.register(
            name,
            spec,
            Arc::new(FuncJob(wrapped)),
            &OptionSet::from_slice(options),
            Some(&placement),
        )
    }

    /// Whether a task named `name` is registered. `false` after close.
    pub fn find_task(&self, name: &str) -> bool {
        self.shared.state.lock().registry.contains(name)
    }

    /// Deregister `name`. Unknown names are not an error.
    ///
    /// # Errors
    ///
    /// `TimerError::Closed` after [`TaskTimer::close`].
    pub fn remove(&self, name: &str) -> Result<(), TimerError> {
        self.shared.remove_where(name, |_| true).map(|_| ())
    }

    /// Instance hosting `name`, if registered.
    pub fn task_instance(&self, name: &str) -> Option<InstanceId> {
        let state = self.shared.state.lock();
        state
            .registry
            .get(name)
            .and_then(|handle| handle.instance.upgrade())
            .map(|inst| inst.id())
    }

    /// Registered task names, sorted.
    pub fn task_names(&self) -> Vec<String> {
        self.shared.state.lock().registry.names()
    }

    /// Per-instance snapshot, core instances first.
    pub fn instances(&self) -> Vec<InstanceInfo> {
        self.shared.state.lock().pool.instances()
    }

    /// Run one idle sweep now instead of waiting for the reaper tick.
    /// Returns the number of reclaimed instances.
    pub fn reap_idle(&self) -> usize {
        self.shared.sweep()
    }

    /// Current statistics.
    pub fn stats(&self) -> TimerStats {
        let reaper_restarts = self
            .reaper
            .lock()
            .as_ref()
            .map_or(0, IdleReaper::restarts);
        let state = self.shared.state.lock();
        TimerStats {
            pool: state.pool.stats(),
            tasks: state.registry.len(),
            reaper_restarts,
            closed: state.closed,
        }
    }

    /// Whether [`TaskTimer::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Configuration in effect.
    pub fn config(&self) -> &TimerConfig {
        &self.shared.config
    }

    /// Stop the reaper and every engine instance and forget all tasks.
    ///
    /// The timer is unusable afterwards: registering or removing returns
    /// `TimerError::Closed`. Calling `close` again does nothing.
    pub fn close(&self) {
        let reaper = self.reaper.lock().take();
        if let Some(mut reaper) = reaper {
            reaper.shutdown();
        }

        let mut state = self.shared.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let tasks = state.registry.len();
        state.registry.clear();
        state.pool.shutdown();
        info!(tasks, "task timer closed");
    }
}

impl Drop for TaskTimer {
    fn drop(&mut self) {
        self.close();
    }
}

struct OnceCleanup<'a> {
    shared: &'a Weak<Shared>,
    name: &'a str,
    placement: &'a Placement,
    grace: Duration,
}

impl Drop for OnceCleanup<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!(task = self.name, "once task panicked");
        }
        thread::sleep(self.grace);
        finish_once(self.shared, self.name, self.placement);
    }
}

/// Remove `name` only if it still refers to the recorded placement.
fn finish_once(shared: &Weak<Shared>, name: &str, placement: &Placement) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    // Runs under the pool lock, after registration has recorded the placement.
    let outcome = shared.remove_where(name, |handle| {
        placement.get().is_some_and(|&(instance, job_id)| {
            handle.job_id == job_id
                && handle
                    .instance
                    .upgrade()
                    .is_some_and(|inst| inst.id() == instance)
        })
    });
    match outcome {
        Ok(true) => debug!(task = name, "once task finished and removed"),
        Ok(false) => debug!(task = name, "once task already gone"),
        Err(e) => debug!(task = name, error = %e, "once task cleanup skipped"),
    }
}
