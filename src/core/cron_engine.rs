//! Default schedule engine.
//!
//! Each engine owns one scheduling thread. The thread sleeps on a `Condvar`
//! until the earliest trigger is due or the entry list changes, then hands
//! due runs to the configured [`Spawn`] implementation. No polling.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace};

use crate::core::engine::{EngineFactory, ScheduleEngine};
use crate::core::job::{Job, JobId};
use crate::core::option::{EngineOption, Location, OptionSet};
use crate::core::spec::Schedule;
use crate::core::TimerError;
use crate::runtime::Spawn;
use crate::util::panic_message;

static ENGINE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Per-entry state shared with in-flight runs.
#[derive(Default)]
struct RunGuard {
    running: AtomicBool,
    serial: Mutex<()>,
}

struct Entry {
    id: JobId,
    schedule: Schedule,
    next: Option<DateTime<Utc>>,
    job: Arc<dyn Job>,
    guard: Arc<RunGuard>,
}

struct EngineState {
    entries: Vec<Entry>,
    running: bool,
}

struct Shared {
    state: Mutex<EngineState>,
    wake: Condvar,
}

/// Job wrappers derived from the option set.
#[derive(Debug, Clone, Copy)]
struct Chain {
    recover: bool,
    skip: bool,
    delay: bool,
}

/// Cron engine backed by a dedicated scheduling thread.
pub struct CronEngine {
    options: OptionSet,
    seconds: bool,
    location: Location,
    chain: Chain,
    shared: Arc<Shared>,
    next_id: AtomicU64,
    spawner: Arc<dyn Spawn>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CronEngine {
    /// Create a stopped engine configured by `options`.
    pub fn new(options: OptionSet, spawner: Arc<dyn Spawn>) -> Self {
        let chain = Chain {
            recover: options.contains(&EngineOption::Recover),
            skip: options.contains(&EngineOption::SkipIfStillRunning),
            delay: options.contains(&EngineOption::DelayIfStillRunning),
        };
        Self {
            seconds: options.contains(&EngineOption::Seconds),
            location: options.location(),
            chain,
            options,
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState {
                    entries: Vec::new(),
                    running: false,
                }),
                wake: Condvar::new(),
            }),
            next_id: AtomicU64::new(0),
            spawner,
            worker: Mutex::new(None),
        }
    }

    /// Options this engine was created with.
    pub const fn options(&self) -> &OptionSet {
        &self.options
    }

    /// Next trigger time of a registered job, if any.
    pub fn next_run(&self, id: JobId) -> Option<DateTime<Utc>> {
        let state = self.shared.state.lock();
        state.entries.iter().find(|e| e.id == id).and_then(|e| e.next)
    }
}

impl ScheduleEngine for CronEngine {
    fn start(&self) -> Result<(), TimerError> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        self.shared.state.lock().running = true;

        let shared = Arc::clone(&self.shared);
        let spawner = Arc::clone(&self.spawner);
        let location = self.location;
        let chain = self.chain;
        let seq = ENGINE_SEQ.fetch_add(1, Ordering::Relaxed);
        let handle = thread::Builder::new()
            .name(format!("cron-engine-{seq}"))
            .spawn(move || run_loop(&shared, spawner.as_ref(), location, chain));

        match handle {
            Ok(handle) => {
                *worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.state.lock().running = false;
                Err(TimerError::Spawn(e))
            }
        }
    }

    fn stop(&self) {
        self.shared.state.lock().running = false;
        self.shared.wake.notify_all();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                error!("cron engine thread panicked");
            }
        }
    }

    fn add_job(&self, spec: &str, job: Arc<dyn Job>) -> Result<JobId, TimerError> {
        let schedule = Schedule::parse(spec, self.seconds)?;
        let id = JobId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let next = schedule.next_after(Utc::now(), self.location);

        self.shared.state.lock().entries.push(Entry {
            id,
            schedule,
            next,
            job,
            guard: Arc::new(RunGuard::default()),
        });
        self.shared.wake.notify_all();

        debug!(job_id = %id, spec, next = ?next, "cron entry added");
        Ok(id)
    }

    fn entries(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    fn remove(&self, id: JobId) {
        self.shared.state.lock().entries.retain(|e| e.id != id);
        self.shared.wake.notify_all();
    }
}

impl Drop for CronEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(shared: &Shared, spawner: &dyn Spawn, location: Location, chain: Chain) {
    let mut state = shared.state.lock();
    while state.running {
        let now = Utc::now();
        for entry in &mut state.entries {
            match entry.next {
                Some(next) if next <= now => {
                    dispatch(spawner, entry, chain);
                    entry.next = entry.schedule.next_after(now, location);
                }
                _ => {}
            }
        }

        match state.entries.iter().filter_map(|e| e.next).min() {
            Some(at) => {
                let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                shared.wake.wait_for(&mut state, wait);
            }
            None => shared.wake.wait(&mut state),
        }
    }
    trace!("cron engine loop exited");
}

fn dispatch(spawner: &dyn Spawn, entry: &Entry, chain: Chain) {
    let id = entry.id;
    let job = Arc::clone(&entry.job);
    let guard = Arc::clone(&entry.guard);
    trace!(job_id = %id, "dispatching run");
    spawner.spawn(Box::new(move || run_chained(id, job.as_ref(), &guard, chain)));
}

/// Clears the still-running flag even when the job unwinds.
struct RunningFlag<'a>(&'a AtomicBool);

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn run_chained(id: JobId, job: &dyn Job, guard: &RunGuard, chain: Chain) {
    let _running = if chain.skip {
        if guard.running.swap(true, Ordering::AcqRel) {
            debug!(job_id = %id, "previous run still active, skipping");
            return;
        }
        Some(RunningFlag(&guard.running))
    } else {
        None
    };
    let _serial = chain.delay.then(|| guard.serial.lock());

    if chain.recover {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job.run())) {
            error!(job_id = %id, panic = %panic_message(&*payload), "job panicked; recovered");
        }
    } else {
        job.run();
    }
}

/// Factory producing [`CronEngine`]s that share one spawner.
#[derive(Clone)]
pub struct CronEngineFactory {
    spawner: Arc<dyn Spawn>,
}

impl CronEngineFactory {
    /// Create a factory dispatching runs through `spawner`.
    pub fn new(spawner: Arc<dyn Spawn>) -> Self {
        Self { spawner }
    }
}

impl EngineFactory for CronEngineFactory {
    fn create(&self, options: &OptionSet) -> Box<dyn ScheduleEngine> {
        Box::new(CronEngine::new(options.clone(), Arc::clone(&self.spawner)))
    }
}
