//! # Cron Pool
//!
//! Named cron tasks spread over a pool of scheduling engines.
//!
//! A single cron engine carrying hundreds of jobs wakes for all of them on one
//! thread. `cron_pool` instead keeps a small pool of engine instances, packs
//! tasks onto them up to a busy threshold and spins up extra instances on
//! demand. Tasks that need a differently configured engine (seconds field,
//! time zone, overlap policy) get an instance of their own configuration.
//!
//! ## Key Features
//!
//! - **Named tasks**: register, look up and remove tasks by a unique name
//! - **Load packing**: two permanent core instances, dynamic overflow beyond them
//! - **Per-option engines**: tasks are only ever co-located with identical options
//! - **One-shot tasks**: run once, then deregister after a short grace delay
//! - **Idle reclamation**: a supervised reaper stops unused dynamic instances
//!
//! ```rust,ignore
//! use cron_pool::{EngineOption, TaskTimer};
//!
//! let timer = TaskTimer::new()?;
//! timer.add_task_by_func("cleanup", "*/10 * * * *", || purge_tmp(), &[])?;
//! timer.add_task_by_func(
//!     "heartbeat",
//!     "*/5 * * * * *",
//!     || ping(),
//!     &[EngineOption::Seconds, EngineOption::SkipIfStillRunning],
//! )?;
//!
//! if timer.find_task("cleanup") {
//!     timer.remove("cleanup")?;
//! }
//! timer.close();
//! ```
//!
//! Configuration comes from [`TimerConfig`], either built in code or read
//! from `CRON_POOL_*` environment variables. Logging goes through `tracing`;
//! call [`util::init_tracing`] or install your own subscriber.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions, the instance pool and the task timer.
pub mod core;
/// Configuration models for the timer and its reaper.
pub mod config;
/// Builders to construct a timer from configuration.
pub mod builders;
/// Job dispatch adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use builders::TimerBuilder;
pub use config::TimerConfig;
pub use core::{
    AppResult, EngineOption, InstanceId, InstanceStatus, Job, JobId, Location, TaskTimer,
    TimerError, TimerStats,
};
