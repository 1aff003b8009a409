//! Core scheduling abstractions, the instance pool and the task timer.

pub mod cron_engine;
pub mod engine;
pub mod error;
pub mod instance;
pub mod job;
pub mod option;
pub mod pool;
pub mod reaper;
pub mod registry;
pub mod spec;
pub mod timer;

pub use cron_engine::{CronEngine, CronEngineFactory};
pub use engine::{EngineFactory, ScheduleEngine};
pub use error::{AppResult, TimerError};
pub use instance::{EngineInstance, InstanceId, InstanceInfo, InstanceStatus};
pub use job::{FuncJob, Job, JobId};
pub use option::{EngineOption, Location, OptionSet};
pub use pool::{InstancePool, PoolStats, CORE_INSTANCES};
pub use reaper::IdleReaper;
pub use registry::{TaskHandle, TaskRegistry};
pub use spec::Schedule;
pub use timer::{TaskTimer, TimerStats};
