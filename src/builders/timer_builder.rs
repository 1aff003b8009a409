//! Builder for [`TaskTimer`] with pluggable job runtime and engine.

use std::sync::Arc;

use crate::config::TimerConfig;
use crate::core::cron_engine::CronEngineFactory;
use crate::core::engine::EngineFactory;
use crate::core::{TaskTimer, TimerError};
use crate::runtime::{default_spawner, Spawn};

/// Assembles a [`TaskTimer`].
///
/// Without further input the timer runs [`crate::core::CronEngine`]s whose
/// jobs are dispatched on the default spawner.
///
/// ```rust,ignore
/// let timer = TimerBuilder::new()
///     .config(TimerConfig::from_env()?)
///     .spawner(Arc::new(ThreadSpawner))
///     .build()?;
/// ```
#[derive(Default)]
pub struct TimerBuilder {
    config: TimerConfig,
    spawner: Option<Arc<dyn Spawn>>,
    factory: Option<Arc<dyn EngineFactory>>,
}

impl TimerBuilder {
    /// Builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` instead of the defaults.
    #[must_use]
    pub fn config(mut self, config: TimerConfig) -> Self {
        self.config = config;
        self
    }

    /// Dispatch job runs on `spawner`. Ignored when an engine factory is set.
    #[must_use]
    pub fn spawner(mut self, spawner: Arc<dyn Spawn>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Create engines with `factory` instead of the built-in cron engine.
    #[must_use]
    pub fn engine_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Validate the configuration and start the timer.
    ///
    /// # Errors
    ///
    /// - `TimerError::InvalidConfig` when validation fails.
    /// - `TimerError::Spawn` when the job runtime or the reaper thread
    ///   cannot start.
    pub fn build(self) -> Result<TaskTimer, TimerError> {
        self.config.validate().map_err(TimerError::InvalidConfig)?;

        let factory = match self.factory {
            Some(factory) => factory,
            None => {
                let spawner = match self.spawner {
                    Some(spawner) => spawner,
                    None => default_spawner(self.config.worker_threads)?,
                };
                Arc::new(CronEngineFactory::new(spawner))
            }
        };
        TaskTimer::from_parts(self.config, factory)
    }
}
