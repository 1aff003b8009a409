//! Engine instance pool and the allocation algorithm.
//!
//! Two core instances with default options are created up front and live
//! until shutdown. Everything else is a dynamic instance created on demand,
//! either as default-option overflow or for a specific option set, and is
//! subject to idle reclamation.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::core::engine::EngineFactory;
use crate::core::instance::{EngineInstance, InstanceInfo, InstanceStatus};
use crate::core::option::OptionSet;
use crate::core::TimerError;

/// Number of permanently retained default-option instances.
pub const CORE_INSTANCES: usize = 2;

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PoolStats {
    /// Core instances (always [`CORE_INSTANCES`]).
    pub core_instances: usize,
    /// Dynamic instances currently held.
    pub dynamic_instances: usize,
    /// Instances in `Busy` state, core and dynamic.
    pub busy_instances: usize,
    /// Jobs registered across all instances.
    pub jobs: usize,
}

/// Owner of every engine instance.
pub struct InstancePool {
    core: Vec<Arc<EngineInstance>>,
    dynamic: Vec<Arc<EngineInstance>>,
    factory: Arc<dyn EngineFactory>,
}

impl InstancePool {
    /// Create the pool and start its core instances.
    ///
    /// # Errors
    ///
    /// Fails if a core engine cannot be started.
    pub fn new(factory: Arc<dyn EngineFactory>) -> Result<Self, TimerError> {
        let mut pool = Self {
            core: Vec::with_capacity(CORE_INSTANCES),
            dynamic: Vec::new(),
            factory,
        };
        for _ in 0..CORE_INSTANCES {
            let inst = pool.spawn_instance(OptionSet::default_config())?;
            pool.core.push(inst);
        }
        Ok(pool)
    }

    /// Pick or create an instance for a task requesting `options`.
    ///
    /// # Errors
    ///
    /// Fails only when a new instance is needed and its engine cannot start.
    pub fn allocate(&mut self, options: &OptionSet) -> Result<Arc<EngineInstance>, TimerError> {
        let found = if options.is_default() {
            self.core
                .iter()
                .find(|inst| inst.is_idle())
                .or_else(|| {
                    self.dynamic
                        .iter()
                        .find(|inst| inst.is_idle() && inst.options().is_default())
                })
        } else {
            self.dynamic.iter().find(|inst| {
                inst.is_idle()
                    && !inst.options().is_default()
                    && inst.options().len() == options.len()
                    && inst.options() == options
            })
        };

        if let Some(inst) = found {
            inst.touch();
            return Ok(Arc::clone(inst));
        }

        let inst = self.spawn_instance(options.clone())?;
        self.dynamic.push(Arc::clone(&inst));
        info!(
            instance = %inst.id(),
            options = %options,
            dynamic = self.dynamic.len(),
            "dynamic engine instance created"
        );
        Ok(inst)
    }

    fn spawn_instance(&self, options: OptionSet) -> Result<Arc<EngineInstance>, TimerError> {
        let engine = self.factory.create(&options);
        Ok(Arc::new(EngineInstance::start(engine, options)?))
    }

    /// Stop and drop dynamic instances that hold no jobs and have been unused
    /// for longer than `idle_threshold`. Returns how many were reclaimed.
    pub fn sweep_idle(&mut self, idle_threshold: Duration) -> usize {
        let before = self.dynamic.len();
        self.dynamic.retain(|inst| {
            let reclaim = inst.is_empty() && inst.idle_for() > idle_threshold;
            if reclaim {
                inst.stop();
                info!(instance = %inst.id(), options = %inst.options(), "idle engine instance reclaimed");
            }
            !reclaim
        });
        before - self.dynamic.len()
    }

    /// Stop every instance and drop the dynamic ones.
    pub fn shutdown(&mut self) {
        for inst in self.core.iter().chain(self.dynamic.iter()) {
            inst.stop();
        }
        self.dynamic.clear();
    }

    /// Core instances in allocation order.
    pub fn core(&self) -> &[Arc<EngineInstance>] {
        &self.core
    }

    /// Dynamic instances in creation order.
    pub fn dynamic(&self) -> &[Arc<EngineInstance>] {
        &self.dynamic
    }

    /// Per-instance snapshot, core instances first.
    pub fn instances(&self) -> Vec<InstanceInfo> {
        self.core
            .iter()
            .map(|inst| inst.info(true))
            .chain(self.dynamic.iter().map(|inst| inst.info(false)))
            .collect()
    }

    /// Occupancy snapshot.
    pub fn stats(&self) -> PoolStats {
        let all = || self.core.iter().chain(self.dynamic.iter());
        PoolStats {
            core_instances: self.core.len(),
            dynamic_instances: self.dynamic.len(),
            busy_instances: all()
                .filter(|inst| inst.status() == InstanceStatus::Busy)
                .count(),
            jobs: all().map(|inst| inst.job_count()).sum(),
        }
    }
}
