//! Task name → hosting instance mapping.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::core::instance::EngineInstance;
use crate::core::job::JobId;

/// Where a named task lives. The instance reference is non-owning; the pool
/// owns every instance.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    /// Hosting instance.
    pub instance: Weak<EngineInstance>,
    /// Id the hosting engine assigned.
    pub job_id: JobId,
}

impl TaskHandle {
    /// Handle for a task registered on `instance`.
    pub fn new(instance: &Arc<EngineInstance>, job_id: JobId) -> Self {
        Self {
            instance: Arc::downgrade(instance),
            job_id,
        }
    }
}

/// Registry of scheduled tasks keyed by unique name.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, TaskHandle>,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of `name`, if registered.
    pub fn get(&self, name: &str) -> Option<&TaskHandle> {
        self.tasks.get(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Record a new task. Callers check for duplicates first.
    pub fn insert(&mut self, name: impl Into<String>, handle: TaskHandle) {
        self.tasks.insert(name.into(), handle);
    }

    /// Drop `name` and return its handle.
    pub fn remove(&mut self, name: &str) -> Option<TaskHandle> {
        self.tasks.remove(name)
    }

    /// Forget every task.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when no task is registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
