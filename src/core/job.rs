//! Job abstraction and engine-assigned job identifiers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identifier assigned by an engine when a job is registered on it.
///
/// Ids are only unique within the engine that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(u64);

impl JobId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A runnable unit of work triggered by a schedule.
///
/// ```rust,ignore
/// struct Heartbeat;
///
/// impl Job for Heartbeat {
///     fn run(&self) {
///         tracing::info!("beat");
///     }
/// }
/// ```
pub trait Job: Send + Sync + 'static {
    /// Run the job once.
    fn run(&self);
}

/// Adapter turning a closure into a [`Job`].
pub struct FuncJob<F>(pub F);

impl<F> Job for FuncJob<F>
where
    F: Fn() + Send + Sync + 'static,
{
    fn run(&self) {
        (self.0)();
    }
}

impl<J: Job + ?Sized> Job for Arc<J> {
    fn run(&self) {
        (**self).run();
    }
}

impl<J: Job + ?Sized> Job for Box<J> {
    fn run(&self) {
        (**self).run();
    }
}
