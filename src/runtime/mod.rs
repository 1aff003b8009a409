//! Job dispatch adapters.
//!
//! Engines hand every triggered run to a [`Spawn`] implementation so job
//! bodies never execute on the scheduling thread.

pub mod spawn;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_spawner;

pub use spawn::{default_spawner, Spawn, ThreadSpawner};
#[cfg(feature = "tokio-runtime")]
pub use tokio_spawner::TokioSpawner;
