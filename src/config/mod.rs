//! Configuration models for the timer and its background reaper.

pub mod timer;

pub use timer::TimerConfig;
