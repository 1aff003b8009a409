//! Builders to construct a task timer from configuration.

pub mod timer_builder;

pub use timer_builder::TimerBuilder;
