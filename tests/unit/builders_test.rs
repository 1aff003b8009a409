//! Tests for the timer builder

use cron_pool::runtime::{Spawn, ThreadSpawner};
use cron_pool::{TimerBuilder, TimerConfig, TimerError};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_builder_applies_config() {
    let timer = TimerBuilder::new()
        .config(
            TimerConfig::default()
                .with_busy_threshold(2)
                .with_once_grace(Duration::from_millis(10)),
        )
        .spawner(Arc::new(ThreadSpawner) as Arc<dyn Spawn>)
        .build()
        .unwrap();
    assert_eq!(timer.config().busy_threshold, 2);

    for name in ["a", "b", "c"] {
        timer.add_task_by_func(name, "@daily", || {}, &[]).unwrap();
    }
    assert_eq!(timer.task_instance("a"), timer.task_instance("b"));
    assert_ne!(timer.task_instance("a"), timer.task_instance("c"));
}

#[test]
fn test_builder_rejects_invalid_config() {
    let result = TimerBuilder::new()
        .config(TimerConfig::default().with_idle_threshold(Duration::ZERO))
        .build();
    assert!(matches!(result, Err(TimerError::InvalidConfig(_))));
}

#[test]
fn test_with_config_constructor() {
    let timer = cron_pool::TaskTimer::with_config(TimerConfig::default()).unwrap();
    assert_eq!(timer.stats().pool.core_instances, 2);
    assert_eq!(timer.stats().reaper_restarts, 0);
}
