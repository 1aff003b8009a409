//! Tests for the cron engine through the engine trait

use chrono::Utc;
use cron_pool::core::{CronEngine, OptionSet, ScheduleEngine};
use cron_pool::runtime::ThreadSpawner;
use cron_pool::EngineOption;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn engine(options: &[EngineOption]) -> CronEngine {
    CronEngine::new(OptionSet::from_slice(options), Arc::new(ThreadSpawner))
}

#[test]
fn test_entries_track_add_and_remove() {
    let engine = engine(&[]);
    engine.start().unwrap();
    let a = engine.add_func("@hourly", Box::new(|| {})).unwrap();
    let b = engine.add_func("*/15 * * * *", Box::new(|| {})).unwrap();
    assert_ne!(a, b);
    assert_eq!(engine.entries(), 2);

    engine.remove(a);
    engine.remove(a);
    assert_eq!(engine.entries(), 1);
    assert!(engine.next_run(a).is_none());
    assert!(engine.next_run(b).unwrap() > Utc::now());
    engine.stop();
}

#[test]
fn test_seconds_option_changes_grammar() {
    let plain = engine(&[]);
    let seconds = engine(&[EngineOption::Seconds]);
    assert!(plain.add_func("*/5 * * * * *", Box::new(|| {})).is_err());
    assert!(seconds.add_func("*/5 * * * * *", Box::new(|| {})).is_ok());
    assert!(seconds.add_func("*/5 * * * *", Box::new(|| {})).is_err());
}

#[test]
fn test_stop_halts_triggers() {
    let engine = engine(&[EngineOption::Seconds]);
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    engine
        .add_func(
            "* * * * * *",
            Box::new(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
    engine.start().unwrap();
    engine.start().unwrap();

    let start = Instant::now();
    while count.load(Ordering::SeqCst) == 0 && start.elapsed() < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(20));
    }
    assert!(count.load(Ordering::SeqCst) >= 1);

    engine.stop();
    thread::sleep(Duration::from_millis(50));
    let after = count.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(1500));
    assert_eq!(count.load(Ordering::SeqCst), after);
}
