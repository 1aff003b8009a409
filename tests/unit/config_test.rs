//! Tests for configuration loading and validation

use cron_pool::config::timer::ENV_PREFIX;
use cron_pool::TimerConfig;
use std::time::Duration;

#[test]
fn test_partial_json_uses_defaults() {
    let cfg = TimerConfig::from_json_str(r#"{ "busy_threshold": 5, "once_grace_ms": 100 }"#).unwrap();
    assert_eq!(cfg.busy_threshold, 5);
    assert_eq!(cfg.once_grace(), Duration::from_millis(100));
    assert_eq!(cfg.reap_interval(), Duration::from_secs(3600));
    assert_eq!(cfg.idle_threshold(), Duration::from_secs(2 * 3600));
}

#[test]
fn test_json_validation_failure() {
    let err = TimerConfig::from_json_str(r#"{ "reap_interval_ms": 0 }"#).unwrap_err();
    assert!(err.contains("reap_interval_ms"));
}

#[test]
fn test_json_parse_failure() {
    let err = TimerConfig::from_json_str("{ busy_threshold: }").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_json_round_trip() {
    let cfg = TimerConfig::default().with_busy_threshold(7);
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(TimerConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_lookup_uses_prefix() {
    let cfg = TimerConfig::from_lookup(|key| {
        (key == format!("{ENV_PREFIX}IDLE_THRESHOLD_MS")).then(|| "1000".to_owned())
    })
    .unwrap();
    assert_eq!(cfg.idle_threshold(), Duration::from_secs(1));
}

#[test]
fn test_zero_worker_threads_invalid() {
    assert!(TimerConfig::default().with_worker_threads(0).validate().is_err());
}
