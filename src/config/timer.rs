//! Timer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix of the environment variables read by [`TimerConfig::from_env`].
pub const ENV_PREFIX: &str = "CRON_POOL_";

/// Tunables for a [`crate::TaskTimer`].
///
/// Every field has a default, so a partial JSON document is valid input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Job count at which an instance turns busy.
    pub busy_threshold: usize,
    /// Period of the idle reaper, in milliseconds.
    pub reap_interval_ms: u64,
    /// How long an empty dynamic instance may stay unused before it is
    /// reclaimed, in milliseconds.
    pub idle_threshold_ms: u64,
    /// Delay between a once-task finishing and its removal, in milliseconds.
    pub once_grace_ms: u64,
    /// Worker threads of the default job runtime.
    pub worker_threads: usize,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            busy_threshold: 20,
            reap_interval_ms: 60 * 60 * 1000,
            idle_threshold_ms: 2 * 60 * 60 * 1000,
            once_grace_ms: 3000,
            worker_threads: num_cpus::get().clamp(1, 4),
        }
    }
}

impl TimerConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the busy threshold.
    #[must_use]
    pub const fn with_busy_threshold(mut self, threshold: usize) -> Self {
        self.busy_threshold = threshold;
        self
    }

    /// Set the reaper period.
    #[must_use]
    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval_ms = duration_ms(interval);
        self
    }

    /// Set the idle threshold for dynamic instances.
    #[must_use]
    pub fn with_idle_threshold(mut self, threshold: Duration) -> Self {
        self.idle_threshold_ms = duration_ms(threshold);
        self
    }

    /// Set the once-task grace delay.
    #[must_use]
    pub fn with_once_grace(mut self, grace: Duration) -> Self {
        self.once_grace_ms = duration_ms(grace);
        self
    }

    /// Set the job runtime's worker thread count.
    #[must_use]
    pub const fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Reaper period.
    pub const fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }

    /// Idle threshold for dynamic instances.
    pub const fn idle_threshold(&self) -> Duration {
        Duration::from_millis(self.idle_threshold_ms)
    }

    /// Once-task grace delay.
    pub const fn once_grace(&self) -> Duration {
        Duration::from_millis(self.once_grace_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.busy_threshold == 0 {
            return Err("busy_threshold must be greater than 0".into());
        }
        if self.reap_interval_ms == 0 {
            return Err("reap_interval_ms must be greater than 0".into());
        }
        if self.idle_threshold_ms == 0 {
            return Err("idle_threshold_ms must be greater than 0".into());
        }
        if self.worker_threads == 0 {
            return Err("worker_threads must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `.env` (if present) and read `CRON_POOL_*` variables over the
    /// defaults: `BUSY_THRESHOLD`, `REAP_INTERVAL_MS`, `IDLE_THRESHOLD_MS`,
    /// `ONCE_GRACE_MS`, `WORKER_THREADS`.
    ///
    /// # Errors
    ///
    /// Returns the first unparsable variable or validation failure.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is fine; the process environment still applies.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup, using the same
    /// variable names as [`TimerConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns the first unparsable value or validation failure.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let read = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|raw| (key, raw))
        };

        if let Some((key, raw)) = read("BUSY_THRESHOLD") {
            cfg.busy_threshold = parse_var(&key, &raw)?;
        }
        if let Some((key, raw)) = read("REAP_INTERVAL_MS") {
            cfg.reap_interval_ms = parse_var(&key, &raw)?;
        }
        if let Some((key, raw)) = read("IDLE_THRESHOLD_MS") {
            cfg.idle_threshold_ms = parse_var(&key, &raw)?;
        }
        if let Some((key, raw)) = read("ONCE_GRACE_MS") {
            cfg.once_grace_ms = parse_var(&key, &raw)?;
        }
        if let Some((key, raw)) = read("WORKER_THREADS") {
            cfg.worker_threads = parse_var(&key, &raw)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("{key}: cannot parse `{raw}`: {e}"))
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = TimerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.busy_threshold, 20);
        assert_eq!(cfg.reap_interval(), Duration::from_secs(3600));
        assert_eq!(cfg.idle_threshold(), Duration::from_secs(7200));
        assert_eq!(cfg.once_grace(), Duration::from_secs(3));
        assert!((1..=4).contains(&cfg.worker_threads));
    }

    #[test]
    fn test_builder_setters() {
        let cfg = TimerConfig::new()
            .with_busy_threshold(5)
            .with_reap_interval(Duration::from_millis(50))
            .with_idle_threshold(Duration::from_millis(100))
            .with_once_grace(Duration::from_millis(10))
            .with_worker_threads(2);
        assert_eq!(cfg.busy_threshold, 5);
        assert_eq!(cfg.reap_interval_ms, 50);
        assert_eq!(cfg.idle_threshold_ms, 100);
        assert_eq!(cfg.once_grace_ms, 10);
        assert_eq!(cfg.worker_threads, 2);
    }

    #[test]
    fn test_from_lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("CRON_POOL_BUSY_THRESHOLD", "8"),
            ("CRON_POOL_ONCE_GRACE_MS", " 250 "),
        ]
        .into_iter()
        .collect();
        let cfg = TimerConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_owned())).unwrap();
        assert_eq!(cfg.busy_threshold, 8);
        assert_eq!(cfg.once_grace_ms, 250);
        assert_eq!(cfg.reap_interval_ms, TimerConfig::default().reap_interval_ms);
    }

    #[test]
    fn test_from_lookup_reports_bad_value() {
        let err = TimerConfig::from_lookup(|k| {
            (k == "CRON_POOL_WORKER_THREADS").then(|| "many".to_owned())
        })
        .unwrap_err();
        assert!(err.starts_with("CRON_POOL_WORKER_THREADS"));

        let err = TimerConfig::from_lookup(|k| {
            (k == "CRON_POOL_BUSY_THRESHOLD").then(|| "0".to_owned())
        })
        .unwrap_err();
        assert!(err.contains("busy_threshold"));
    }
}
