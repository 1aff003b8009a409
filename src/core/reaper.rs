//! Background reclamation of idle dynamic instances.
//!
//! The reaper is a supervised OS thread. Its loop waits on a ticker and on a
//! shutdown channel; a panic inside the loop body is caught, logged and the
//! loop relaunched. Only the shutdown signal ends the thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use tracing::{debug, error, info};

use crate::core::TimerError;
use crate::util::panic_message;

/// Handle to the running reaper thread.
pub struct IdleReaper {
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    restarts: Arc<AtomicU64>,
}

impl IdleReaper {
    /// Spawn the reaper, calling `sweep` once per `interval`.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::Spawn` if the thread cannot be started.
    pub fn spawn<F>(interval: Duration, sweep: F) -> Result<Self, TimerError>
    where
        F: Fn() + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let restarts = Arc::new(AtomicU64::new(0));
        let restarts_in_loop = Arc::clone(&restarts);

        let handle = thread::Builder::new()
            .name("cron-idle-reaper".into())
            .spawn(move || supervise(interval, &shutdown_rx, &sweep, &restarts_in_loop))?;

        debug!(interval_ms = interval.as_millis(), "idle reaper started");
        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            restarts,
        })
    }

    /// How many times the loop was relaunched after a fault.
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }

    /// Signal shutdown and wait for the thread to exit. Idempotent.
    pub fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel, which the loop reads
        // as the shutdown signal.
        drop(self.shutdown_tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("idle reaper thread terminated abnormally");
            }
            info!("idle reaper stopped");
        }
    }
}

impl Drop for IdleReaper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn supervise<F: Fn()>(
    interval: Duration,
    shutdown_rx: &Receiver<()>,
    sweep: &F,
    restarts: &AtomicU64,
) {
    loop {
        let ticker = tick(interval);
        match panic::catch_unwind(AssertUnwindSafe(|| run_loop(&ticker, shutdown_rx, sweep))) {
            Ok(()) => return,
            Err(payload) => {
                let count = restarts.fetch_add(1, Ordering::Relaxed) + 1;
                error!(
                    panic = %panic_message(&*payload),
                    restarts = count,
                    "idle reaper faulted; restarting"
                );
            }
        }
    }
}

fn run_loop<F: Fn()>(ticker: &Receiver<std::time::Instant>, shutdown_rx: &Receiver<()>, sweep: &F) {
    loop {
        select! {
            recv(ticker) -> _ => sweep(),
            recv(shutdown_rx) -> _ => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn wait_until(deadline: Duration, cond: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        cond()
    }

    #[test]
    fn test_sweeps_on_every_tick() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let mut reaper = IdleReaper::spawn(Duration::from_millis(20), move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        assert!(wait_until(Duration::from_secs(5), || count.load(Ordering::SeqCst) >= 3));
        reaper.shutdown();
        let after = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(count.load(Ordering::SeqCst), after);
    }

    #[test]
    fn test_restarts_after_panic() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let mut reaper = IdleReaper::spawn(Duration::from_millis(20), move || {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("sweep fault");
            }
        })
        .unwrap();

        assert!(wait_until(Duration::from_secs(5), || count.load(Ordering::SeqCst) >= 3));
        assert_eq!(reaper.restarts(), 1);
        reaper.shutdown();
    }

    #[test]
    fn test_shutdown_is_prompt_and_idempotent() {
        let mut reaper = IdleReaper::spawn(Duration::from_secs(3600), || {}).unwrap();
        let start = Instant::now();
        reaper.shutdown();
        reaper.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
