//! Wall-clock deadline enforcement
//!
//! A [`DeadlineWatcher`] is a one-shot watchdog armed for the duration of a
//! single `execute()` call. It parks a named thread on a channel with a
//! timeout: if the timeout elapses first it release-stores the stop flag,
//! which the interpreter acquire-loads once per dispatch; if the watcher is
//! dropped first, the closed channel wakes the thread and it exits without
//! touching the flag.
//!
//! Dropping the watcher joins the thread, so no thread outlives the
//! `execute()` call that armed it. A fire that races the drop is harmless;
//! the flag is edge-triggered once and nobody reads it afterwards.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// One-shot watchdog that trips a stop flag after a fixed wall-clock delay
#[derive(Debug)]
pub struct DeadlineWatcher {
    expired: Arc<AtomicBool>,
    cancel: Option<mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl DeadlineWatcher {
    /// Spawn the watchdog thread. `limit` must be nonzero; a zero limit
    /// means "unlimited" and callers skip arming entirely.
    pub fn arm(limit: Duration) -> io::Result<Self> {
        let expired = Arc::new(AtomicBool::new(false));
        let (cancel, cancelled) = mpsc::channel::<()>();

        let flag = Arc::clone(&expired);
        let thread = thread::Builder::new()
            .name("sandvm-deadline".to_string())
            .spawn(move || {
                if cancelled.recv_timeout(limit) == Err(mpsc::RecvTimeoutError::Timeout) {
                    flag.store(true, Ordering::Release);
                }
            })?;

        Ok(Self {
            expired,
            cancel: Some(cancel),
            thread: Some(thread),
        })
    }

    /// The flag the interpreter samples before each dispatch
    pub fn stop_flag(&self) -> &AtomicBool {
        &self.expired
    }

    /// Whether the deadline has already fired
    pub fn expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }

    fn disarm(&mut self) {
        // Dropping the sender wakes recv_timeout with Disconnected.
        self.cancel.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for DeadlineWatcher {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_fires_after_limit() {
        let watcher = DeadlineWatcher::arm(Duration::from_millis(5)).unwrap();
        assert!(!watcher.expired());

        let start = Instant::now();
        while !watcher.expired() {
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "watcher never fired"
            );
            thread::yield_now();
        }
    }

    #[test]
    fn test_disarm_before_fire_leaves_flag_clear() {
        let watcher = DeadlineWatcher::arm(Duration::from_secs(3600)).unwrap();
        let flag = Arc::clone(&watcher.expired);
        drop(watcher);
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn test_drop_joins_the_thread() {
        // Dropping must return promptly even with a long limit; a hang here
        // means disarm failed to wake the watchdog.
        let watcher = DeadlineWatcher::arm(Duration::from_secs(3600)).unwrap();
        let start = Instant::now();
        drop(watcher);
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn test_drop_after_fire_is_harmless() {
        let watcher = DeadlineWatcher::arm(Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(watcher.expired());
        drop(watcher);
    }
}
