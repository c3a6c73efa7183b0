//! Run control: shared cancel token and cancellable sleeps.
//!
//! The CLI sets the token from its Ctrl-C handler. Fetch workers check it
//! before taking the next page, and every backoff or pacing sleep goes through
//! a [`Sleeper`] so it can be interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Error returned when a run is stopped by the user (interrupt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("run aborted by user")]
pub struct RunAborted;

/// Shared abort flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(RunAborted)` once cancelled.
    pub fn check(&self) -> Result<(), RunAborted> {
        if self.is_cancelled() {
            Err(RunAborted)
        } else {
            Ok(())
        }
    }
}

/// Suspends the calling thread. Implementations must return early with
/// `Err(RunAborted)` once `cancel` is set.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<(), RunAborted>;
}

/// Real sleeper: sleeps in short slices so cancellation is noticed promptly.
#[derive(Debug, Clone, Copy)]
pub struct ThreadSleeper {
    slice: Duration,
}

impl Default for ThreadSleeper {
    fn default() -> Self {
        Self {
            slice: Duration::from_millis(200),
        }
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<(), RunAborted> {
        let deadline = Instant::now() + duration;
        loop {
            cancel.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(self.slice.min(deadline - now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_clones_share_state() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(a.check().is_ok());
        b.cancel();
        assert!(a.is_cancelled());
        assert_eq!(a.check(), Err(RunAborted));
    }

    #[test]
    fn thread_sleeper_returns_early_when_cancelled() {
        let token = CancelToken::new();
        let t2 = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            t2.cancel();
        });
        let start = Instant::now();
        let res = ThreadSleeper::default().sleep(Duration::from_secs(30), &token);
        handle.join().unwrap();
        assert_eq!(res, Err(RunAborted));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn thread_sleeper_completes_short_sleep() {
        let token = CancelToken::new();
        assert!(ThreadSleeper::default()
            .sleep(Duration::from_millis(10), &token)
            .is_ok());
    }
}
