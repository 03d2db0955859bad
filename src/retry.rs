/// Retry Policy Module
///
/// Re-invokes a failed operation a bounded number of times with a fixed
/// delay, surfacing the final failure untouched. Every failure is treated
/// as retryable; there is no jitter, backoff or error classification, which
/// means a malformed query is retried as uselessly as a dropped link. That
/// is a documented limitation of this layer, not an oversight callers may
/// rely on being fixed silently.
///
/// Compose the policy above `ConnectionScope` so every attempt gets a fresh
/// connection rather than a reused, possibly broken one.

use crate::core::Result;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Bounded fixed-delay retry for fallible operations.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing `retries` additional attempts with `delay`
    /// between them. Total attempts = `retries + 1`.
    pub fn new(retries: u32, delay: Duration) -> Self {
        RetryPolicy { retries, delay }
    }

    /// Maximum additional attempts after the first.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay between attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Invokes `op` until it succeeds or attempts are exhausted.
    ///
    /// # Errors
    ///
    /// Returns the error from the last attempt, verbatim.
    pub fn run<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        "Attempt {}/{} failed, retrying in {:?}: {}",
                        attempt,
                        self.retries + 1,
                        self.delay,
                        e
                    );
                    thread::sleep(self.delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
