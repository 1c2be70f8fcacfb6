//! Retry strategies for attaching to a client that may still be starting up.

use std::time::Duration;

/// Delays between attach attempts, doubling each time
pub const ATTACH_RETRY_DELAYS_MS: [u64; 4] = [250, 500, 1000, 2000];

pub trait RetryStrategy {
    /// Total number of attempts, including the first one.
    fn max_attempts(&self) -> u32;

    /// Delay after the given failed attempt (0-indexed).
    fn delay_for_attempt(&self, attempt: u32) -> Option<Duration>;

    /// Call `f` until it succeeds or `max_attempts()` calls have failed.
    ///
    /// The error of the last attempt is returned.
    fn execute<T, E, F>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
    {
        let max = self.max_attempts().max(1);
        let mut attempt = 0;
        loop {
            match f(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 >= max => return Err(e),
                Err(_) => {
                    if let Some(delay) = self.delay_for_attempt(attempt) {
                        std::thread::sleep(delay);
                    }
                }
            }
            attempt += 1;
        }
    }
}

/// Doubling delays from [`ATTACH_RETRY_DELAYS_MS`].
#[derive(Debug, Clone, Default)]
pub struct ExponentialBackoff;

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn max_attempts(&self) -> u32 {
        ATTACH_RETRY_DELAYS_MS.len() as u32 + 1
    }

    fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        ATTACH_RETRY_DELAYS_MS
            .get(attempt as usize)
            .map(|&ms| Duration::from_millis(ms))
    }
}

/// Constant delay between attempts.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    max_attempts: u32,
    delay: Duration,
}

impl FixedDelay {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl RetryStrategy for FixedDelay {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay_for_attempt(&self, _attempt: u32) -> Option<Duration> {
        Some(self.delay)
    }
}
