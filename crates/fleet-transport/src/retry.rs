use std::{fmt::Display, future::Future, time::Duration};

use tracing::{info, warn};

/// Connection attempts made before giving up.
pub const DEFAULT_ATTEMPTS: u32 = 10;

/// Pause between two connection attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// Bounded retry schedule for broker connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Run `op` until it succeeds or `attempts` tries have failed, sleeping `delay`
    /// between tries. The last error is returned. Zero attempts still tries once.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(what, attempt, "connected after retrying");
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= attempts => {
                    warn!(what, attempt, error = %e, "giving up");
                    return Err(e);
                }
                Err(e) => {
                    warn!(what, attempt, attempts, error = %e, "attempt failed, retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
