use crate::result::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry schedule for flaky network calls: a fixed number of attempts
/// with a pause that doubles after every failure.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    attempts: u32,
    first_delay: Duration,
}

impl Backoff {
    pub fn new(attempts: u32, first_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            first_delay,
        }
    }

    /// Drives `op` until it succeeds or the schedule runs out, in which
    /// case the last error comes back.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.first_delay;
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.attempts => return Err(err),
                Err(err) => {
                    warn!(%err, attempt, delay_ms = delay.as_millis() as u64, "attempt failed, pausing before the next one");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }
}
