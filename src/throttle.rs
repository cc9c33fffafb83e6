//! Minimum spacing between outbound requests.

use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// Spaces requests at least `min_interval` apart, plus up to `jitter` of random delay.
///
/// Callers that arrive together are released one at a time.
#[derive(Debug)]
pub struct RequestThrottle {
    min_interval: Duration,
    jitter: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(min_interval: Duration, jitter: Duration) -> Self {
        Self {
            min_interval,
            jitter,
            last_request: Mutex::new(None),
        }
    }

    /// A throttle that never waits.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Wait until the next request slot opens, then claim it.
    pub async fn acquire(&self) {
        let mut last_request = self.last_request.lock().await;

        if let Some(previous) = *last_request {
            let deadline = previous + self.min_interval + self.random_jitter();
            if deadline > Instant::now() {
                sleep_until(deadline).await;
            }
        }

        *last_request = Some(Instant::now());
    }

    fn random_jitter(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}
