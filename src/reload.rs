// src/reload.rs

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// One-shot deadline after which the kiosk starts over from scratch.
#[derive(Debug, Clone, Copy)]
pub struct ReloadTimer {
    interval: Duration,
    deadline: Instant,
}

impl ReloadTimer {
    pub fn arm(interval: Duration) -> Self {
        Self {
            interval,
            deadline: Instant::now() + interval,
        }
    }

    /// Start a fresh interval from `now`.
    pub fn rearm(&mut self, now: Instant) {
        self.deadline = now + self.interval;
    }

    /// Completes at the deadline.
    pub async fn fired(&self) {
        sleep_until(self.deadline).await
    }
}
