//! Training completion polling schedule
//!
//! n 번째 poll 이후 대기 시간은 `min(step * n, max_wait)` 이다.
//! (step 15s, max 600s 기준: 15, 30, 45, ..., 600, 600, ...)

use hotswap_foundation::PollingConfig;
use std::time::Duration;

/// Linearly growing, capped delay sequence
#[derive(Debug, Clone)]
pub struct PollSchedule {
    step: Duration,
    max_wait: Duration,
    wait: Duration,
}

impl PollSchedule {
    pub fn new(step: Duration, max_wait: Duration) -> Self {
        Self {
            step,
            max_wait,
            wait: Duration::ZERO,
        }
    }

    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.step(), config.max_wait())
    }

    /// Delay to sleep after the next unsuccessful poll
    pub fn next_delay(&mut self) -> Duration {
        self.wait = self.wait.saturating_add(self.step);
        self.wait.min(self.max_wait)
    }
}

impl Iterator for PollSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}
