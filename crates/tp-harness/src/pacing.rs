use std::time::Duration;

use tracing::trace;

/// Fixed inter-call delay for callers that want to stay under provider rate
/// limits.
///
/// Purely time based: no response-header inspection, no retry-after, no
/// adaptive backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// A pacer whose `wait` returns immediately.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn from_config(timing: &tp_core::config::TimingConfig) -> Self {
        Self::new(timing.rate_limit_delay())
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_disabled(&self) -> bool {
        self.delay.is_zero()
    }

    /// Sleep for the configured delay.
    pub async fn wait(&self) {
        if self.is_disabled() {
            return;
        }
        trace!(delay = ?self.delay, "pacing before next call");
        tokio::time::sleep(self.delay).await;
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
