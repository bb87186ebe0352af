use std::time::Duration;

/// Wait policy applied between transport poll passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlePolicy {
    /// Progressively longer pauses while idle, reset on work.
    Backoff,
    /// Never pause; trade a busy core for minimum latency.
    BusySpin,
}

/// Shortest pause the backoff policy applies.
pub const BACKOFF_MIN: Duration = Duration::from_micros(50);
/// Longest pause the backoff policy grows to.
pub const BACKOFF_MAX: Duration = Duration::from_millis(10);

/// Idle strategy driven once per loop iteration with the amount of
/// work that iteration performed.
#[derive(Debug)]
pub struct IdleStrategy {
    policy: IdlePolicy,
    delay: Duration,
}

impl IdleStrategy {
    pub fn new(policy: IdlePolicy) -> Self {
        Self {
            policy,
            delay: BACKOFF_MIN,
        }
    }

    /// Pause according to policy. Any work resets the backoff and
    /// returns immediately so traffic bursts are serviced at full rate.
    pub async fn idle(&mut self, work: usize) {
        if work > 0 {
            self.delay = BACKOFF_MIN;
            return;
        }
        match self.policy {
            IdlePolicy::BusySpin => {
                // Stay runnable, but let other tasks on this worker through.
                tokio::task::yield_now().await;
            }
            IdlePolicy::Backoff => {
                tokio::time::sleep(self.delay).await;
                self.delay = (self.delay * 2).min(BACKOFF_MAX);
            }
        }
    }

    /// Pause the next zero-work iteration would take.
    pub fn current_delay(&self) -> Duration {
        self.delay
    }
}
