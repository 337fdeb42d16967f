//! Reconnect policies — when to retry a dropped or failed connection.
//!
//! DESIGN
//! ======
//! The policy is injected into the connection manager rather than baked into
//! the transport, so the bounded-attempts/fixed-delay behavior is a value
//! that can be tested and tuned on its own. Exhausting the budget ends the
//! retry loop silently; there is no terminal "gave up" event.

#[cfg(test)]
#[path = "backoff_test.rs"]
mod backoff_test;

use std::time::Duration;

use rand::Rng;

/// Decides the pause before reconnect attempt `attempt` (1-based).
/// `None` stops retrying.
pub trait ReconnectPolicy: Send + Sync {
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Bounded attempts at a fixed delay. The default mirrors the production
/// gateway settings: five attempts, one second apart.
#[derive(Clone, Copy, Debug)]
pub struct FixedDelay {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl FixedDelay {
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}

impl ReconnectPolicy for FixedDelay {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt <= self.max_attempts).then_some(self.delay)
    }
}

/// Doubling delay with a cap and random jitter. Jitter keeps a fleet of
/// kiosks that lost the same gateway from reconnecting in lockstep.
#[derive(Clone, Copy, Debug)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
    pub jitter: bool,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            cap: Duration::from_secs(10),
            max_attempts: 10,
            jitter: true,
        }
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }

        let exponent = attempt.saturating_sub(1).min(16);
        let base = self
            .initial
            .saturating_mul(2_u32.saturating_pow(exponent))
            .min(self.cap);
        if !self.jitter {
            return Some(base);
        }

        // Uniform in [base/2, base].
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let half_ms = base_ms / 2;
        let jitter_ms = rand::rng().random_range(0..=half_ms);
        Some(Duration::from_millis(half_ms + jitter_ms))
    }
}
