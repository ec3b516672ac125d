//! # Reconnect Backoff
//!
//! Bounded retry schedule for the realtime channel. The supervisor asks the
//! policy for the delay before each attempt and stops once the attempt budget is
//! spent; there is no unbounded retry.

use std::time::Duration;

use crate::shared::config::ReconnectSettings;

/// Backoff strategy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Fixed interval between retries
    Fixed { interval: Duration },
    /// Doubling interval, capped at `max_interval`
    Exponential {
        base_interval: Duration,
        max_interval: Duration,
    },
}

/// Reconnection budget and schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts allowed after a drop or failed open
    pub max_attempts: u32,
    pub strategy: BackoffStrategy,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectSettings::default().into()
    }
}

impl From<ReconnectSettings> for ReconnectPolicy {
    fn from(settings: ReconnectSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            strategy: BackoffStrategy::Exponential {
                base_interval: settings.base_delay(),
                max_interval: settings.max_delay(),
            },
        }
    }
}

impl ReconnectPolicy {
    /// Whether attempt number `attempt` (1-based) is still within budget
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }

    /// Delay before attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match &self.strategy {
            BackoffStrategy::Fixed { interval } => *interval,
            BackoffStrategy::Exponential {
                base_interval,
                max_interval,
            } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base_interval
                    .checked_mul(factor)
                    .unwrap_or(*max_interval)
                    .min(*max_interval)
            }
        }
    }
}
