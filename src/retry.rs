//! Reconnect policies for the link supervisor
//!
//! When the link drops, the supervisor asks a [`ReconnectPolicy`] how long to
//! wait before issuing the single reconnect attempt for that drop, or whether
//! to give up. The default policy reconnects immediately and never gives up;
//! [`ExponentialBackoff`] spaces attempts out with optional jitter.
//!
//! # Example
//!
//! ```
//! use wifi_dl::config::{ReconnectConfig, ReconnectStrategy};
//! use wifi_dl::retry::policy_from_config;
//! use std::time::Duration;
//!
//! let config = ReconnectConfig {
//!     strategy: ReconnectStrategy::ExponentialBackoff,
//!     max_attempts: Some(3),
//!     initial_delay: Duration::from_millis(100),
//!     jitter: false,
//!     ..Default::default()
//! };
//!
//! let mut policy = policy_from_config(&config);
//! assert_eq!(policy.next_delay(1), Some(Duration::from_millis(100)));
//! assert_eq!(policy.next_delay(2), Some(Duration::from_millis(200)));
//! assert_eq!(policy.next_delay(4), None);
//! ```

use crate::config::{ReconnectConfig, ReconnectStrategy};
use rand::Rng;
use std::time::Duration;

/// Strategy deciding when to reconnect after a drop
///
/// `attempt` counts consecutive drops since the link was last usable, starting at 1.
pub trait ReconnectPolicy: Send {
    /// Delay before reconnecting, or `None` to abandon reconnection
    fn next_delay(&mut self, attempt: u32) -> Option<Duration>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Reconnect with no delay
#[derive(Debug, Clone, Default)]
pub struct ImmediateReconnect {
    max_attempts: Option<u32>,
}

impl ImmediateReconnect {
    /// Unlimited immediate reconnects
    pub fn unlimited() -> Self {
        Self { max_attempts: None }
    }

    /// Immediate reconnects, abandoned after `max_attempts` consecutive drops
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }
}

impl ReconnectPolicy for ImmediateReconnect {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        within_limit(self.max_attempts, attempt).then_some(Duration::ZERO)
    }

    fn name(&self) -> &'static str {
        "immediate"
    }
}

/// Exponential backoff between reconnects
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: ReconnectConfig,
}

impl ExponentialBackoff {
    /// Build from reconnect configuration (the strategy field is ignored)
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config }
    }

    fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.config.initial_delay.as_secs_f64()
            * self.config.backoff_multiplier.powi(exponent);
        let max_secs = self.config.max_delay.as_secs_f64();
        if !secs.is_finite() || secs >= max_secs {
            self.config.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        if !within_limit(self.config.max_attempts, attempt) {
            return None;
        }
        let delay = self.base_delay(attempt);
        Some(if self.config.jitter {
            add_jitter(delay)
        } else {
            delay
        })
    }

    fn name(&self) -> &'static str {
        "exponential_backoff"
    }
}

/// Build the policy selected by configuration
pub fn policy_from_config(config: &ReconnectConfig) -> Box<dyn ReconnectPolicy> {
    match config.strategy {
        ReconnectStrategy::Immediate => Box::new(ImmediateReconnect {
            max_attempts: config.max_attempts,
        }),
        ReconnectStrategy::ExponentialBackoff => Box::new(ExponentialBackoff::new(config.clone())),
    }
}

fn within_limit(max_attempts: Option<u32>, attempt: u32) -> bool {
    max_attempts.is_none_or(|max| attempt <= max)
}

/// Add random jitter to a delay to avoid reconnect storms across devices
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
