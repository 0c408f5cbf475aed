use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::BreakerConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerPolicy {
    pub failure_threshold: u32,
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,
}

impl BreakerPolicy {
    pub fn from_config(config: &BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            backoff_multiplier: if config.backoff_multiplier.is_finite() {
                config.backoff_multiplier.max(1.0)
            } else {
                1.0
            },
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    pub fn next_backoff(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self::from_config(&BreakerConfig::default())
    }
}

/// Breaker state. Transitions are pure and take the current instant explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed { failures: u32 },
    Open { until: Instant, backoff: Duration },
    HalfOpen { backoff: Duration },
}

impl BreakerState {
    pub fn closed() -> Self {
        BreakerState::Closed { failures: 0 }
    }

    pub fn poll(self, now: Instant) -> Self {
        match self {
            BreakerState::Open { until, backoff } if now >= until => {
                BreakerState::HalfOpen { backoff }
            }
            other => other,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, BreakerState::Open { .. })
    }

    pub fn on_success(self) -> Self {
        BreakerState::closed()
    }

    pub fn on_failure(self, now: Instant, policy: &BreakerPolicy) -> Self {
        match self {
            BreakerState::Closed { failures } => {
                let failures = failures + 1;
                if failures >= policy.failure_threshold {
                    BreakerState::Open {
                        until: now + policy.initial_backoff,
                        backoff: policy.initial_backoff,
                    }
                } else {
                    BreakerState::Closed { failures }
                }
            }
            BreakerState::HalfOpen { backoff } => {
                let backoff = policy.next_backoff(backoff);
                BreakerState::Open {
                    until: now + backoff,
                    backoff,
                }
            }
            // Late failure from a call that started before the breaker opened.
            open @ BreakerState::Open { .. } => open,
        }
    }
}

#[derive(Clone)]
pub struct CircuitBreaker {
    state: Arc<Mutex<BreakerState>>,
    policy: BreakerPolicy,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(policy: BreakerPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(BreakerState::closed())),
            policy,
            clock,
        }
    }

    pub fn state(&self) -> BreakerState {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let next = state.poll(now);
        if next != *state {
            info!("circuit breaker half-open; next call will probe");
            *state = next;
        }
        next
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    pub fn consecutive_failures(&self) -> u32 {
        match self.state() {
            BreakerState::Closed { failures } => failures,
            _ => self.policy.failure_threshold,
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*state, BreakerState::Closed { failures: 0 }) {
            info!("circuit breaker closed");
        }
        *state = state.on_success();
    }

    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let before = state.poll(now);
        let after = before.on_failure(now, &self.policy);
        if let (false, BreakerState::Open { backoff, .. }) = (before.is_open(), after) {
            warn!(backoff_ms = backoff.as_millis() as u64, "circuit breaker opened");
        }
        *state = after;
    }
}
