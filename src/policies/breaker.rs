// ABOUTME: Circuit breakers guarding persistently failing external dependencies
// ABOUTME: Tracks per-dependency-key failure state with open/half-open/closed transitions

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// Breaker state for one dependency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreakerState {
    /// Calls pass through normally.
    Closed,
    /// Calls are rejected immediately until the cool-down elapses.
    Open,
    /// One trial call is allowed; its outcome decides the next state.
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the breaker open.
    pub failure_threshold: u32,
    /// How long the breaker stays open before allowing a trial.
    pub cool_down: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
struct BreakerCore {
    state: BreakerState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    trial_taken: bool,
}

/// Stateful guard against a persistently failing dependency.
///
/// Shared across all concurrently running tasks that target the same
/// dependency key, so the core sits behind a mutex.
pub struct CircuitBreaker {
    config: BreakerConfig,
    core: Mutex<BreakerCore>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            core: Mutex::new(BreakerCore {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                last_failure: None,
                trial_taken: false,
            }),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state_at(Instant::now())
    }

    fn state_at(&self, now: Instant) -> BreakerState {
        let mut core = self.lock();
        self.settle(&mut core, now);
        core.state
    }

    /// Whether a call may proceed right now. An open breaker rejects without
    /// the caller ever invoking the dependency; a half-open breaker admits a
    /// single trial.
    pub fn allow_request(&self) -> bool {
        self.allow_request_at(Instant::now())
    }

    fn allow_request_at(&self, now: Instant) -> bool {
        let mut core = self.lock();
        self.settle(&mut core, now);

        match core.state {
            BreakerState::Closed => true,
            BreakerState::Open => false,
            BreakerState::HalfOpen => {
                if core.trial_taken {
                    false
                } else {
                    core.trial_taken = true;
                    true
                }
            }
        }
    }

    /// Records a successful call; closes the breaker and clears failures.
    pub fn record_success(&self) {
        let mut core = self.lock();
        core.state = BreakerState::Closed;
        core.consecutive_failures = 0;
        core.trial_taken = false;
    }

    /// Hands back a half-open trial that was admitted but never invoked the
    /// dependency, so a later caller can take it.
    pub fn release_trial(&self) {
        let mut core = self.lock();
        if core.state == BreakerState::HalfOpen {
            core.trial_taken = false;
        }
    }

    /// Records a failed call; may trip the breaker open.
    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now())
    }

    fn record_failure_at(&self, now: Instant) {
        let mut core = self.lock();
        core.consecutive_failures += 1;
        core.last_failure = Some(now);

        if core.state == BreakerState::HalfOpen {
            // A failed trial re-opens immediately.
            core.state = BreakerState::Open;
            core.trial_taken = false;
        } else if core.consecutive_failures >= self.config.failure_threshold {
            if core.state != BreakerState::Open {
                warn!(
                    "Circuit breaker tripped after {} consecutive failures",
                    core.consecutive_failures
                );
            }
            core.state = BreakerState::Open;
        }
    }

    /// Open → half-open once the cool-down has elapsed.
    fn settle(&self, core: &mut BreakerCore, now: Instant) {
        if core.state == BreakerState::Open {
            if let Some(last) = core.last_failure {
                if now.duration_since(last) >= self.config.cool_down {
                    core.state = BreakerState::HalfOpen;
                    core.trial_taken = false;
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerCore> {
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Engine-owned registry of breakers, one per dependency key. Breaker state
/// persists across runs on the same engine instance.
pub struct BreakerRegistry {
    config: BreakerConfig,
    breakers: Mutex<HashMap<String, std::sync::Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    pub fn breaker_for(&self, key: &str) -> std::sync::Arc<CircuitBreaker> {
        let mut breakers = self
            .breakers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        breakers
            .entry(key.to_string())
            .or_insert_with(|| std::sync::Arc::new(CircuitBreaker::new(self.config.clone())))
            .clone()
    }

    pub fn states(&self) -> HashMap<String, BreakerState> {
        let breakers = self
            .breakers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        breakers
            .iter()
            .map(|(key, breaker)| (key.clone(), breaker.state()))
            .collect()
    }
}
