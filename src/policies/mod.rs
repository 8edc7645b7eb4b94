// ABOUTME: Failure handling policies for the execution engine
// ABOUTME: Groups error classification, retry backoff and circuit breaking

pub mod backoff;
pub mod breaker;
pub mod classify;

pub use backoff::{BackoffPolicy, BackoffStrategy};
pub use breaker::{BreakerConfig, BreakerRegistry, BreakerState, CircuitBreaker};
pub use classify::{classify, should_retry, ErrorClassification, FailureKind, Severity};
