// ABOUTME: Failure taxonomy and retry decision logic
// ABOUTME: Maps skill errors to classifications carrying default retry policy

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::capability::SkillError;

/// Category of a task failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    Network,
    Timeout,
    RateLimit,
    Auth,
    Validation,
    Resource,
    Logic,
    External,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Per-category retry defaults attached to a classified failure.
#[derive(Debug, Clone, Copy)]
pub struct ErrorClassification {
    pub kind: FailureKind,
    pub severity: Severity,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl ErrorClassification {
    fn new(kind: FailureKind, severity: Severity, max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            kind,
            severity,
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// Auth and validation failures are never retried regardless of budget.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind, FailureKind::Auth | FailureKind::Validation)
    }
}

/// Classifies a skill error into the engine's failure taxonomy.
///
/// Unrecognized errors default to a low-severity, single-retry classification.
pub fn classify(error: &SkillError) -> ErrorClassification {
    match error {
        SkillError::Network(_) => {
            ErrorClassification::new(FailureKind::Network, Severity::Medium, 3, 1_000)
        }
        SkillError::Timeout(_) => {
            ErrorClassification::new(FailureKind::Timeout, Severity::Medium, 3, 2_000)
        }
        SkillError::RateLimited(_) => {
            ErrorClassification::new(FailureKind::RateLimit, Severity::Low, 5, 5_000)
        }
        SkillError::Auth(_) => {
            ErrorClassification::new(FailureKind::Auth, Severity::Critical, 0, 0)
        }
        SkillError::Validation(_) => {
            ErrorClassification::new(FailureKind::Validation, Severity::High, 0, 0)
        }
        SkillError::ResourceExhausted(_) => {
            ErrorClassification::new(FailureKind::Resource, Severity::High, 2, 10_000)
        }
        SkillError::Logic(_) => {
            ErrorClassification::new(FailureKind::Logic, Severity::High, 1, 1_000)
        }
        SkillError::ExternalDependency(_) => {
            ErrorClassification::new(FailureKind::External, Severity::Medium, 3, 2_000)
        }
        SkillError::Other(_) => {
            ErrorClassification::new(FailureKind::Unknown, Severity::Low, 1, 1_000)
        }
    }
}

/// Retry decision for a failed attempt.
///
/// `attempt` is 1-indexed (the attempt that just failed). The effective budget
/// is the smaller of the task's configured budget and the classification's
/// default; an open circuit breaker vetoes any remaining budget.
pub fn should_retry(
    classification: &ErrorClassification,
    attempt: u32,
    task_max_retries: u32,
    breaker_open: bool,
) -> bool {
    if breaker_open {
        return false;
    }
    if !classification.is_retryable() {
        return false;
    }
    attempt <= task_max_retries.min(classification.max_retries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_is_retryable() {
        let class = classify(&SkillError::Network("connection reset".into()));
        assert_eq!(class.kind, FailureKind::Network);
        assert!(class.is_retryable());
        assert_eq!(class.max_retries, 3);
    }

    #[test]
    fn test_auth_and_validation_never_retry() {
        let auth = classify(&SkillError::Auth("bad token".into()));
        let validation = classify(&SkillError::Validation("missing field".into()));

        assert!(!auth.is_retryable());
        assert!(!validation.is_retryable());
        // Even with a generous task budget the decision is no.
        assert!(!should_retry(&auth, 1, 10, false));
        assert!(!should_retry(&validation, 1, 10, false));
    }

    #[test]
    fn test_unknown_error_gets_single_retry() {
        let class = classify(&SkillError::Other("mystery".into()));
        assert_eq!(class.kind, FailureKind::Unknown);
        assert_eq!(class.severity, Severity::Low);
        assert_eq!(class.max_retries, 1);
    }

    #[test]
    fn test_budget_exhaustion() {
        let class = classify(&SkillError::Network("flaky".into()));

        assert!(should_retry(&class, 1, 2, false));
        assert!(should_retry(&class, 2, 2, false));
        assert!(!should_retry(&class, 3, 2, false));
    }

    #[test]
    fn test_classification_caps_task_budget() {
        // Network defaults to 3; a task asking for 10 still stops at 3.
        let class = classify(&SkillError::Network("flaky".into()));
        assert!(should_retry(&class, 3, 10, false));
        assert!(!should_retry(&class, 4, 10, false));
    }

    #[test]
    fn test_open_breaker_vetoes_retry() {
        let class = classify(&SkillError::Network("flaky".into()));
        assert!(!should_retry(&class, 1, 5, true));
    }

    #[test]
    fn test_rate_limit_backs_off_longest() {
        let class = classify(&SkillError::RateLimited("429".into()));
        assert_eq!(class.base_delay, Duration::from_secs(5));
        assert_eq!(class.max_retries, 5);
    }
}
