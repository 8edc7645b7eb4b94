// ABOUTME: Injected execution capability boundary for skill invocations
// ABOUTME: Defines the SkillExecutor trait and the classifiable SkillError type

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// The single operation the engine needs from the outside world.
///
/// The engine has no knowledge of what a skill actually does; callers supply
/// an implementation (an orchestration layer, a test double) at construction
/// time. Implementations must be safe to call concurrently.
#[async_trait]
pub trait SkillExecutor: Send + Sync {
    async fn execute(
        &self,
        skill: &str,
        inputs: &HashMap<String, Value>,
    ) -> std::result::Result<Value, SkillError>;
}

/// Failure reported by a skill invocation.
///
/// Variants map onto the engine's failure taxonomy so retry decisions are
/// data, not control flow. Capabilities that cannot say more than "it broke"
/// should use [`SkillError::Other`], which classifies as a low-severity,
/// single-retry failure.
#[derive(Error, Debug, Clone)]
pub enum SkillError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Execution timeout: {0}")]
    Timeout(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Logic error: {0}")]
    Logic(String),

    #[error("External dependency error: {0}")]
    ExternalDependency(String),

    #[error("Skill error: {0}")]
    Other(String),
}
