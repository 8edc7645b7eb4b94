// ABOUTME: Engine configuration for pools, skill routing and failure policies
// ABOUTME: Fixed for the lifetime of the engine; built with chained setters

use std::collections::HashMap;
use std::time::Duration;

use crate::engine::pool::PoolKind;
use crate::policies::{BackoffPolicy, BreakerConfig};

/// Static configuration handed to `TaskEngine::new`.
///
/// Pool capacities and the skill routing table cannot change once the engine
/// is constructed.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity per pool category.
    pub pool_capacities: HashMap<PoolKind, usize>,
    /// Skill name → pool category. Unlisted skills use `default_pool`.
    pub skill_bindings: HashMap<String, PoolKind>,
    pub default_pool: PoolKind,
    /// Upper bound on same-skill fan-out per dispatch batch.
    pub batch_size: usize,
    pub backoff: BackoffPolicy,
    pub breaker: BreakerConfig,
    /// Applied to tasks submitted without an explicit timeout override.
    pub default_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut pool_capacities = HashMap::new();
        pool_capacities.insert(PoolKind::Compute, 4);
        pool_capacities.insert(PoolKind::Io, 12);
        pool_capacities.insert(PoolKind::RemoteApi, 8);

        Self {
            pool_capacities,
            skill_bindings: HashMap::new(),
            default_pool: PoolKind::Io,
            batch_size: 25,
            backoff: BackoffPolicy::default(),
            breaker: BreakerConfig::default(),
            default_timeout: Duration::from_secs(60),
        }
    }
}

impl EngineConfig {
    pub fn with_pool(mut self, kind: PoolKind, capacity: usize) -> Self {
        self.pool_capacities.insert(kind, capacity);
        self
    }

    pub fn bind_skill(mut self, skill: impl Into<String>, kind: PoolKind) -> Self {
        self.skill_bindings.insert(skill.into(), kind);
        self
    }

    pub fn with_default_pool(mut self, kind: PoolKind) -> Self {
        self.default_pool = kind;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_breaker(mut self, breaker: BreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}
