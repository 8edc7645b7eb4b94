// ABOUTME: Bounded worker pools and the skill-to-pool routing registry
// ABOUTME: Tracks per-pool occupancy and throughput with atomic counters

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use super::error::{EngineError, Result};

/// Resource category a pool bounds concurrency for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolKind {
    /// CPU-bound work (chart building, document assembly).
    Compute,
    /// Local I/O-bound work.
    Io,
    /// Remote-API-bound work (search, model calls).
    RemoteApi,
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolKind::Compute => write!(f, "compute"),
            PoolKind::Io => write!(f, "io"),
            PoolKind::RemoteApi => write!(f, "remote_api"),
        }
    }
}

/// A named concurrency domain with a fixed capacity.
///
/// Occupancy is bounded by a semaphore; `active_workers` never exceeds
/// `max_workers`. Throughput counters persist for the lifetime of the pool.
pub struct WorkerPool {
    kind: PoolKind,
    max_workers: usize,
    semaphore: Arc<Semaphore>,
    active_workers: AtomicUsize,
    total_processed: AtomicU64,
    created_at: Instant,
}

/// RAII slot guard. Occupancy is released on drop, so slots are never leaked
/// regardless of how the task ends.
pub struct PoolSlot {
    pool: Arc<WorkerPool>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for PoolSlot {
    fn drop(&mut self) {
        self.pool.active_workers.fetch_sub(1, Ordering::SeqCst);
        self.pool.total_processed.fetch_add(1, Ordering::SeqCst);
        trace!("Released slot on pool {}", self.pool.kind);
    }
}

impl WorkerPool {
    pub fn new(kind: PoolKind, max_workers: usize) -> Self {
        Self {
            kind,
            max_workers: max_workers.max(1),
            semaphore: Arc::new(Semaphore::new(max_workers.max(1))),
            active_workers: AtomicUsize::new(0),
            total_processed: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    pub fn total_processed(&self) -> u64 {
        self.total_processed.load(Ordering::SeqCst)
    }

    /// Tasks processed per second since the pool was created.
    pub fn throughput(&self) -> f64 {
        let elapsed = self.created_at.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            0.0
        } else {
            self.total_processed() as f64 / elapsed
        }
    }

    /// Suspends the caller until a slot is free.
    pub async fn acquire(self: Arc<Self>) -> Result<PoolSlot> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| EngineError::PoolClosed)?;

        self.active_workers.fetch_add(1, Ordering::SeqCst);
        trace!(
            "Acquired slot on pool {} ({}/{})",
            self.kind,
            self.active_workers(),
            self.max_workers
        );

        Ok(PoolSlot {
            pool: self,
            _permit: permit,
        })
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            kind: self.kind,
            active_workers: self.active_workers(),
            max_workers: self.max_workers,
            utilization: (self.active_workers() as f64 / self.max_workers as f64) * 100.0,
            total_processed: self.total_processed(),
            throughput: self.throughput(),
        }
    }
}

/// Read-only snapshot of one pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub kind: PoolKind,
    pub active_workers: usize,
    pub max_workers: usize,
    pub utilization: f64,
    pub total_processed: u64,
    pub throughput: f64,
}

/// Static registry mapping each skill name to exactly one pool.
///
/// Skills without an explicit binding route to the default category. The
/// routing table is fixed for the lifetime of the engine.
pub struct PoolManager {
    pools: HashMap<PoolKind, Arc<WorkerPool>>,
    skill_bindings: HashMap<String, PoolKind>,
    default_kind: PoolKind,
}

impl PoolManager {
    pub fn new(
        capacities: HashMap<PoolKind, usize>,
        skill_bindings: HashMap<String, PoolKind>,
        default_kind: PoolKind,
    ) -> Self {
        let pools = capacities
            .into_iter()
            .map(|(kind, capacity)| (kind, Arc::new(WorkerPool::new(kind, capacity))))
            .collect();

        Self {
            pools,
            skill_bindings,
            default_kind,
        }
    }

    pub fn kind_for_skill(&self, skill: &str) -> PoolKind {
        self.skill_bindings
            .get(skill)
            .copied()
            .unwrap_or(self.default_kind)
    }

    pub fn pool_for_skill(&self, skill: &str) -> Result<Arc<WorkerPool>> {
        let kind = self.kind_for_skill(skill);
        self.pools
            .get(&kind)
            .cloned()
            .ok_or_else(|| EngineError::PoolNotConfigured {
                category: kind.to_string(),
            })
    }

    pub fn status(&self) -> HashMap<PoolKind, PoolStatus> {
        self.pools
            .iter()
            .map(|(kind, pool)| (*kind, pool.status()))
            .collect()
    }
}
