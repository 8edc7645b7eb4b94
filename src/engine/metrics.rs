// ABOUTME: Aggregate execution metrics for the engine
// ABOUTME: Lock-free counters with read-only serializable snapshots

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Shared counters updated from every concurrently running task.
///
/// The concurrency gauge moves per attempt; the completed/failed counters
/// move once per task, on its terminal transition.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    total_tasks: AtomicU64,
    completed_tasks: AtomicU64,
    failed_tasks: AtomicU64,
    current_concurrency: AtomicUsize,
    peak_concurrency: AtomicUsize,
    total_execution_ms: AtomicU64,
}

/// Read-only snapshot returned by `TaskEngine::metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct EngineMetrics {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub current_concurrency: usize,
    pub peak_concurrency: usize,
    pub avg_execution_time: Duration,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self, count: u64) {
        self.total_tasks.fetch_add(count, Ordering::SeqCst);
    }

    pub fn attempt_started(&self) {
        let current = self.current_concurrency.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_concurrency.fetch_max(current, Ordering::SeqCst);
    }

    pub fn attempt_finished(&self) {
        self.current_concurrency.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn task_completed(&self, execution_time: Duration) {
        self.completed_tasks.fetch_add(1, Ordering::SeqCst);
        self.total_execution_ms
            .fetch_add(execution_time.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn task_failed(&self) {
        self.failed_tasks.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> EngineMetrics {
        let completed = self.completed_tasks.load(Ordering::SeqCst);
        let total_ms = self.total_execution_ms.load(Ordering::SeqCst);
        let avg_execution_time = if completed > 0 {
            Duration::from_millis(total_ms / completed)
        } else {
            Duration::ZERO
        };

        EngineMetrics {
            total_tasks: self.total_tasks.load(Ordering::SeqCst),
            completed_tasks: completed,
            failed_tasks: self.failed_tasks.load(Ordering::SeqCst),
            current_concurrency: self.current_concurrency.load(Ordering::SeqCst),
            peak_concurrency: self.peak_concurrency.load(Ordering::SeqCst),
            avg_execution_time,
        }
    }
}
