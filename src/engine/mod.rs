// ABOUTME: Task execution engine module
// ABOUTME: Dependency leveling, worker pools, dispatch loop and metrics

pub mod error;
pub mod executor;
pub mod leveler;
pub mod metrics;
pub mod pool;
pub mod task;

pub use error::{EngineError, Result};
pub use executor::TaskEngine;
pub use leveler::{build_execution_groups, ExecutionGroup};
pub use metrics::{EngineMetrics, MetricsCollector};
pub use pool::{PoolKind, PoolManager, PoolStatus, WorkerPool};
pub use task::{ExecutionTask, TaskReport, TaskStatus};
