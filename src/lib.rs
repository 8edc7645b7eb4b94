// ABOUTME: Main library module for the taskweave execution engine
// ABOUTME: Exports the engine, configuration, policies and capability seam

pub mod capability;
pub mod config;
pub mod engine;
pub mod policies;

// Re-export commonly used types
pub use capability::{SkillError, SkillExecutor};
pub use config::EngineConfig;
pub use engine::{
    EngineError, EngineMetrics, ExecutionTask, PoolKind, PoolStatus, TaskEngine, TaskReport,
    TaskStatus,
};
pub use policies::{
    BackoffPolicy, BackoffStrategy, BreakerConfig, BreakerState, FailureKind, Severity,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
