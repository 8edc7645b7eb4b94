// ABOUTME: Error types for the task execution engine
// ABOUTME: Defines submission validation and scheduling failure variants

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Duplicate task id in submission: {task_id}")]
    DuplicateTaskId { task_id: String },

    #[error("Task '{task_id}' depends on unknown task '{dependency}'")]
    UnknownDependency { task_id: String, dependency: String },

    #[error("Circular dependency detected involving task '{task_id}'")]
    CircularDependency { task_id: String },

    #[error("No worker pool configured for category {category}")]
    PoolNotConfigured { category: String },

    #[error("Worker pool closed while acquiring a slot")]
    PoolClosed,
}

pub type Result<T> = std::result::Result<T, EngineError>;
