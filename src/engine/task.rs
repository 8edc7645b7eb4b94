// ABOUTME: Schedulable task model and per-task execution reports
// ABOUTME: Defines ExecutionTask lifecycle states and terminal result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::engine::pool::PoolKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Retrying,
    Completed,
    Failed,
}

/// A single unit of schedulable work.
///
/// Ids must be unique within one submission and dependencies may only
/// reference ids present in the same submission; `execute_tasks` rejects the
/// whole batch otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTask {
    pub id: String,
    pub skill: String,
    pub inputs: HashMap<String, Value>,
    pub priority: u8,
    pub dependencies: HashSet<String>,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Per-attempt deadline; falls back to the engine default when unset.
    pub timeout: Option<Duration>,
    pub status: TaskStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub pool: Option<PoolKind>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionTask {
    pub fn new(id: impl Into<String>, skill: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            skill: skill.into(),
            inputs: HashMap::new(),
            priority: 5,
            dependencies: HashSet::new(),
            retry_count: 0,
            max_retries: 3,
            timeout: None,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            pool: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn with_inputs(mut self, inputs: HashMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Priority is clamped to the 1..=10 range.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 10);
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn mark_started(&mut self) {
        self.status = TaskStatus::Running;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    pub fn mark_retrying(&mut self, error: String) {
        self.status = TaskStatus::Retrying;
        self.retry_count += 1;
        self.error = Some(error);
    }

    pub fn mark_completed(&mut self, result: Value) {
        self.status = TaskStatus::Completed;
        self.finished_at = Some(Utc::now());
        self.result = Some(result);
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = TaskStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn is_successful(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn execution_duration(&self) -> Option<Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }
}

/// Terminal outcome of one task, as returned in the submission result map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub task_id: String,
    pub skill: String,
    pub status: TaskStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub attempts: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
}

impl TaskReport {
    pub fn from_task(task: &ExecutionTask) -> Self {
        Self {
            task_id: task.id.clone(),
            skill: task.skill.clone(),
            status: task.status.clone(),
            result: task.result.clone(),
            error: task.error.clone(),
            attempts: task.retry_count + 1,
            started_at: task.started_at,
            finished_at: task.finished_at,
            duration: task.execution_duration(),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Retrying => write!(f, "retrying"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}
