// ABOUTME: Core engine driving level-by-level, batch-by-batch concurrent execution
// ABOUTME: Applies pool limits, timeouts, retry policy and circuit breaking per task

use futures::future::join_all;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};

use super::error::Result;
use super::leveler::build_execution_groups;
use super::metrics::{EngineMetrics, MetricsCollector};
use super::pool::{PoolKind, PoolManager, PoolStatus};
use super::task::{ExecutionTask, TaskReport};
use crate::capability::{SkillError, SkillExecutor};
use crate::config::EngineConfig;
use crate::policies::{classify, should_retry, BackoffPolicy, BreakerRegistry, BreakerState};

/// Parallel task execution engine.
///
/// Owns the worker pools, circuit breakers and metrics; the actual work is
/// delegated to the injected [`SkillExecutor`]. Pool throughput counters and
/// breaker state persist across runs on the same instance, everything else is
/// per-submission.
pub struct TaskEngine {
    runtime: Arc<EngineRuntime>,
}

struct EngineRuntime {
    pools: PoolManager,
    executor: Arc<dyn SkillExecutor>,
    breakers: BreakerRegistry,
    metrics: MetricsCollector,
    backoff: BackoffPolicy,
    batch_size: usize,
    default_timeout: std::time::Duration,
}

impl TaskEngine {
    pub fn new(config: EngineConfig, executor: Arc<dyn SkillExecutor>) -> Self {
        let pools = PoolManager::new(
            config.pool_capacities,
            config.skill_bindings,
            config.default_pool,
        );

        Self {
            runtime: Arc::new(EngineRuntime {
                pools,
                executor,
                breakers: BreakerRegistry::new(config.breaker),
                metrics: MetricsCollector::new(),
                backoff: config.backoff,
                batch_size: config.batch_size,
                default_timeout: config.default_timeout,
            }),
        }
    }

    /// Runs a submission to completion and returns one report per task id.
    ///
    /// Levels execute strictly in order; tasks within a level run
    /// concurrently in skill batches. The call fails before anything runs if
    /// the submission has duplicate ids, unknown references or a cycle; in
    /// every other case the returned map is complete, with per-task status
    /// distinguishing success from failure.
    #[instrument(skip(self, tasks), fields(run_id = %uuid::Uuid::new_v4(), task_count = tasks.len()))]
    pub async fn execute_tasks(
        &self,
        tasks: Vec<ExecutionTask>,
    ) -> Result<HashMap<String, TaskReport>> {
        let groups = build_execution_groups(tasks)?;
        let total: usize = groups.iter().map(|g| g.tasks.len()).sum();
        self.runtime.metrics.record_submitted(total as u64);

        info!(
            "Executing submission: {} tasks across {} levels",
            total,
            groups.len()
        );

        let mut reports: HashMap<String, TaskReport> = HashMap::with_capacity(total);

        for group in groups {
            debug!(
                "Starting level {} with {} tasks",
                group.level,
                group.tasks.len()
            );

            let mut runnable = Vec::new();
            for mut task in group.tasks {
                // Fail-fast on upstream failure: dependents of a failed task
                // terminate without invoking the capability.
                let failed_dep = task
                    .dependencies
                    .iter()
                    .find(|dep| reports.get(*dep).is_some_and(|r| !r.is_successful()))
                    .cloned();

                if let Some(dep) = failed_dep {
                    warn!(
                        "Task {} not executed: upstream dependency {} failed",
                        task.id, dep
                    );
                    task.mark_failed(format!("Upstream dependency failed: {dep}"));
                    self.runtime.metrics.task_failed();
                    reports.insert(task.id.clone(), TaskReport::from_task(&task));
                } else {
                    runnable.push(task);
                }
            }

            for report in self.run_level(runnable).await {
                reports.insert(report.task_id.clone(), report);
            }
        }

        info!(
            "Submission complete: {}/{} tasks successful",
            reports.values().filter(|r| r.is_successful()).count(),
            reports.len()
        );

        Ok(reports)
    }

    /// Runs one level. Tasks are grouped by skill; each group's tasks are
    /// chunked into bounded batches that run one after another, so at most
    /// `batch_size` calls are ever in flight against any one dependency.
    /// Batches within a group are dispatched in descending mean-priority
    /// order, and distinct skill groups run concurrently.
    async fn run_level(&self, tasks: Vec<ExecutionTask>) -> Vec<TaskReport> {
        if tasks.is_empty() {
            return Vec::new();
        }

        let mut by_skill: IndexMap<String, Vec<ExecutionTask>> = IndexMap::new();
        for task in tasks {
            by_skill.entry(task.skill.clone()).or_default().push(task);
        }

        let mut group_runs = Vec::new();
        for (skill, skill_tasks) in by_skill {
            let mut batches: Vec<Vec<ExecutionTask>> = Vec::new();
            let mut chunk = Vec::new();
            for task in skill_tasks {
                chunk.push(task);
                if chunk.len() == self.runtime.batch_size {
                    batches.push(std::mem::take(&mut chunk));
                }
            }
            if !chunk.is_empty() {
                batches.push(chunk);
            }

            batches.sort_by(|a, b| {
                mean_priority(b)
                    .partial_cmp(&mean_priority(a))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let runtime = Arc::clone(&self.runtime);
            group_runs.push(async move {
                let mut reports = Vec::new();
                for batch in batches {
                    debug!("Dispatching batch of {} '{}' tasks", batch.len(), skill);

                    let mut handles = Vec::new();
                    for task in batch {
                        let runtime = Arc::clone(&runtime);
                        let task_id = task.id.clone();
                        let handle = tokio::spawn(async move { runtime.run_task(task).await });
                        handles.push((task_id, handle));
                    }

                    let (ids, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
                    let outcomes = join_all(handles).await;

                    for (task_id, outcome) in ids.into_iter().zip(outcomes) {
                        match outcome {
                            Ok(report) => reports.push(report),
                            Err(join_error) => {
                                // A panicking sibling must not take the level down.
                                error!("Task {} join error: {}", task_id, join_error);
                                let mut task = ExecutionTask::new(task_id, skill.clone());
                                task.mark_failed(format!("Join error: {join_error}"));
                                runtime.metrics.task_failed();
                                reports.push(TaskReport::from_task(&task));
                            }
                        }
                    }
                }
                reports
            });
        }

        join_all(group_runs).await.into_iter().flatten().collect()
    }

    /// Aggregate execution metrics. Read-only.
    pub fn metrics(&self) -> EngineMetrics {
        self.runtime.metrics.snapshot()
    }

    /// Per-pool occupancy, utilization and throughput. Read-only.
    pub fn pool_status(&self) -> HashMap<PoolKind, PoolStatus> {
        self.runtime.pools.status()
    }

    /// Current circuit breaker state per dependency key. Read-only.
    pub fn breaker_states(&self) -> HashMap<String, BreakerState> {
        self.runtime.breakers.states()
    }
}

fn mean_priority(batch: &[ExecutionTask]) -> f64 {
    if batch.is_empty() {
        return 0.0;
    }
    batch.iter().map(|t| t.priority as f64).sum::<f64>() / batch.len() as f64
}

impl EngineRuntime {
    /// Drives one task through its full attempt/retry lifecycle.
    async fn run_task(&self, mut task: ExecutionTask) -> TaskReport {
        let pool = match self.pools.pool_for_skill(&task.skill) {
            Ok(pool) => pool,
            Err(e) => {
                task.mark_failed(e.to_string());
                self.metrics.task_failed();
                return TaskReport::from_task(&task);
            }
        };
        task.pool = Some(pool.kind());

        let breaker = self.breakers.breaker_for(&task.skill);
        let deadline = task.timeout.unwrap_or(self.default_timeout);

        loop {
            let attempt = task.retry_count + 1;

            // An open breaker rejects the attempt outright; the capability is
            // never invoked.
            if !breaker.allow_request() {
                warn!(
                    "Task {} rejected: circuit breaker open for '{}'",
                    task.id, task.skill
                );
                task.mark_failed(format!("Circuit breaker open for '{}'", task.skill));
                self.metrics.task_failed();
                break;
            }

            let slot = match Arc::clone(&pool).acquire().await {
                Ok(slot) => slot,
                Err(e) => {
                    // The admitted attempt never reached the dependency, so a
                    // half-open trial must be handed back.
                    breaker.release_trial();
                    task.mark_failed(e.to_string());
                    self.metrics.task_failed();
                    break;
                }
            };

            task.mark_started();
            self.metrics.attempt_started();
            let attempt_clock = Instant::now();

            debug!(
                "Task {} attempt {} on pool {} (skill: {})",
                task.id,
                attempt,
                pool.kind(),
                task.skill
            );

            let outcome = timeout(deadline, self.executor.execute(&task.skill, &task.inputs)).await;

            self.metrics.attempt_finished();
            drop(slot);

            let failure = match outcome {
                Ok(Ok(value)) => {
                    breaker.record_success();
                    task.mark_completed(value);
                    self.metrics.task_completed(attempt_clock.elapsed());
                    debug!("Task {} completed on attempt {}", task.id, attempt);
                    break;
                }
                Ok(Err(skill_error)) => skill_error,
                Err(_) => SkillError::Timeout(format!(
                    "Execution exceeded {:?} on attempt {attempt}",
                    deadline
                )),
            };

            breaker.record_failure();
            let classification = classify(&failure);
            let breaker_open = breaker.state() == BreakerState::Open;
            if should_retry(&classification, attempt, task.max_retries, breaker_open) {
                let delay = self.backoff.delay(classification.base_delay, attempt);
                warn!(
                    "Task {} attempt {} failed ({:?}): retrying in {:?}",
                    task.id, attempt, classification.kind, delay
                );
                task.mark_retrying(failure.to_string());
                sleep(delay).await;
            } else {
                error!(
                    "Task {} failed terminally after {} attempt(s): {}",
                    task.id, attempt, failure
                );
                task.mark_failed(failure.to_string());
                self.metrics.task_failed();
                break;
            }
        }

        TaskReport::from_task(&task)
    }
}
