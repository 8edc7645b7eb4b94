// ABOUTME: Dependency leveling and submission validation
// ABOUTME: Computes ordered execution groups via memoized level recursion with cycle detection

use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::error::{EngineError, Result};
use super::task::ExecutionTask;

/// One dependency level: tasks that are mutually independent and must wait
/// for every lower level to reach a terminal state.
#[derive(Debug, Clone)]
pub struct ExecutionGroup {
    pub level: usize,
    pub tasks: Vec<ExecutionTask>,
}

enum Visit {
    InProgress,
    Done(usize),
}

/// Splits a submission into ordered execution groups.
///
/// level(t) = 0 when t has no dependencies, else 1 + max(level(dep)).
/// Duplicate ids, references to ids outside the submission, and cycles all
/// reject the whole submission before anything runs.
pub fn build_execution_groups(tasks: Vec<ExecutionTask>) -> Result<Vec<ExecutionGroup>> {
    let mut deps_by_id: HashMap<&str, &HashSet<String>> = HashMap::new();
    for task in &tasks {
        if deps_by_id.insert(&task.id, &task.dependencies).is_some() {
            return Err(EngineError::DuplicateTaskId {
                task_id: task.id.clone(),
            });
        }
    }

    for task in &tasks {
        for dep in &task.dependencies {
            if !deps_by_id.contains_key(dep.as_str()) {
                return Err(EngineError::UnknownDependency {
                    task_id: task.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    let mut memo: HashMap<&str, Visit> = HashMap::new();
    let mut levels: HashMap<String, usize> = HashMap::new();
    for task in &tasks {
        let level = level_of(&task.id, &deps_by_id, &mut memo)?;
        levels.insert(task.id.clone(), level);
    }

    let depth = levels.values().copied().max().map_or(0, |max| max + 1);
    let mut groups: Vec<ExecutionGroup> = (0..depth)
        .map(|level| ExecutionGroup {
            level,
            tasks: Vec::new(),
        })
        .collect();

    for task in tasks {
        let level = levels[&task.id];
        groups[level].tasks.push(task);
    }

    // Priority is the secondary ordering inside a level.
    for group in &mut groups {
        group.tasks.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    debug!(
        "Leveled submission into {} groups: {:?}",
        groups.len(),
        groups
            .iter()
            .map(|g| g.tasks.len())
            .collect::<Vec<usize>>()
    );

    Ok(groups)
}

/// Memoized level computation. A node revisited while still being computed
/// indicates a cycle.
fn level_of<'a>(
    id: &'a str,
    deps_by_id: &HashMap<&'a str, &'a HashSet<String>>,
    memo: &mut HashMap<&'a str, Visit>,
) -> Result<usize> {
    match memo.get(id) {
        Some(Visit::Done(level)) => return Ok(*level),
        Some(Visit::InProgress) => {
            return Err(EngineError::CircularDependency {
                task_id: id.to_string(),
            })
        }
        None => {}
    }

    memo.insert(id, Visit::InProgress);

    let deps = deps_by_id[id];
    let mut level = 0;
    for dep in deps {
        level = level.max(1 + level_of(dep.as_str(), deps_by_id, memo)?);
    }

    memo.insert(id, Visit::Done(level));
    Ok(level)
}
