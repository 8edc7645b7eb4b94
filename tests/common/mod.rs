// ABOUTME: Shared test helpers for engine integration tests
// ABOUTME: Provides a scripted SkillExecutor double with call and concurrency probes

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use taskweave::{SkillError, SkillExecutor};

/// Installs a test subscriber once; later calls are no-ops.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// What the double should do when a given skill is invoked.
#[derive(Clone)]
pub enum Behavior {
    Succeed,
    Fail(SkillError),
    SucceedAfter { failures: u32, error: SkillError },
    Delay(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Enter,
    Exit,
}

/// Scripted execution capability for tests.
///
/// Tasks are identified by a `"task"` entry in their input map when per-task
/// event ordering matters; otherwise the skill name is used. The concurrency
/// gauge counts simultaneous in-flight invocations across all skills.
pub struct ScriptedExecutor {
    behaviors: Mutex<HashMap<String, Behavior>>,
    call_counts: Mutex<HashMap<String, u32>>,
    events: Mutex<Vec<(Phase, String)>>,
    in_flight: AtomicU32,
    peak_in_flight: AtomicU32,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            behaviors: Mutex::new(HashMap::new()),
            call_counts: Mutex::new(HashMap::new()),
            events: Mutex::new(Vec::new()),
            in_flight: AtomicU32::new(0),
            peak_in_flight: AtomicU32::new(0),
        }
    }

    pub fn with_behavior(self, skill: &str, behavior: Behavior) -> Self {
        self.behaviors
            .lock()
            .unwrap()
            .insert(skill.to_string(), behavior);
        self
    }

    pub fn calls(&self, skill: &str) -> u32 {
        self.call_counts
            .lock()
            .unwrap()
            .get(skill)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.call_counts.lock().unwrap().values().sum()
    }

    pub fn peak_in_flight(&self) -> u32 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<(Phase, String)> {
        self.events.lock().unwrap().clone()
    }

    /// Index of the first event matching the phase and marker.
    pub fn event_index(&self, phase: Phase, marker: &str) -> Option<usize> {
        self.events()
            .iter()
            .position(|(p, m)| *p == phase && m == marker)
    }
}

#[async_trait]
impl SkillExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        skill: &str,
        inputs: &HashMap<String, Value>,
    ) -> Result<Value, SkillError> {
        let marker = inputs
            .get("task")
            .and_then(|v| v.as_str())
            .unwrap_or(skill)
            .to_string();

        let count = {
            let mut counts = self.call_counts.lock().unwrap();
            let entry = counts.entry(skill.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        self.events
            .lock()
            .unwrap()
            .push((Phase::Enter, marker.clone()));

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(skill)
            .cloned()
            .unwrap_or(Behavior::Succeed);

        let outcome = match behavior {
            Behavior::Succeed => Ok(json!({ "skill": skill, "task": marker })),
            Behavior::Fail(error) => Err(error),
            Behavior::SucceedAfter { failures, error } => {
                if count <= failures {
                    Err(error)
                } else {
                    Ok(json!({ "skill": skill, "recovered_on": count }))
                }
            }
            Behavior::Delay(duration) => {
                tokio::time::sleep(duration).await;
                Ok(json!({ "skill": skill, "task": marker }))
            }
        };

        self.events.lock().unwrap().push((Phase::Exit, marker));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        outcome
    }
}

/// Inputs carrying a per-task marker for event ordering assertions.
pub fn marked_inputs(task_id: &str) -> HashMap<String, Value> {
    let mut inputs = HashMap::new();
    inputs.insert("task".to_string(), json!(task_id));
    inputs
}
