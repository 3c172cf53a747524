use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::executor::scope::CancelCause;

/// Error text recorded when a worker finds its scope canceled before starting.
pub const CANCELED_BEFORE_START: &str = "scope canceled before start";

/// Outcome class of one attempt. Failures are data, never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Failed,
    Canceled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of executing a single task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task identifier
    pub task_id: String,

    pub status: TaskStatus,

    /// Response descriptor on success (e.g. an HTTP status line)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,

    /// Present iff `status != Success`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock time of the work call only, excluding queueing
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
}

impl TaskResult {
    pub fn success(task_id: impl Into<String>, payload: String, duration: Duration) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Success,
            payload: Some(payload),
            error: None,
            duration,
        }
    }

    pub fn failed(task_id: impl Into<String>, error: String, duration: Duration) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Failed,
            payload: None,
            error: Some(error),
            duration,
        }
    }

    pub fn canceled_before_start(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Canceled,
            payload: None,
            error: Some(CANCELED_BEFORE_START.to_string()),
            duration: Duration::ZERO,
        }
    }

    pub fn canceled_in_flight(
        task_id: impl Into<String>,
        cause: CancelCause,
        duration: Duration,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Canceled,
            payload: None,
            error: Some(format!("canceled in flight: {cause}")),
            duration,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        duration_millis(self.duration)
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Final aggregated outcome of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: String,

    /// Number of tasks submitted to the run
    pub total_tasks: usize,

    /// One entry per task that reached completion, keyed by task id
    pub results: HashMap<String, TaskResult>,

    /// Task ids in the order their results arrived (completion order)
    pub arrival_order: Vec<String>,

    /// True iff every submitted task produced a result before the scope canceled
    pub completed: bool,

    /// Why the batch was cut short, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_cause: Option<CancelCause>,

    #[serde(rename = "elapsed_ms", with = "duration_ms")]
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn get(&self, task_id: &str) -> Option<&TaskResult> {
        self.results.get(task_id)
    }

    pub fn succeeded(&self) -> usize {
        self.count(TaskStatus::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(TaskStatus::Failed)
    }

    pub fn canceled(&self) -> usize {
        self.count(TaskStatus::Canceled)
    }

    /// Tasks that produced no result at all (never dispatched or still in flight).
    pub fn missing(&self) -> usize {
        self.total_tasks.saturating_sub(self.results.len())
    }

    /// Results in arrival order.
    pub fn iter_arrivals(&self) -> impl Iterator<Item = &TaskResult> {
        self.arrival_order
            .iter()
            .filter_map(|id| self.results.get(id))
    }

    fn count(&self, status: TaskStatus) -> usize {
        self.results.values().filter(|r| r.status == status).count()
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(super::duration_millis(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
