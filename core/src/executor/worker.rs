use std::sync::Arc;
use std::time::Instant;

use super::scope::{CancelCause, CancellationScope};
use super::traits::TaskWork;
use super::types::{duration_millis, CancellationMode, Task, TaskResult};

/// Executes exactly one attempt of a task against the shared scope.
///
/// Never fails: transport errors and cancellation are folded into the
/// returned [`TaskResult`].
pub struct Worker {
    scope: Arc<CancellationScope>,
    work: Arc<dyn TaskWork>,
    mode: CancellationMode,
}

impl Worker {
    pub fn new(
        scope: Arc<CancellationScope>,
        work: Arc<dyn TaskWork>,
        mode: CancellationMode,
    ) -> Self {
        Self { scope, work, mode }
    }

    pub fn scope(&self) -> &Arc<CancellationScope> {
        &self.scope
    }

    #[tracing::instrument(
        name = "worker.attempt",
        skip(self, task),
        fields(task_id = %task.id, work = self.work.name())
    )]
    pub async fn attempt(&self, task: &Task) -> TaskResult {
        if self.scope.is_canceled() {
            tracing::debug!(target: "fanout.worker", "scope canceled before start");
            return TaskResult::canceled_before_start(task.id.clone());
        }

        let start = Instant::now();
        let outcome = match self.mode {
            CancellationMode::Cooperative => Some(self.work.execute(task, None).await),
            CancellationMode::Hardened => {
                let budget = Some(self.scope.remaining());
                tokio::select! {
                    biased;
                    res = self.work.execute(task, budget) => Some(res),
                    _ = self.scope.cancelled() => None,
                }
            }
        };
        let duration = start.elapsed();

        match outcome {
            Some(Ok(payload)) => {
                tracing::debug!(
                    target: "fanout.worker",
                    duration_ms = duration_millis(duration),
                    payload = %payload,
                    "task succeeded"
                );
                TaskResult::success(task.id.clone(), payload, duration)
            }
            Some(Err(err)) => {
                tracing::warn!(
                    target: "fanout.worker",
                    duration_ms = duration_millis(duration),
                    error = %err,
                    "task failed"
                );
                TaskResult::failed(task.id.clone(), err.to_string(), duration)
            }
            None => {
                let cause = self.scope.cause().unwrap_or(CancelCause::Canceled);
                tracing::debug!(target: "fanout.worker", cause = %cause, "aborted in flight");
                TaskResult::canceled_in_flight(task.id.clone(), cause, duration)
            }
        }
    }
}
