use crate::executor::types::{BatchSummary, TaskResult};

/// Output renderer plugin (controls output format)
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Lifecycle events of a batch run, emitted in the order they happen.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        total_tasks: usize,
        max_concurrency: usize,
        timeout_ms: u64,
    },
    TaskStart {
        run_id: String,
        task_id: String,
        target: String,
    },
    TaskComplete {
        run_id: String,
        result: TaskResult,
    },
    RunEnd {
        run_id: String,
        summary: BatchSummary,
    },
}
