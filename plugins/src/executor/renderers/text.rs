use fanout_core::api::{duration_millis, OutputRendererPlugin, RenderEvent, TaskStatus};

pub struct TextRendererPlugin {
    ascii_only: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn status_label(&self, status: TaskStatus) -> &'static str {
        match (status, self.ascii_only) {
            (TaskStatus::Success, true) => "OK",
            (TaskStatus::Success, false) => "✅ SUCCESS",
            (TaskStatus::Failed, true) => "FAIL",
            (TaskStatus::Failed, false) => "❌ FAILED",
            (TaskStatus::Canceled, true) => "CANCEL",
            (TaskStatus::Canceled, false) => "⛔ CANCELED",
        }
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::RunStart {
                run_id,
                total_tasks,
                max_concurrency,
                timeout_ms,
            } => format!(
                "RUN START {} (tasks: {}, parallel: {}, timeout {}ms)",
                run_id, total_tasks, max_concurrency, timeout_ms
            ),
            RenderEvent::TaskStart {
                run_id,
                task_id,
                target,
            } => format!("TASK START {} (task {}, {})", run_id, task_id, target),
            RenderEvent::TaskComplete { run_id, result } => {
                let detail = match (&result.payload, &result.error) {
                    (Some(payload), _) => payload.clone(),
                    (None, Some(err)) => err.clone(),
                    (None, None) => String::new(),
                };
                format!(
                    "TASK END {} (task {}, status {}, duration {}ms) {}",
                    run_id,
                    result.task_id,
                    self.status_label(result.status),
                    result.duration_ms(),
                    detail
                )
                .trim_end()
                .to_string()
            }
            RenderEvent::RunEnd { run_id, summary } => {
                let state = if summary.completed {
                    "completed".to_string()
                } else {
                    match summary.cancel_cause {
                        Some(cause) => format!("cut short: {cause}"),
                        None => "incomplete".to_string(),
                    }
                };
                format!(
                    "RUN END {} ({}, ok {}, failed {}, canceled {}, missing {}, duration {}ms)",
                    run_id,
                    state,
                    summary.succeeded(),
                    summary.failed(),
                    summary.canceled(),
                    summary.missing(),
                    duration_millis(summary.elapsed)
                )
            }
        }
    }
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        println!("{}", self.format_event(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_core::api::{BatchSummary, CancelCause, TaskResult};
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_text_renderer_task_complete() {
        let renderer = TextRendererPlugin::new(true);
        let event = RenderEvent::TaskComplete {
            run_id: "run".to_string(),
            result: TaskResult::success("1", "200 OK".into(), Duration::from_millis(5)),
        };

        let line = renderer.format_event(&event);
        assert!(line.contains("TASK END"));
        assert!(line.contains("status OK"));
        assert!(line.ends_with("200 OK"));
    }

    #[test]
    fn test_text_renderer_canceled_shows_error() {
        let renderer = TextRendererPlugin::new(true);
        let event = RenderEvent::TaskComplete {
            run_id: "run".to_string(),
            result: TaskResult::canceled_before_start("2"),
        };

        let line = renderer.format_event(&event);
        assert!(line.contains("status CANCEL"));
        assert!(line.contains("scope canceled before start"));
    }

    #[test]
    fn test_text_renderer_run_end_cut_short() {
        let renderer = TextRendererPlugin::new(false);
        let event = RenderEvent::RunEnd {
            run_id: "run".to_string(),
            summary: BatchSummary {
                run_id: "run".to_string(),
                total_tasks: 3,
                results: HashMap::new(),
                arrival_order: Vec::new(),
                completed: false,
                cancel_cause: Some(CancelCause::DeadlineExceeded),
                elapsed: Duration::from_millis(500),
            },
        };

        let line = renderer.format_event(&event);
        assert!(line.contains("cut short: deadline exceeded"));
        assert!(line.contains("missing 3"));
    }
}
