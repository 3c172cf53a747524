use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::types::{BatchSummary, TaskResult, TaskStatus};

/// Visual progress monitor for task execution
///
/// Provides real-time progress bars for overall execution and individual tasks
pub struct ProgressMonitor {
    /// Multi-progress container
    multi: MultiProgress,
    /// Overall progress bar
    overall: ProgressBar,
    /// Per-task progress spinners
    task_bars: HashMap<String, ProgressBar>,
    /// Whether monitoring is enabled
    enabled: bool,
}

impl ProgressMonitor {
    /// Create a new progress monitor
    ///
    /// # Arguments
    ///
    /// * `total_tasks` - Total number of tasks to execute
    /// * `enabled` - Whether to enable visual progress (disabled for jsonl output)
    pub fn new(total_tasks: usize, enabled: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                task_bars: HashMap::new(),
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_tasks as u64));

        overall.set_style(
            ProgressStyle::default_bar()
                .template(
                    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tasks ({percent}%) {msg}",
                )
                .unwrap()
                .progress_chars("█▓▒░  "),
        );

        overall.set_message("Fetching...");

        Self {
            multi,
            overall,
            task_bars: HashMap::new(),
            enabled: true,
        }
    }

    /// Add a task and create its progress spinner
    pub fn add_task(&mut self, task_id: &str) {
        if !self.enabled {
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.green} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.set_message(format!("⏳ {}", task_id));
        bar.enable_steady_tick(Duration::from_millis(100));

        self.task_bars.insert(task_id.to_string(), bar);
    }

    /// Mark a task as completed
    pub fn complete_task(&mut self, result: &TaskResult) {
        if !self.enabled {
            return;
        }

        if let Some(bar) = self.task_bars.remove(&result.task_id) {
            let icon = match result.status {
                TaskStatus::Success => "✅",
                TaskStatus::Failed => "❌",
                TaskStatus::Canceled => "⛔",
            };
            bar.finish_with_message(format!(
                "{} {} ({}ms)",
                icon,
                result.task_id,
                result.duration_ms()
            ));
        }

        self.overall.inc(1);
    }

    /// Update overall progress message
    pub fn set_message(&self, msg: &str) {
        if self.enabled {
            self.overall.set_message(msg.to_string());
        }
    }

    /// Finish overall progress
    pub fn finish(&self, summary: &BatchSummary) {
        if !self.enabled {
            return;
        }

        let msg = if !summary.completed {
            format!("⏱ Timed out ({} of {} tasks)", summary.results.len(), summary.total_tasks)
        } else if summary.failed() > 0 {
            format!("❌ {} task(s) failed", summary.failed())
        } else {
            "✅ All tasks completed".to_string()
        };

        self.overall.finish_with_message(msg);
    }

}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        // Ensure all spinners are cleaned up
        for (_, bar) in self.task_bars.drain() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(completed: bool) -> BatchSummary {
        BatchSummary {
            run_id: "run".to_string(),
            total_tasks: 2,
            results: HashMap::new(),
            arrival_order: Vec::new(),
            completed,
            cancel_cause: None,
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_progress_monitor_disabled() {
        let mut monitor = ProgressMonitor::new(3, false);

        // Should not panic when disabled
        monitor.add_task("task1");
        monitor.complete_task(&TaskResult::success("task1", "200 OK".into(), Duration::from_millis(100)));
        monitor.set_message("test");
        monitor.finish(&summary(true));
    }

    #[test]
    fn test_progress_monitor_enabled() {
        let mut monitor = ProgressMonitor::new(2, true);

        monitor.add_task("task1");
        monitor.add_task("task2");

        monitor.complete_task(&TaskResult::success("task1", "200 OK".into(), Duration::from_millis(100)));
        monitor.complete_task(&TaskResult::canceled_before_start("task2"));

        monitor.finish(&summary(false));
    }
}
