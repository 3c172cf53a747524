use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::ExecutorError;

use super::progress::ProgressMonitor;
use super::scheduler::{Completion, Dispatcher};
use super::scope::{CancelCause, CancellationScope};
use super::traits::{
    ConcurrencyContext, ConcurrencyStrategyPlugin, OutputRendererPlugin, RenderEvent, TaskWork,
};
use super::types::{
    duration_millis, validate_tasks, BatchSummary, ExecutionOpts, Task, TaskResult, TaskStatus,
};
use super::worker::Worker;

struct SystemInfoCache {
    sys: sysinfo::System,
    cpu_count: usize,
    last_refresh: Option<Instant>,
    cached_cpu_usage: f32,
    cached_memory_usage: f32,
}

impl SystemInfoCache {
    fn new() -> Self {
        Self {
            sys: sysinfo::System::new(),
            cpu_count: num_cpus::get().max(1),
            last_refresh: None,
            cached_cpu_usage: 0.0,
            cached_memory_usage: 0.0,
        }
    }

    fn get(&mut self) -> (usize, f32, f32) {
        let stale = self
            .last_refresh
            .map(|t| t.elapsed() > Duration::from_secs(1))
            .unwrap_or(true);
        if stale {
            self.sys.refresh_cpu();
            self.sys.refresh_memory();
            let cpus = self.sys.cpus();
            if !cpus.is_empty() {
                self.cached_cpu_usage =
                    cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len() as f32;
            }
            let total_memory = self.sys.total_memory().max(1);
            self.cached_memory_usage =
                (self.sys.used_memory() as f32 / total_memory as f32) * 100.0;
            self.last_refresh = Some(Instant::now());
        }
        (
            self.cpu_count,
            self.cached_cpu_usage,
            self.cached_memory_usage,
        )
    }
}

/// Drives whole batches: owns the work, renderer and pool shaping, and builds
/// a fresh scope, completion channel and counters for every run, so several
/// batches can run concurrently on one orchestrator.
pub struct Orchestrator {
    work: Arc<dyn TaskWork>,
    opts: ExecutionOpts,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    concurrency_strategy: Option<Arc<dyn ConcurrencyStrategyPlugin>>,
    sys_cache: Mutex<SystemInfoCache>,
}

pub struct OrchestratorBuilder {
    work: Arc<dyn TaskWork>,
    opts: ExecutionOpts,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    concurrency_strategy: Option<Arc<dyn ConcurrencyStrategyPlugin>>,
}

impl Orchestrator {
    pub fn new(work: Arc<dyn TaskWork>, opts: ExecutionOpts) -> Self {
        Self::builder(work).opts(opts).build()
    }

    pub fn builder(work: Arc<dyn TaskWork>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(work)
    }

    pub fn opts(&self) -> &ExecutionOpts {
        &self.opts
    }

    /// Run a batch under a fresh scope whose deadline is `now + timeout`.
    pub async fn run(
        &self,
        tasks: Vec<Task>,
        timeout: Duration,
    ) -> Result<BatchSummary, ExecutorError> {
        let scope = Arc::new(CancellationScope::with_timeout(timeout));
        self.run_with_scope(tasks, scope).await
    }

    /// Run a batch under a caller-held scope, which may be canceled externally.
    ///
    /// Only input contract violations return `Err`; every other outcome,
    /// including total failure or timeout, is reported in the summary.
    #[tracing::instrument(name = "orchestrator.run", skip_all, fields(tasks = tasks.len()))]
    pub async fn run_with_scope(
        &self,
        tasks: Vec<Task>,
        scope: Arc<CancellationScope>,
    ) -> Result<BatchSummary, ExecutorError> {
        validate_tasks(&tasks)?;

        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let total_tasks = tasks.len();
        let max_concurrency = self.effective_concurrency(total_tasks);

        self.render(&RenderEvent::RunStart {
            run_id: run_id.clone(),
            total_tasks,
            max_concurrency,
            timeout_ms: duration_millis(scope.remaining()),
        });
        tracing::info!(
            target: "fanout.executor",
            run_id = %run_id,
            total_tasks,
            max_concurrency,
            mode = ?self.opts.cancellation,
            "batch started"
        );

        let mut progress = ProgressMonitor::new(total_tasks, self.opts.progress_bar);
        for task in &tasks {
            progress.add_task(&task.id);
        }

        let mut aggregator = Aggregator::new(run_id.clone(), total_tasks);

        let finished = if total_tasks == 0 {
            true
        } else {
            let worker = Arc::new(Worker::new(
                scope.clone(),
                self.work.clone(),
                self.opts.cancellation,
            ));
            let dispatcher = Dispatcher::new(worker, max_concurrency)
                .with_renderer(run_id.clone(), self.renderer.clone());
            let stats = dispatcher.stats();
            let mut rx = dispatcher.dispatch(tasks);

            let finished = loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Some(completion) => self.accept(&mut aggregator, &mut progress, completion),
                        None => break true,
                    },
                    _ = scope.cancelled() => break false,
                }
            };

            if !finished {
                // Keep whatever already arrived; anything still in flight is abandoned.
                while let Ok(completion) = rx.try_recv() {
                    self.accept(&mut aggregator, &mut progress, completion);
                }
                tracing::warn!(
                    target: "fanout.executor",
                    run_id = %run_id,
                    received = aggregator.len(),
                    in_flight = stats.in_flight(),
                    skipped = stats.skipped(),
                    cause = ?scope.cause(),
                    "batch cut short"
                );
            }
            finished
        };

        let summary = aggregator.finish(finished, scope.cause(), started.elapsed());

        progress.finish(&summary);
        tracing::info!(
            target: "fanout.executor",
            run_id = %summary.run_id,
            completed = summary.completed,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            canceled = summary.canceled(),
            missing = summary.missing(),
            elapsed_ms = duration_millis(summary.elapsed),
            "batch finished"
        );
        self.render(&RenderEvent::RunEnd {
            run_id,
            summary: summary.clone(),
        });

        Ok(summary)
    }

    fn accept(
        &self,
        aggregator: &mut Aggregator,
        progress: &mut ProgressMonitor,
        completion: Completion,
    ) {
        let Completion { result, late } = completion;
        progress.complete_task(&result);
        if let Some(renderer) = &self.renderer {
            renderer.render(&RenderEvent::TaskComplete {
                run_id: aggregator.run_id.clone(),
                result: result.clone(),
            });
        }
        aggregator.record(result, late);
    }

    fn effective_concurrency(&self, total_tasks: usize) -> usize {
        let base = self.opts.max_concurrency.unwrap_or(total_tasks).max(1);
        let shaped = match &self.concurrency_strategy {
            Some(strategy) => {
                let (available_cpus, cpu_usage, memory_usage) = match self.sys_cache.lock() {
                    Ok(mut cache) => cache.get(),
                    Err(_) => (num_cpus::get().max(1), 0.0, 0.0),
                };
                let context = ConcurrencyContext {
                    cpu_usage,
                    available_cpus,
                    memory_usage,
                    total_tasks,
                    base_concurrency: base,
                };
                let n = strategy.calculate_concurrency(&context);
                tracing::debug!(
                    target: "fanout.executor",
                    strategy = strategy.name(),
                    base,
                    shaped = n,
                    "concurrency strategy applied"
                );
                n
            }
            None => base,
        };
        shaped.clamp(1, total_tasks.max(1))
    }

    fn render(&self, event: &RenderEvent) {
        if let Some(renderer) = &self.renderer {
            renderer.render(event);
        }
    }
}

impl OrchestratorBuilder {
    pub fn new(work: Arc<dyn TaskWork>) -> Self {
        Self {
            work,
            opts: ExecutionOpts::default(),
            renderer: None,
            concurrency_strategy: None,
        }
    }

    pub fn opts(mut self, opts: ExecutionOpts) -> Self {
        self.opts = opts;
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn concurrency_strategy(mut self, strategy: Arc<dyn ConcurrencyStrategyPlugin>) -> Self {
        self.concurrency_strategy = Some(strategy);
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            work: self.work,
            opts: self.opts,
            renderer: self.renderer,
            concurrency_strategy: self.concurrency_strategy,
            sys_cache: Mutex::new(SystemInfoCache::new()),
        }
    }
}

/// Collects results as they arrive, keyed by task id.
struct Aggregator {
    run_id: String,
    total_tasks: usize,
    results: HashMap<String, TaskResult>,
    arrival_order: Vec<String>,
    late: usize,
}

impl Aggregator {
    fn new(run_id: String, total_tasks: usize) -> Self {
        Self {
            run_id,
            total_tasks,
            results: HashMap::with_capacity(total_tasks),
            arrival_order: Vec::with_capacity(total_tasks),
            late: 0,
        }
    }

    fn len(&self) -> usize {
        self.results.len()
    }

    fn record(&mut self, result: TaskResult, late: bool) {
        if self.results.contains_key(&result.task_id) {
            tracing::error!(
                target: "fanout.executor",
                task_id = %result.task_id,
                "second result for task ignored"
            );
            return;
        }
        if late {
            tracing::warn!(
                target: "fanout.executor",
                task_id = %result.task_id,
                "result handed off after the scope canceled"
            );
            self.late += 1;
        }
        self.arrival_order.push(result.task_id.clone());
        self.results.insert(result.task_id.clone(), result);
    }

    fn finish(
        self,
        finished: bool,
        cancel_cause: Option<CancelCause>,
        elapsed: Duration,
    ) -> BatchSummary {
        let completed = finished
            && self.late == 0
            && self.results.len() == self.total_tasks
            && self
                .results
                .values()
                .all(|r| r.status != TaskStatus::Canceled);

        BatchSummary {
            run_id: self.run_id,
            total_tasks: self.total_tasks,
            results: self.results,
            arrival_order: self.arrival_order,
            completed,
            cancel_cause: if completed { None } else { cancel_cause },
            elapsed,
        }
    }
}

/// Run `tasks` with `work` under a `timeout` deadline using default options
/// (one worker per task, cooperative cancellation, no renderer).
pub async fn run(
    tasks: Vec<Task>,
    timeout: Duration,
    work: Arc<dyn TaskWork>,
) -> Result<BatchSummary, ExecutorError> {
    Orchestrator::new(work, ExecutionOpts::default())
        .run(tasks, timeout)
        .await
}
