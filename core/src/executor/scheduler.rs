use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};

use super::scope::CancellationScope;
use super::traits::{OutputRendererPlugin, RenderEvent};
use super::types::{Task, TaskResult};
use super::worker::Worker;

/// One worker's hand-off to the aggregator.
#[derive(Debug)]
pub struct Completion {
    pub result: TaskResult,
    /// The scope had already canceled when the result was handed off.
    pub late: bool,
}

/// Counters shared between the dispatcher and its workers.
#[derive(Debug, Default)]
pub struct PoolStats {
    dispatched: AtomicUsize,
    in_flight: AtomicUsize,
    finished: AtomicUsize,
    skipped: AtomicUsize,
}

impl PoolStats {
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::Acquire)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::Acquire)
    }

    /// Tasks never handed to a worker because the scope canceled first.
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Acquire)
    }
}

/// Fans tasks out to a bounded set of workers.
///
/// Every dispatched task holds one semaphore permit and one clone of the
/// completion sender for its whole lifetime. The completion channel is sized
/// to the batch, so a worker never blocks handing off its result, and it
/// closes once the dispatcher and all workers have dropped their senders.
pub struct Dispatcher {
    worker: Arc<Worker>,
    max_concurrency: usize,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    run_id: String,
    stats: Arc<PoolStats>,
}

impl Dispatcher {
    pub fn new(worker: Arc<Worker>, max_concurrency: usize) -> Self {
        Self {
            worker,
            max_concurrency: max_concurrency.max(1),
            renderer: None,
            run_id: String::new(),
            stats: Arc::new(PoolStats::default()),
        }
    }

    pub fn with_renderer(
        mut self,
        run_id: impl Into<String>,
        renderer: Option<Arc<dyn OutputRendererPlugin>>,
    ) -> Self {
        self.run_id = run_id.into();
        self.renderer = renderer;
        self
    }

    pub fn stats(&self) -> Arc<PoolStats> {
        self.stats.clone()
    }

    /// Spawn the dispatch loop and return the completion channel.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(self, tasks: Vec<Task>) -> mpsc::Receiver<Completion> {
        let (tx, rx) = mpsc::channel(tasks.len().max(1));
        tokio::spawn(self.dispatch_loop(tasks, tx));
        rx
    }

    async fn dispatch_loop(self, tasks: Vec<Task>, tx: mpsc::Sender<Completion>) {
        let sem = Arc::new(Semaphore::new(self.max_concurrency));
        let scope = self.worker.scope().clone();
        let total = tasks.len();

        for (idx, task) in tasks.into_iter().enumerate() {
            if scope.is_canceled() {
                self.skip_rest(total - idx);
                break;
            }

            let permit = tokio::select! {
                biased;
                _ = scope.cancelled() => {
                    self.skip_rest(total - idx);
                    break;
                }
                permit = sem.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => {
                        tracing::error!(target: "fanout.pool", "semaphore closed unexpectedly");
                        self.skip_rest(total - idx);
                        break;
                    }
                },
            };

            self.stats.dispatched.fetch_add(1, Ordering::AcqRel);
            self.stats.in_flight.fetch_add(1, Ordering::AcqRel);
            let guard = CompletionGuard {
                tx: tx.clone(),
                scope: scope.clone(),
                stats: self.stats.clone(),
                _permit: permit,
            };

            if let Some(renderer) = &self.renderer {
                renderer.render(&RenderEvent::TaskStart {
                    run_id: self.run_id.clone(),
                    task_id: task.id.clone(),
                    target: task.target.clone(),
                });
            }

            let worker = self.worker.clone();
            tokio::spawn(async move {
                let result = worker.attempt(&task).await;
                guard.complete(result);
            });
        }

        tracing::debug!(
            target: "fanout.pool",
            dispatched = self.stats.dispatched(),
            skipped = self.stats.skipped(),
            "dispatch loop finished"
        );
    }

    fn skip_rest(&self, remaining: usize) {
        self.stats.skipped.fetch_add(remaining, Ordering::AcqRel);
        tracing::info!(
            target: "fanout.pool",
            remaining,
            "scope canceled, stopped dispatching"
        );
    }
}

/// Released exactly once per dispatched task, however the worker exits.
///
/// Dropping it returns the pool slot, decrements the in-flight count and
/// drops this worker's completion sender.
struct CompletionGuard {
    tx: mpsc::Sender<Completion>,
    scope: Arc<CancellationScope>,
    stats: Arc<PoolStats>,
    _permit: OwnedSemaphorePermit,
}

impl CompletionGuard {
    fn complete(self, result: TaskResult) {
        let late = self.scope.is_canceled();
        // Capacity equals batch size and each task sends once, so this never
        // sees `Full`; `Closed` means the aggregator already returned.
        if let Err(err) = self.tx.try_send(Completion { result, late }) {
            tracing::debug!(target: "fanout.pool", error = %err, "result dropped after aggregation ended");
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.stats.finished.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::traits::TaskWork;
    use crate::executor::types::{CancellationMode, WorkError};
    use async_trait::async_trait;
    use std::time::Duration;

    struct PeakWork {
        delay: Duration,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TaskWork for PeakWork {
        fn name(&self) -> &str {
            "peak"
        }

        async fn execute(&self, _task: &Task, _budget: Option<Duration>) -> Result<String, WorkError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok("done".into())
        }
    }

    fn peak_work(delay_ms: u64) -> Arc<PeakWork> {
        Arc::new(PeakWork {
            delay: Duration::from_millis(delay_ms),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_pool_respects_bound_and_closes_channel() {
        let work = peak_work(20);
        let scope = Arc::new(CancellationScope::with_timeout(Duration::from_secs(10)));
        let worker = Arc::new(Worker::new(scope, work.clone(), CancellationMode::Cooperative));
        let dispatcher = Dispatcher::new(worker, 2);
        let stats = dispatcher.stats();

        let tasks = Task::numbered((0..6).map(|i| format!("t{i}")));
        let mut rx = dispatcher.dispatch(tasks);

        let mut received = 0;
        while let Some(completion) = rx.recv().await {
            assert!(!completion.late);
            received += 1;
        }

        assert_eq!(received, 6);
        assert_eq!(work.peak.load(Ordering::SeqCst), 2);
        assert_eq!(stats.dispatched(), 6);
        assert_eq!(stats.finished(), 6);
        assert_eq!(stats.in_flight(), 0);
        assert_eq!(stats.skipped(), 0);
    }

    #[tokio::test]
    async fn test_canceled_scope_dispatches_nothing() {
        let scope = Arc::new(CancellationScope::with_timeout(Duration::ZERO));
        let worker = Arc::new(Worker::new(scope, peak_work(1), CancellationMode::Cooperative));
        let dispatcher = Dispatcher::new(worker, 4);
        let stats = dispatcher.stats();

        let mut rx = dispatcher.dispatch(Task::numbered(["a", "b", "c"]));
        assert!(rx.recv().await.is_none());
        assert_eq!(stats.dispatched(), 0);
        assert_eq!(stats.skipped(), 3);
    }

    #[tokio::test]
    async fn test_queued_tasks_are_skipped_after_cancel() {
        let scope = Arc::new(CancellationScope::with_timeout(Duration::from_millis(40)));
        let worker = Arc::new(Worker::new(scope, peak_work(100), CancellationMode::Cooperative));
        let dispatcher = Dispatcher::new(worker, 1);
        let stats = dispatcher.stats();

        let mut rx = dispatcher.dispatch(Task::numbered(["a", "b", "c"]));
        let mut received = Vec::new();
        while let Some(completion) = rx.recv().await {
            received.push(completion.result.task_id);
        }

        assert_eq!(received, ["1"]);
        assert_eq!(stats.dispatched(), 1);
        assert_eq!(stats.skipped(), 2);
    }

    #[tokio::test]
    async fn test_result_handed_off_after_deadline_is_late() {
        let scope = Arc::new(CancellationScope::with_timeout(Duration::from_millis(20)));
        let worker = Arc::new(Worker::new(scope, peak_work(80), CancellationMode::Cooperative));

        let mut rx = Dispatcher::new(worker, 1).dispatch(Task::numbered(["a"]));
        let completion = rx.recv().await.expect("cooperative work still reports");

        assert!(completion.late);
        assert_eq!(completion.result.task_id, "1");
        assert!(rx.recv().await.is_none());
    }
}
