mod common;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::{RecordingRenderer, ScriptedWork};
use fanout_core::api::{
    run, CancelCause, CancellationMode, CancellationScope, ConcurrencyContext,
    ConcurrencyStrategyPlugin, ExecutionOpts, ExecutorError, Orchestrator, Task, TaskStatus,
    TaskWork, WorkError,
};
use pretty_assertions::assert_eq;

const RELAXED: Duration = Duration::from_secs(10);

#[tokio::test]
async fn returns_one_result_per_task_without_timeout_pressure() {
    let mut work = ScriptedWork::new();
    let targets: Vec<String> = (0..12).map(|i| format!("t{i}")).collect();
    for t in &targets {
        work = work.ok(t, 5);
    }

    let summary = run(Task::numbered(targets.clone()), RELAXED, work.shared())
        .await
        .unwrap();

    assert!(summary.completed);
    assert_eq!(summary.results.len(), 12);
    assert_eq!(summary.arrival_order.len(), 12);
    for i in 1..=12 {
        let id = i.to_string();
        assert_eq!(summary.get(&id).map(|r| r.task_id.as_str()), Some(id.as_str()));
    }
    assert_eq!(summary.cancel_cause, None);
}

#[tokio::test]
async fn all_fast_successes_complete() {
    let work = ScriptedWork::new().ok("a", 5).ok("b", 5).ok("c", 5).shared();

    let summary = run(Task::numbered(["a", "b", "c"]), RELAXED, work)
        .await
        .unwrap();

    assert!(summary.completed);
    assert_eq!(summary.succeeded(), 3);
    assert!(summary
        .results
        .values()
        .all(|r| r.status == TaskStatus::Success && r.payload.as_deref() == Some("200 OK")));
}

#[tokio::test]
async fn failing_task_does_not_affect_siblings() {
    let work = ScriptedWork::new()
        .ok("a", 5)
        .fail("b", 5, "connection refused")
        .ok("c", 5)
        .shared();

    let summary = run(Task::numbered(["a", "b", "c"]), RELAXED, work)
        .await
        .unwrap();

    assert!(summary.completed);
    let failed = summary.get("2").unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("connect error: connection refused"));
    assert_eq!(summary.get("1").unwrap().status, TaskStatus::Success);
    assert_eq!(summary.get("3").unwrap().status, TaskStatus::Success);
}

#[tokio::test]
async fn zero_timeout_produces_no_fabricated_results() {
    let work = ScriptedWork::new().ok("fast", 10).ok("slow", 2_000).shared();

    let summary = run(Task::numbered(["fast", "slow"]), Duration::ZERO, work.clone())
        .await
        .unwrap();

    assert!(!summary.completed);
    assert_eq!(summary.cancel_cause, Some(CancelCause::DeadlineExceeded));
    assert!(summary.results.len() < 2);
    assert!(summary
        .results
        .values()
        .all(|r| r.status != TaskStatus::Success));
    assert!(work.budgets().is_empty(), "no work may start after the deadline");
}

#[tokio::test]
async fn results_arrive_in_completion_order() {
    let work = ScriptedWork::new()
        .ok("slowest", 240)
        .ok("fastest", 20)
        .ok("middle", 120)
        .shared();

    let summary = run(
        Task::numbered(["slowest", "fastest", "middle"]),
        RELAXED,
        work,
    )
    .await
    .unwrap();

    assert!(summary.completed);
    assert_eq!(summary.arrival_order, ["2", "3", "1"]);
}

#[tokio::test]
async fn deadline_keeps_completed_results_and_drops_slow_task() {
    let work = ScriptedWork::new()
        .ok("fast", 10)
        .ok("slow", 2_000)
        .fail("fails", 10, "dns failure")
        .shared();
    let tasks = vec![
        Task::new("1", "fast"),
        Task::new("2", "slow"),
        Task::new("3", "fails"),
    ];

    let started = Instant::now();
    let summary = run(tasks, Duration::from_millis(500), work).await.unwrap();

    assert!(started.elapsed() < Duration::from_millis(1_500));
    assert!(!summary.completed);
    assert_eq!(summary.cancel_cause, Some(CancelCause::DeadlineExceeded));
    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.get("1").unwrap().status, TaskStatus::Success);
    assert_eq!(summary.get("3").unwrap().status, TaskStatus::Failed);
    assert!(summary.get("2").is_none());
    assert_eq!(summary.missing(), 1);
}

#[tokio::test]
async fn empty_batch_completes_immediately() {
    let summary = run(Vec::new(), Duration::ZERO, ScriptedWork::new().shared())
        .await
        .unwrap();

    assert!(summary.completed);
    assert_eq!(summary.total_tasks, 0);
    assert!(summary.results.is_empty());
}

#[tokio::test]
async fn duplicate_ids_are_rejected_before_dispatch() {
    let work = ScriptedWork::new().ok("a", 1).shared();
    let tasks = vec![Task::new("x", "a"), Task::new("x", "a")];

    let err = run(tasks, RELAXED, work.clone()).await.unwrap_err();

    assert!(matches!(err, ExecutorError::DuplicateTaskId(ref id) if id == "x"));
    assert!(err.is_input_error());
    assert!(work.budgets().is_empty());
}

#[tokio::test]
async fn bounded_pool_serializes_work() {
    let work = ScriptedWork::new().ok("a", 40).ok("b", 40).ok("c", 40).shared();
    let orchestrator = Orchestrator::new(work, ExecutionOpts::default().with_max_concurrency(1));

    let started = Instant::now();
    let summary = orchestrator
        .run(Task::numbered(["a", "b", "c"]), RELAXED)
        .await
        .unwrap();

    assert!(summary.completed);
    assert!(started.elapsed() >= Duration::from_millis(115));
    assert_eq!(summary.arrival_order, ["1", "2", "3"]);
}

#[tokio::test]
async fn bounded_pool_skips_queued_tasks_on_deadline() {
    let work = ScriptedWork::new().ok("a", 100).ok("b", 100).ok("c", 100).shared();
    let orchestrator =
        Orchestrator::new(work.clone(), ExecutionOpts::default().with_max_concurrency(1));

    let summary = orchestrator
        .run(Task::numbered(["a", "b", "c"]), Duration::from_millis(150))
        .await
        .unwrap();

    assert!(!summary.completed);
    assert_eq!(summary.arrival_order, ["1"]);
    // Task 2 started before the deadline; task 3 was never dispatched.
    assert_eq!(work.budgets().len(), 2);
}

#[tokio::test]
async fn hardened_mode_passes_budget_and_aborts_in_flight_work() {
    let work = ScriptedWork::new().ok("fast", 10).ok("slow", 5_000).shared();
    let orchestrator = Orchestrator::new(
        work.clone(),
        ExecutionOpts::default().with_cancellation(CancellationMode::Hardened),
    );

    let started = Instant::now();
    let summary = orchestrator
        .run(Task::numbered(["fast", "slow"]), Duration::from_millis(200))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(1_500));
    assert!(!summary.completed);
    assert_eq!(summary.get("1").unwrap().status, TaskStatus::Success);
    assert!(summary
        .get("2")
        .map(|r| r.status == TaskStatus::Canceled)
        .unwrap_or(true));

    let budgets = work.budgets();
    assert_eq!(budgets.len(), 2);
    for (_, budget) in budgets {
        let budget = budget.expect("hardened mode passes a budget");
        assert!(budget <= Duration::from_millis(200));
    }
}

#[tokio::test]
async fn cooperative_mode_passes_no_budget() {
    let work = ScriptedWork::new().ok("a", 1).shared();
    run(Task::numbered(["a"]), RELAXED, work.clone())
        .await
        .unwrap();

    assert_eq!(work.budgets(), vec![("a".to_string(), None)]);
}

#[tokio::test]
async fn external_cancel_cuts_batch_short() {
    let work = ScriptedWork::new().ok("fast", 5).ok("slow", 5_000).shared();
    let orchestrator = Orchestrator::new(work, ExecutionOpts::default());
    let scope = Arc::new(CancellationScope::with_timeout(RELAXED));

    let canceller = {
        let scope = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            scope.cancel();
        })
    };

    let summary = orchestrator
        .run_with_scope(Task::numbered(["fast", "slow"]), scope)
        .await
        .unwrap();
    canceller.await.unwrap();

    assert!(!summary.completed);
    assert_eq!(summary.cancel_cause, Some(CancelCause::Canceled));
    assert_eq!(summary.arrival_order, ["1"]);
}

#[tokio::test]
async fn independent_batches_run_concurrently() {
    let work = ScriptedWork::new().ok("a", 30).ok("b", 2_000).shared();
    let orchestrator = Orchestrator::new(work, ExecutionOpts::default());

    let (quick, cut) = tokio::join!(
        orchestrator.run(Task::numbered(["a"]), RELAXED),
        orchestrator.run(Task::numbered(["b"]), Duration::from_millis(100)),
    );
    let quick = quick.unwrap();
    let cut = cut.unwrap();

    assert!(quick.completed);
    assert!(!cut.completed);
    assert_ne!(quick.run_id, cut.run_id);
}

#[tokio::test]
async fn renderer_sees_lifecycle_in_order() {
    let work = ScriptedWork::new().ok("a", 5).fail("b", 5, "boom").shared();
    let renderer = Arc::new(RecordingRenderer::default());
    let orchestrator = Orchestrator::builder(work)
        .renderer(renderer.clone())
        .build();

    orchestrator
        .run(Task::numbered(["a", "b"]), RELAXED)
        .await
        .unwrap();

    let events = renderer.events.lock().unwrap().clone();
    assert_eq!(events.first().map(String::as_str), Some("run.start"));
    assert_eq!(events.last().map(String::as_str), Some("run.end"));
    assert_eq!(events.iter().filter(|e| e.starts_with("task.start")).count(), 2);
    assert_eq!(events.iter().filter(|e| e.starts_with("task.end")).count(), 2);
}

/// Holds the runtime thread for the whole call, so nothing else is polled meanwhile.
struct BlockingWork {
    delay: Duration,
}

#[async_trait]
impl TaskWork for BlockingWork {
    fn name(&self) -> &str {
        "blocking"
    }

    async fn execute(&self, _task: &Task, _budget: Option<Duration>) -> Result<String, WorkError> {
        std::thread::sleep(self.delay);
        Ok("200 OK".to_string())
    }
}

#[tokio::test]
async fn result_handed_off_after_deadline_leaves_batch_incomplete() {
    let work = Arc::new(BlockingWork {
        delay: Duration::from_millis(150),
    });

    let summary = run(Task::numbered(["slow"]), Duration::from_millis(50), work)
        .await
        .unwrap();

    assert!(!summary.completed);
    assert_eq!(summary.cancel_cause, Some(CancelCause::DeadlineExceeded));
    assert_eq!(summary.get("1").unwrap().status, TaskStatus::Success);
}

/// Strategy that asks for zero workers and remembers what it was shown.
#[derive(Default)]
struct StarvingStrategy {
    seen: Mutex<Option<ConcurrencyContext>>,
}

impl ConcurrencyStrategyPlugin for StarvingStrategy {
    fn name(&self) -> &str {
        "starving"
    }

    fn calculate_concurrency(&self, context: &ConcurrencyContext) -> usize {
        *self.seen.lock().unwrap() = Some(context.clone());
        0
    }
}

#[tokio::test]
async fn concurrency_strategy_shapes_pool_with_floor_of_one() {
    let work = ScriptedWork::new().ok("a", 40).ok("b", 40).ok("c", 40).shared();
    let strategy = Arc::new(StarvingStrategy::default());
    let orchestrator = Orchestrator::builder(work)
        .concurrency_strategy(strategy.clone())
        .build();

    let started = Instant::now();
    let summary = orchestrator
        .run(Task::numbered(["a", "b", "c"]), RELAXED)
        .await
        .unwrap();

    assert!(summary.completed);
    assert!(started.elapsed() >= Duration::from_millis(115));
    assert_eq!(summary.arrival_order, ["1", "2", "3"]);

    let seen = strategy.seen.lock().unwrap().clone().expect("strategy consulted");
    assert_eq!(seen.total_tasks, 3);
    assert_eq!(seen.base_concurrency, 3);
    assert!(seen.available_cpus >= 1);
}

