//! Concurrent task orchestrator.
//!
//! # Architecture
//!
//! ```text
//! Vec<Task> + timeout
//!   ↓
//! Orchestrator::run() → validate_tasks() → CancellationScope (deadline)
//!   ↓
//! Dispatcher (Semaphore-bounded) ── spawns ──> Worker × N ── TaskResult ──┐
//!   ↓                                                                      │
//! completion channel (capacity = N) <──────────────────────────────────────┘
//!   ↓
//! select { all senders dropped | scope canceled } → BatchSummary
//! ```

mod engine;
mod progress;
mod scheduler;
mod scope;
mod worker;
pub mod traits;
pub mod types;

pub use engine::{run, Orchestrator, OrchestratorBuilder};
pub use progress::ProgressMonitor;
pub use scheduler::{Completion, Dispatcher, PoolStats};
pub use scope::{CancelCause, CancellationScope};
pub use types::{BatchSummary, ExecutionOpts, Task, TaskResult, TaskStatus};
pub use worker::Worker;
