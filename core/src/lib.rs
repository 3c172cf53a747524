//! fanout-core: bounded fan-out/fan-in orchestration of independent tasks.
//!
//! A batch of [`executor::Task`]s is dispatched to a semaphore-bounded pool of
//! workers that share one [`executor::CancellationScope`]. Results are
//! aggregated in completion order into an [`executor::BatchSummary`] keyed by
//! task id. Per-task failures are data; only deadline expiry (or an explicit
//! cancel) curtails a batch.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
