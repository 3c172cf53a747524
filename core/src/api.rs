//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `fanout_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from_path, AppConfig, ExecutorConfig, FetchConfig, LoggingConfig,
};
pub use crate::error::{CliError, ExecutorError};
pub use crate::executor::traits::{
    ConcurrencyContext, ConcurrencyStrategyPlugin, OutputRendererPlugin, RenderEvent, TaskWork,
};
pub use crate::executor::types::{
    duration_millis, BatchSummary, CancellationMode, ConcurrencyConfig, ExecutionOpts,
    OutputConfig, Task, TaskResult, TaskStatus, WorkError,
};
pub use crate::executor::{run, CancelCause, CancellationScope, Orchestrator};
