use std::time::Duration;

use async_trait::async_trait;

use crate::executor::types::{Task, WorkError};

/// Caller-supplied work performed once per dispatched task.
///
/// Implementations report success with a response descriptor (e.g. an HTTP
/// status line) and failure with a [`WorkError`]; the orchestrator does not
/// interpret protocol details. `budget` is the time left before the batch
/// deadline and is only provided in hardened cancellation mode, so the call
/// can bound itself at the transport layer.
#[async_trait]
pub trait TaskWork: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, task: &Task, budget: Option<Duration>) -> Result<String, WorkError>;
}
