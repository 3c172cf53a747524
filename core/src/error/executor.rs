use thiserror::Error;

/// Contract violations rejected at the entry of a batch run.
///
/// Task-level failures never surface here; they are recorded as
/// [`TaskResult`](crate::executor::TaskResult) data instead.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Invalid task ID: {0:?}")]
    InvalidTaskId(String),
}

impl ExecutorError {
    /// True for errors caused by the caller's input rather than the runtime.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::DuplicateTaskId(_) | Self::InvalidTaskId(_))
    }
}
