use std::time::Duration;

use thiserror::Error;

/// Failure reported by a [`TaskWork`](crate::executor::traits::TaskWork) call.
///
/// The worker converts it to `TaskResult { status: Failed, error: Some(to_string()) }`.
#[derive(Error, Debug)]
pub enum WorkError {
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("connect error: {0}")]
    Connect(String),

    #[error("request error: {0}")]
    Request(String),

    #[error("unexpected status {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("{0}")]
    Other(String),
}

impl WorkError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
