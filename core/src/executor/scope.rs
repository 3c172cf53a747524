use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const LIVE: u8 = 0;
const DEADLINE_EXCEEDED: u8 = 1;
const CANCELED: u8 = 2;

// Far enough out to behave as "no deadline" without overflowing `Instant`.
const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Why a scope left the live state. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelCause {
    DeadlineExceeded,
    Canceled,
}

impl std::fmt::Display for CancelCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
            Self::Canceled => f.write_str("canceled"),
        }
    }
}

/// Time-bounded, cancelable execution scope shared by every worker of a batch.
///
/// State machine: live -> canceled, terminal. The transition happens at most
/// once, either when the deadline is observed to have passed or on an explicit
/// [`cancel`](Self::cancel); whichever is first wins the recorded cause.
/// Queries are lock-free.
#[derive(Debug)]
pub struct CancellationScope {
    deadline: Instant,
    token: CancellationToken,
    cause: AtomicU8,
}

impl CancellationScope {
    pub fn new(deadline: Instant) -> Self {
        Self {
            deadline,
            token: CancellationToken::new(),
            cause: AtomicU8::new(LIVE),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(Instant::now() + timeout.min(MAX_TIMEOUT))
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Non-blocking: true once the deadline elapsed or `cancel` was called.
    pub fn is_canceled(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        if Instant::now() >= self.deadline {
            self.trip(CancelCause::DeadlineExceeded);
            return true;
        }
        false
    }

    /// Idempotent; safe to call concurrently. No effect once canceled.
    pub fn cancel(&self) {
        self.trip(CancelCause::Canceled);
    }

    /// Suspends until the scope is canceled, by deadline or explicitly.
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = tokio::time::sleep_until(self.deadline) => {
                self.trip(CancelCause::DeadlineExceeded);
            }
        }
    }

    /// The recorded cause, or `None` while live.
    pub fn cause(&self) -> Option<CancelCause> {
        if !self.is_canceled() {
            return None;
        }
        match self.cause.load(Ordering::Acquire) {
            DEADLINE_EXCEEDED => Some(CancelCause::DeadlineExceeded),
            CANCELED => Some(CancelCause::Canceled),
            _ => None,
        }
    }

    fn trip(&self, cause: CancelCause) {
        let code = match cause {
            CancelCause::DeadlineExceeded => DEADLINE_EXCEEDED,
            CancelCause::Canceled => CANCELED,
        };
        let won = self
            .cause
            .compare_exchange(LIVE, code, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            tracing::debug!(target: "fanout.scope", cause = %cause, "scope canceled");
        }
        self.token.cancel();
    }
}
