use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use fanout_core::api::{duration_millis, FetchConfig, Task, TaskWork, WorkError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Status,
    Unknown,
}

impl FetchErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Status => "status",
            Self::Unknown => "unknown",
        }
    }

    fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect
        } else if err.is_request() || err.is_builder() || err.is_redirect() {
            Self::Request
        } else if err.is_body() || err.is_decode() {
            Self::Body
        } else if err.is_status() {
            Self::Status
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP GET of `Task::target`, reporting the response status line on success.
///
/// Any response counts as a successful fetch unless `fail_on_status` is set,
/// in which case non-2xx responses become failures.
#[derive(Clone)]
pub struct HttpFetchWork {
    http: reqwest::Client,
    request_timeout: Duration,
    fail_on_status: bool,
}

impl HttpFetchWork {
    pub fn new(cfg: &FetchConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            request_timeout: Duration::from_millis(cfg.request_timeout_ms),
            fail_on_status: cfg.fail_on_status,
        })
    }

    /// Transport timeout for one request: the configured limit, tightened to
    /// the remaining batch budget when one is given.
    fn effective_timeout(&self, budget: Option<Duration>) -> Duration {
        match budget {
            Some(b) => b.min(self.request_timeout),
            None => self.request_timeout,
        }
    }
}

fn status_line(status: reqwest::StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

fn to_work_error(err: reqwest::Error, timeout: Duration) -> WorkError {
    let kind = FetchErrorKind::classify(&err);
    let message = err.to_string();
    tracing::debug!(
        target: "fanout.fetch",
        kind = %kind,
        url = err.url().map(|u| u.as_str()).unwrap_or(""),
        error = %message,
        "fetch failed"
    );
    match kind {
        FetchErrorKind::Timeout => WorkError::Timeout(timeout),
        FetchErrorKind::Connect => WorkError::Connect(message),
        FetchErrorKind::Request => WorkError::Request(message),
        FetchErrorKind::Status => WorkError::Status {
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            reason: message,
        },
        FetchErrorKind::Body | FetchErrorKind::Unknown => {
            WorkError::Other(format!("{kind}: {message}"))
        }
    }
}

#[async_trait]
impl TaskWork for HttpFetchWork {
    fn name(&self) -> &str {
        "http-fetch"
    }

    async fn execute(&self, task: &Task, budget: Option<Duration>) -> Result<String, WorkError> {
        let timeout = self.effective_timeout(budget);
        tracing::debug!(
            target: "fanout.fetch",
            task_id = %task.id,
            url = %task.target,
            timeout_ms = duration_millis(timeout),
            "GET"
        );

        let resp = self
            .http
            .get(&task.target)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| to_work_error(e, timeout))?;

        let status = resp.status();
        if self.fail_on_status && !status.is_success() {
            return Err(WorkError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        Ok(status_line(status))
    }
}
