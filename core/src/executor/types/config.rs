use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ExecutorConfig;

/// How the batch deadline reaches a worker that is already mid-call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationMode {
    /// The deadline only prevents new attempts from starting; in-flight calls run
    /// to completion (or their own transport timeout) in the background.
    #[default]
    Cooperative,
    /// The remaining deadline is passed to the work call as its budget and the
    /// call is raced against scope cancellation.
    Hardened,
}

impl FromStr for CancellationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cooperative" => Ok(Self::Cooperative),
            "hardened" => Ok(Self::Hardened),
            other => Err(format!(
                "unknown cancellation mode '{other}' (expected cooperative|hardened)"
            )),
        }
    }
}

/// Execution options for a single orchestrator.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOpts {
    /// Maximum parallel workers; `None` gives every task its own worker
    pub max_concurrency: Option<usize>,

    pub cancellation: CancellationMode,

    /// Enable visual progress bar (disabled for jsonl output)
    pub progress_bar: bool,
}

impl ExecutionOpts {
    pub fn from_config(cfg: &ExecutorConfig) -> Self {
        Self {
            max_concurrency: cfg.max_parallel,
            cancellation: cfg.cancellation,
            progress_bar: false,
        }
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    pub fn with_cancellation(mut self, mode: CancellationMode) -> Self {
        self.cancellation = mode;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_format")]
    pub format: String,
    #[serde(default)]
    pub pretty_print: bool,
    #[serde(default)]
    pub ascii_only: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
            pretty_print: false,
            ascii_only: false,
        }
    }
}

fn default_output_format() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// "none", "fixed" or "adaptive"
    #[serde(default = "default_concurrency_strategy")]
    pub strategy: String,
    #[serde(default)]
    pub min_concurrency: usize,
    #[serde(default)]
    pub max_concurrency: usize,
    #[serde(default)]
    pub cpu_threshold_low: f32,
    #[serde(default)]
    pub cpu_threshold_high: f32,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            strategy: default_concurrency_strategy(),
            min_concurrency: 2,
            max_concurrency: 64,
            cpu_threshold_low: 50.0,
            cpu_threshold_high: 80.0,
        }
    }
}

fn default_concurrency_strategy() -> String {
    "none".to_string()
}
