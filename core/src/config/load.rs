use std::path::{Path, PathBuf};

use super::types::AppConfig;
use crate::executor::types::CancellationMode;

/// Get the default fanout data directory: ~/.fanout
pub fn get_fanout_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".fanout"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.fanout/config.toml (highest)
    let user_config = get_fanout_data_dir()?.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let cfg = if user_config.exists() {
        read_config(&user_config)?
    } else if local_config.exists() {
        read_config(local_config)?
    } else {
        AppConfig::default()
    };

    apply_env_overrides(cfg)
}

/// Load a config file explicitly named by the caller; environment overrides still apply.
pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
    let cfg = read_config(path.as_ref())?;
    apply_env_overrides(cfg)
}

fn read_config(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read {} failed: {e}", path.display()))?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse {} failed: {e}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(cfg)
}

fn apply_env_overrides(mut cfg: AppConfig) -> anyhow::Result<AppConfig> {
    if let Some(v) = env_value("FANOUT_TIMEOUT_MS") {
        cfg.executor.timeout_ms = v
            .parse()
            .map_err(|_| anyhow::anyhow!("FANOUT_TIMEOUT_MS is not a number: {v}"))?;
    }

    if let Some(v) = env_value("FANOUT_MAX_PARALLEL") {
        let n: usize = v
            .parse()
            .map_err(|_| anyhow::anyhow!("FANOUT_MAX_PARALLEL is not a number: {v}"))?;
        cfg.executor.max_parallel = (n > 0).then_some(n);
    }

    if let Some(v) = env_value("FANOUT_CANCELLATION") {
        cfg.executor.cancellation = v
            .parse::<CancellationMode>()
            .map_err(|e| anyhow::anyhow!("FANOUT_CANCELLATION: {e}"))?;
    }

    Ok(cfg)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
