use std::sync::Arc;

use anyhow::Result;

use fanout_core::api::{
    AppConfig, ConcurrencyStrategyPlugin, OutputConfig, OutputRendererPlugin, TaskWork,
};

use crate::executor::{
    AdaptiveConcurrencyPlugin, FixedConcurrencyPlugin, JsonlRendererPlugin, TextRendererPlugin,
};
use crate::work::HttpFetchWork;

pub fn build_work(cfg: &AppConfig) -> Result<Arc<dyn TaskWork>> {
    Ok(Arc::new(HttpFetchWork::new(&cfg.fetch)?))
}

pub fn build_renderer(output: &OutputConfig) -> Arc<dyn OutputRendererPlugin> {
    match output.format.as_str() {
        "jsonl" => Arc::new(JsonlRendererPlugin::new(output.pretty_print)),
        // Anything other than jsonl behaves like text.
        _ => Arc::new(TextRendererPlugin::new(output.ascii_only)),
    }
}

pub fn build_concurrency(cfg: &AppConfig) -> Result<Option<Arc<dyn ConcurrencyStrategyPlugin>>> {
    let concurrency = &cfg.executor.concurrency;
    match concurrency.strategy.as_str() {
        "" | "none" => Ok(None),
        "adaptive" => Ok(Some(Arc::new(AdaptiveConcurrencyPlugin::new(
            concurrency.clone(),
        )))),
        "fixed" => Ok(Some(Arc::new(FixedConcurrencyPlugin::new(
            concurrency.max_concurrency,
        )))),
        other => Err(anyhow::anyhow!(
            "unknown concurrency strategy '{other}' (expected none|fixed|adaptive)"
        )),
    }
}
