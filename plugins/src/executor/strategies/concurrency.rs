use fanout_core::api::{ConcurrencyConfig, ConcurrencyContext, ConcurrencyStrategyPlugin};

/// Scales the pool with host load: halve when CPU is busy, double when idle.
pub struct AdaptiveConcurrencyPlugin {
    config: ConcurrencyConfig,
}

pub struct FixedConcurrencyPlugin {
    fixed: usize,
}

impl AdaptiveConcurrencyPlugin {
    pub fn new(config: ConcurrencyConfig) -> Self {
        Self { config }
    }
}

impl FixedConcurrencyPlugin {
    pub fn new(fixed: usize) -> Self {
        Self { fixed }
    }
}

impl ConcurrencyStrategyPlugin for AdaptiveConcurrencyPlugin {
    fn name(&self) -> &str {
        "adaptive"
    }

    fn calculate_concurrency(&self, context: &ConcurrencyContext) -> usize {
        let mut desired = context.base_concurrency;

        if context.cpu_usage >= self.config.cpu_threshold_high {
            desired = desired.saturating_div(2);
        } else if context.cpu_usage <= self.config.cpu_threshold_low {
            desired = desired.saturating_mul(2);
        }

        let min = self.config.min_concurrency.max(1);
        let max = self.config.max_concurrency.max(min);
        desired.clamp(min, max)
    }
}

impl ConcurrencyStrategyPlugin for FixedConcurrencyPlugin {
    fn name(&self) -> &str {
        "fixed"
    }

    fn calculate_concurrency(&self, _context: &ConcurrencyContext) -> usize {
        self.fixed.max(1)
    }
}
