//! A strategy plugin that never produces an order. No strategy logic is
//! implemented in this workspace (an explicit non-goal); this exists to
//! give the registry and coordinator a real second plugin kind to
//! exercise in tests.

use meridian_core::core::types::Order;
use meridian_core::plugins::{PerformanceProfile, PluginInfo, Strategy};
use semver::Version;

pub struct NoopStrategy {
    info: PluginInfo,
}

impl NoopStrategy {
    pub fn new() -> Self {
        Self {
            info: PluginInfo {
                name: "noop".to_string(),
                version: Version::new(1, 0, 0),
                min_core_version: Version::new(0, 1, 0),
                max_core_version: Version::new(0, 99, 0),
                dependencies: Vec::new(),
                performance_profile: PerformanceProfile::Balanced,
            },
        }
    }
}

impl Default for NoopStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for NoopStrategy {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn on_tick(&self) -> Vec<Order> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_produces_orders() {
        let strategy = NoopStrategy::new();
        assert!(strategy.on_tick().is_empty());
    }
}
