//! The matching-algorithm and strategy plugin ABI: version metadata the
//! registry checks at registration time, and the two capability traits a
//! plugin implements.

use crate::core::types::Order;
use crate::orderbook::{MatchOutcome, OrderBook};
use semver::{Version, VersionReq};
use std::fmt;

/// Static identity and compatibility metadata a plugin reports to the
/// registry. `min_core_version`/`max_core_version` bound the core
/// versions the plugin was built against; `dependencies` names other
/// plugins (by name) this one requires to already be registered.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub version: Version,
    pub min_core_version: Version,
    pub max_core_version: Version,
    pub dependencies: Vec<String>,
    pub performance_profile: PerformanceProfile,
}

impl PluginInfo {
    /// True if `core_version` falls within `[min_core_version, max_core_version]`.
    pub fn is_compatible_with(&self, core_version: &Version) -> bool {
        let req = VersionReq::parse(&format!(
            ">={}, <={}",
            self.min_core_version, self.max_core_version
        ))
        .expect("min/max core version always forms a valid range");
        req.matches(core_version)
    }
}

/// Coarse performance characterization surfaced to operators; refined by
/// [`crate::registry::PluginTelemetry`] once the plugin has handled
/// traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceProfile {
    LowLatency,
    Balanced,
    ThroughputOptimized,
}

impl fmt::Display for PerformanceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PerformanceProfile::LowLatency => "low-latency",
            PerformanceProfile::Balanced => "balanced",
            PerformanceProfile::ThroughputOptimized => "throughput-optimized",
        };
        write!(f, "{s}")
    }
}

/// A matching algorithm: given a mutable order book and an incoming
/// order, produces the trades (if any) and the order's resulting state.
/// Implementations share no mutable state across instances — every
/// `create` call in the registry hands out a fresh one.
pub trait MatchingAlgorithm: Send + Sync {
    fn info(&self) -> &PluginInfo;

    /// Match `order` against `book`. Equivalent in contract to
    /// [`OrderBook::submit`] — implementations typically delegate to it,
    /// adjusting the order or book state beforehand to express a
    /// different matching policy.
    fn match_order(&self, book: &mut OrderBook, order: Order) -> MatchOutcome;
}

/// A strategy plugin: reacts to market/position updates to produce
/// orders. No strategy logic is implemented in this workspace (an
/// explicit non-goal); this trait exists so the registry and coordinator
/// have a real second plugin capability to exercise besides matching
/// algorithms. Reference implementations live in the `meridian-plugins`
/// crate.
pub trait Strategy: Send + Sync {
    fn info(&self) -> &PluginInfo;

    /// Called by the coordinator once per activation cycle. The no-op
    /// reference strategy in this crate always returns an empty vec.
    fn on_tick(&self) -> Vec<Order>;
}
