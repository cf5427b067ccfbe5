//! Matching-algorithm and strategy plugin ABI and registry.
//!
//! The trait surface lives here so core-version compatibility checks
//! (`minCoreVersion`/`maxCoreVersion`) can reference `env!("CARGO_PKG_VERSION")`
//! directly. Reference plugin implementations live in the separate
//! `meridian-plugins` crate to keep the core free of concrete trading
//! logic.

pub mod registry;
pub mod traits;

pub use registry::{PluginRegistry, RegistryError};
pub use traits::{MatchingAlgorithm, PerformanceProfile, PluginInfo, Strategy};
