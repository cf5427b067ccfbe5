//! Plugin registry: semver compatibility, dependency closure, and
//! duplicate-name rejection at registration time; `create(name, config)`
//! hands back a fresh, independent instance.

use crate::plugins::traits::{MatchingAlgorithm, PluginInfo, Strategy};
use dashmap::DashMap;
use semver::Version;
use serde_json::Value as PluginConfig;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateName(String),
    VersionIncompatible { name: String, core_version: String },
    MissingDependency { name: String, dependency: String },
    NotFound(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateName(name) => write!(f, "plugin '{name}' is already registered"),
            RegistryError::VersionIncompatible { name, core_version } => write!(
                f,
                "plugin '{name}' is not compatible with core version {core_version}"
            ),
            RegistryError::MissingDependency { name, dependency } => write!(
                f,
                "plugin '{name}' depends on unregistered plugin '{dependency}'"
            ),
            RegistryError::NotFound(name) => write!(f, "no plugin registered under '{name}'"),
        }
    }
}

impl std::error::Error for RegistryError {}

type AlgorithmFactory = dyn Fn(&PluginConfig) -> Arc<dyn MatchingAlgorithm> + Send + Sync;
type StrategyFactory = dyn Fn(&PluginConfig) -> Arc<dyn Strategy> + Send + Sync;

struct AlgorithmEntry {
    info: PluginInfo,
    factory: Box<AlgorithmFactory>,
}

struct StrategyEntry {
    info: PluginInfo,
    factory: Box<StrategyFactory>,
}

/// Holds every registered matching-algorithm and strategy plugin.
/// `core_version` is the running core's semantic version, checked
/// against each plugin's `[minCoreVersion, maxCoreVersion]` window.
pub struct PluginRegistry {
    core_version: Version,
    algorithms: DashMap<String, AlgorithmEntry>,
    strategies: DashMap<String, StrategyEntry>,
}

impl PluginRegistry {
    pub fn new(core_version: Version) -> Self {
        Self {
            core_version,
            algorithms: DashMap::new(),
            strategies: DashMap::new(),
        }
    }

    fn check_registrable(&self, info: &PluginInfo) -> Result<(), RegistryError> {
        if self.algorithms.contains_key(&info.name) || self.strategies.contains_key(&info.name) {
            return Err(RegistryError::DuplicateName(info.name.clone()));
        }
        if !info.is_compatible_with(&self.core_version) {
            return Err(RegistryError::VersionIncompatible {
                name: info.name.clone(),
                core_version: self.core_version.to_string(),
            });
        }
        for dependency in &info.dependencies {
            if !self.algorithms.contains_key(dependency) && !self.strategies.contains_key(dependency)
            {
                return Err(RegistryError::MissingDependency {
                    name: info.name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn register_algorithm<F>(&self, info: PluginInfo, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&PluginConfig) -> Arc<dyn MatchingAlgorithm> + Send + Sync + 'static,
    {
        self.check_registrable(&info)?;
        let name = info.name.clone();
        self.algorithms.insert(
            name,
            AlgorithmEntry {
                info,
                factory: Box::new(factory),
            },
        );
        Ok(())
    }

    pub fn register_strategy<F>(&self, info: PluginInfo, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&PluginConfig) -> Arc<dyn Strategy> + Send + Sync + 'static,
    {
        self.check_registrable(&info)?;
        let name = info.name.clone();
        self.strategies.insert(
            name,
            StrategyEntry {
                info,
                factory: Box::new(factory),
            },
        );
        Ok(())
    }

    /// Construct a fresh algorithm instance. Every call returns an
    /// instance sharing no mutable state with any other.
    pub fn create_algorithm(
        &self,
        name: &str,
        config: &PluginConfig,
    ) -> Result<Arc<dyn MatchingAlgorithm>, RegistryError> {
        let entry = self
            .algorithms
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        Ok((entry.factory)(config))
    }

    pub fn create_strategy(
        &self,
        name: &str,
        config: &PluginConfig,
    ) -> Result<Arc<dyn Strategy>, RegistryError> {
        let entry = self
            .strategies
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        Ok((entry.factory)(config))
    }

    pub fn algorithm_info(&self, name: &str) -> Option<PluginInfo> {
        self.algorithms.get(name).map(|e| e.info.clone())
    }

    pub fn algorithm_names(&self) -> Vec<String> {
        self.algorithms.iter().map(|e| e.key().clone()).collect()
    }
}
