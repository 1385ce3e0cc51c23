//! Named workloads and modifiers
//!
//! Manifests refer to workloads and modifiers by name; the registry resolves
//! those names to config factories and config transformers.

use fsm_core::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::workload::WorkloadConfig;

/// Builds a fresh config
pub type WorkloadFactory = Arc<dyn Fn() -> WorkloadConfig + Send + Sync>;

/// Derives a config from another
pub type WorkloadModifier = Arc<dyn Fn(&WorkloadConfig) -> WorkloadConfig + Send + Sync>;

/// Workload and modifier lookup by name
#[derive(Clone, Default)]
pub struct WorkloadRegistry {
    workloads: BTreeMap<String, WorkloadFactory>,
    modifiers: BTreeMap<String, WorkloadModifier>,
}

impl WorkloadRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workload factory, replacing any previous one of that name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> WorkloadConfig + Send + Sync + 'static,
    {
        self.workloads.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register a modifier, replacing any previous one of that name
    pub fn register_modifier<F>(&mut self, name: impl Into<String>, modifier: F) -> &mut Self
    where
        F: Fn(&WorkloadConfig) -> WorkloadConfig + Send + Sync + 'static,
    {
        self.modifiers.insert(name.into(), Arc::new(modifier));
        self
    }

    /// Build a registered workload
    ///
    /// # Errors
    ///
    /// `UnknownWorkload` if nothing is registered under `name`.
    pub fn build(&self, name: &str) -> Result<WorkloadConfig, ConfigError> {
        self.workloads
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ConfigError::UnknownWorkload(name.to_string()))
    }

    /// Apply a registered modifier
    ///
    /// # Errors
    ///
    /// `UnknownModifier` if nothing is registered under `name`.
    pub fn modify(&self, name: &str, config: &WorkloadConfig) -> Result<WorkloadConfig, ConfigError> {
        self.modifiers
            .get(name)
            .map(|modifier| modifier(config))
            .ok_or_else(|| ConfigError::UnknownModifier(name.to_string()))
    }

    /// Registered workload names, sorted
    pub fn workload_names(&self) -> impl Iterator<Item = &str> {
        self.workloads.keys().map(String::as_str)
    }

    /// Registered modifier names, sorted
    pub fn modifier_names(&self) -> impl Iterator<Item = &str> {
        self.modifiers.keys().map(String::as_str)
    }

    /// Whether a workload is registered
    pub fn contains(&self, name: &str) -> bool {
        self.workloads.contains_key(name)
    }
}

impl fmt::Debug for WorkloadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkloadRegistry")
            .field("workloads", &self.workloads.keys().collect::<Vec<_>>())
            .field("modifiers", &self.modifiers.keys().collect::<Vec<_>>())
            .finish()
    }
}
