//! Config composition
//!
//! `extend_workload(base, mutator)` clones `base`, hands the clone to the
//! mutator together with a read-only snapshot of `base`, and returns the
//! mutated clone. Chains of extensions form a line back to one root config.
//!
//! Delegation to the parent is explicit: a mutator that wants to wrap the
//! parent's setup captures the snapshot and calls `parent.run_setup(ctx)`.

use std::ops::Deref;
use std::sync::Arc;

use super::config::WorkloadConfig;

/// Read-only snapshot of a config taken before an extension step
#[derive(Debug, Clone)]
pub struct SuperConfig(Arc<WorkloadConfig>);

impl SuperConfig {
    /// Snapshot a config
    pub fn new(config: &WorkloadConfig) -> Self {
        SuperConfig(Arc::new(config.clone()))
    }
}

impl Deref for SuperConfig {
    type Target = WorkloadConfig;

    fn deref(&self) -> &WorkloadConfig {
        &self.0
    }
}

/// Derive a config from `base`
///
/// `base` is never modified: the mutator works on a clone, whose maps are
/// independent copies.
///
/// # Example
///
/// ```
/// use fsm_engine::{extend_workload, WorkloadConfig};
///
/// let base = WorkloadConfig::new("base").iterations(10).data("indexedField", "x");
/// let derived = extend_workload(&base, |config, parent| {
///     config.name = format!("{}_more", parent.name);
///     config.iterations = parent.iterations * 2;
///     config.data.remove("indexedField");
/// });
/// assert_eq!(derived.iterations, 20);
/// assert!(base.data.contains_key("indexedField"));
/// ```
pub fn extend_workload<F>(base: &WorkloadConfig, mutator: F) -> WorkloadConfig
where
    F: FnOnce(&mut WorkloadConfig, &SuperConfig),
{
    let parent = SuperConfig::new(base);
    let mut config = base.clone();
    mutator(&mut config, &parent);
    tracing::trace!(base = %base.name, derived = %config.name, "extended workload");
    config
}
