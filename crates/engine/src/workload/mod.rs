//! Workload model: config, composition and validation

mod config;
mod extend;
mod validate;

pub use config::{HookFn, StateFn, WorkloadConfig};
pub use extend::{extend_workload, SuperConfig};
