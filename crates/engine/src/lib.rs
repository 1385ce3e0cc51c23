//! Workload engine for the FSM harness
//!
//! This crate turns declarative workloads into concurrent load:
//! - Workload: `WorkloadConfig`, composition via `extend_workload`, validation
//! - Transitions: weighted sampling over the transition matrix
//! - Executor: the per-worker state-machine loop
//! - Runner: namespaces, lifecycle hooks, worker pools, serial and parallel modes
//! - Suite: manifest discovery, `fsm.toml`, registry lookup
//! - Classify: tolerated-error policy and assertion helpers
//!
//! The database itself is a collaborator behind the `fsm_core` traits; the
//! engine never knows which backend it drives.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod context;
pub mod executor;
pub mod modifiers;
pub mod names;
pub mod registry;
pub mod report;
pub mod runner;
pub mod suite;
pub mod transitions;
pub mod workload;

pub use classify::{
    assert_always, assert_command_failed_with_code, assert_command_worked, assert_when_own_coll,
    assert_worked_handle_txn_errors, Classification, ErrorClassifier,
};
pub use context::{HookContext, SharedData, StateContext};
pub use executor::run_worker;
pub use modifiers::{indexed_noindex, with_tolerated_codes};
pub use names::{drop_harness_databases, is_harness_coll_name, is_harness_db_name, NameAllocator};
pub use registry::{WorkloadFactory, WorkloadModifier, WorkloadRegistry};
pub use report::{
    SuiteReport, Termination, WorkerFailure, WorkerOutcome, WorkloadReport, WorkloadStatus,
};
pub use runner::{derive_seed, plan_batches, RunMode, RunOptions, Runner};
pub use suite::{
    discover_manifests, load_suite, run_suite, HarnessConfig, LoadedWorkload, Manifest,
    CONFIG_FILE_NAME,
};
pub use transitions::{sample_weighted, uniform_dist_transitions, TransitionRow, TransitionTable};
pub use workload::{extend_workload, HookFn, StateFn, SuperConfig, WorkloadConfig};
