//! fsmharness - concurrent finite-state-machine workloads for database testing
//!
//! A workload is a small state machine of database operations. The harness
//! runs many copies of it at once, one per worker thread, each walking the
//! machine by weighted random transitions, and reports which invariants broke.
//!
//! # Quick Start
//!
//! ```
//! use fsmharness::{doc, MemoryCluster, RunOptions, Runner, WorkloadConfig};
//! use std::sync::Arc;
//!
//! let config = WorkloadConfig::new("insert")
//!     .threads(4)
//!     .iterations(10)
//!     .state("insert", |ctx| {
//!         let id = format!("{}-{}", ctx.tid, ctx.iteration);
//!         ctx.collection().insert_one(doc! { "_id" => id })?;
//!         Ok(())
//!     })
//!     .transition("insert", "insert", 1.0)
//!     .start_state("insert");
//!
//! let runner = Runner::new(Arc::new(MemoryCluster::new()), RunOptions::with_seed(42));
//! let report = runner.run_workload(&config);
//! assert!(report.passed());
//! assert_eq!(report.total_iterations(), 40);
//! ```
//!
//! # Architecture
//!
//! - `fsm-core`: values, errors, the database collaborator traits
//! - `fsm-storage`: in-memory backend implementing those traits
//! - `fsm-concurrency`: latches, cancellation, worker groups
//! - `fsm-engine`: workload model, state loop, runners, suites
//!
//! This crate re-exports all four and adds the built-in workload library.

pub mod workloads;

pub use fsm_concurrency::{CancelReason, CancellationToken, CountdownLatch, WorkerGroup};
pub use fsm_core::{
    doc, Client, Cluster, Collection, CommandError, CommandResult, ConfigError, Database,
    Document, ErrorCode, HarnessError, HarnessResult, IndexSpec, Namespace, Tid, Topology,
    UpdateOptions, Value,
};
pub use fsm_engine::*;
pub use fsm_storage::{MemoryClient, MemoryCluster};
pub use workloads::builtin_registry;
