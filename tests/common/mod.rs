//! Shared test utilities for the harness integration suites.

#![allow(dead_code)]

use fsmharness::{
    doc, Cluster, HarnessResult, MemoryCluster, Namespace, RunOptions, Runner, StateContext,
    WorkloadConfig,
};
use std::sync::{Arc, Once};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` controls verbosity
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Runners
// ============================================================================

/// Runner over a fresh in-memory cluster
pub fn runner(options: RunOptions) -> (Runner, Arc<MemoryCluster>) {
    init_tracing();
    let cluster = Arc::new(MemoryCluster::new());
    (Runner::new(cluster.clone(), options), cluster)
}

/// Fixed seed, databases kept after the run for inspection
pub fn keep_databases(seed: u64) -> RunOptions {
    RunOptions {
        cleanup: false,
        ..RunOptions::with_seed(seed)
    }
}

/// Documents in a namespace
pub fn count_docs(cluster: &MemoryCluster, ns: &Namespace) -> u64 {
    cluster
        .connect()
        .unwrap()
        .database(&ns.db)
        .collection(&ns.coll)
        .count_documents(&doc! {})
        .unwrap()
}

// ============================================================================
// Workloads
// ============================================================================

/// State that does nothing
pub fn noop(_: &mut StateContext) -> HarnessResult<()> {
    Ok(())
}

/// Valid config over the given states, uniform transitions
pub fn uniform(name: &str, states: &[&str]) -> WorkloadConfig {
    let mut config = WorkloadConfig::new(name).iterations(10);
    for s in states {
        config = config.state(*s, noop);
    }
    config
        .transitions(fsmharness::uniform_dist_transitions(states.iter().copied()).unwrap())
        .start_state(states[0])
}
