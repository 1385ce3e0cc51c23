//! The built-in workloads run end to end

use crate::common::*;
use fsmharness::workloads::{
    index_count, indexed_insert_base, indexed_insert_noindex, insert_duplicate_contention,
    insert_unique, update_inc,
};
use fsmharness::{
    builtin_registry, extend_workload, HarnessResult, RunMode, RunOptions, StateContext,
    StateFn, WorkloadConfig, WorkloadStatus,
};
use parking_lot::Mutex;
use std::sync::Arc;

// ============================================================================
// Scenario A: 5 × 20 unique inserts
// ============================================================================

#[test]
fn test_insert_unique_yields_one_hundred_documents() {
    let (runner, cluster) = runner(keep_databases(100));
    let report = runner.run_workload(&insert_unique());
    assert!(report.passed(), "{}", report);
    assert_eq!(report.thread_count, 5);
    assert_eq!(report.iterations, 20);
    assert_eq!(count_docs(&cluster, report.namespace.as_ref().unwrap()), 100);
}

// ============================================================================
// Scenario B: index created in setup, counted in teardown
// ============================================================================

#[test]
fn test_index_count_sees_two_indexes() {
    for iterations in [0, 1, 25, 200] {
        let (runner, _) = runner(RunOptions::with_seed(200 + iterations as u64));
        let config = index_count().iterations(iterations);
        let report = runner.run_workload(&config);
        assert!(report.passed(), "iterations {}: {}", iterations, report);
    }
}

#[test]
fn test_index_count_fails_when_index_missing() {
    let broken = extend_workload(&index_count(), |c, _| c.setup = None);
    let (runner, _) = runner(RunOptions::with_seed(201));
    let report = runner.run_workload(&broken.iterations(5));
    assert_eq!(report.status(), WorkloadStatus::TeardownFailed);
}

// ============================================================================
// Scenario C: index dropped by the modifier, visible to every state
// ============================================================================

/// Wrap every state so it records `data.indexExists` before delegating
fn observing(base: &WorkloadConfig, seen: Arc<Mutex<Vec<Option<bool>>>>) -> WorkloadConfig {
    extend_workload(base, |config, parent| {
        for (name, parent_state) in parent.states.iter() {
            let parent_state = parent_state.clone();
            let seen = seen.clone();
            let wrapped: StateFn = Arc::new(move |ctx: &mut StateContext| -> HarnessResult<()> {
                seen.lock().push(ctx.data.get_bool("indexExists"));
                parent_state(ctx)
            });
            config.states.insert(name.clone(), wrapped);
        }
    })
}

#[test]
fn test_noindex_modifier_visible_to_every_state() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let config = observing(&indexed_insert_noindex(), seen.clone());
    assert!(!config.data.contains_key("shardKey"));

    let (runner, _) = runner(RunOptions::with_seed(300));
    let report = runner.run_workload(&config);
    assert!(report.passed(), "{}", report);

    let seen = seen.lock();
    assert_eq!(seen.len(), report.total_iterations());
    assert!(seen.iter().all(|v| *v == Some(false)));
}

#[test]
fn test_indexed_base_keeps_index() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let base = indexed_insert_base();
    let config = observing(&base, seen.clone());

    let (runner, _) = runner(RunOptions::with_seed(301));
    let report = runner.run_workload(&config);
    assert!(report.passed(), "{}", report);
    assert!(seen.lock().iter().all(|v| *v == Some(true)));
    assert!(base.data.contains_key("shardKey"));
}

// ============================================================================
// Contention workloads
// ============================================================================

#[test]
fn test_update_inc_counts_match() {
    let (runner, _) = runner(RunOptions::with_seed(400));
    let report = runner.run_workload(&update_inc());
    assert!(report.passed(), "{}", report);
}

#[test]
fn test_duplicate_contention_is_tolerated() {
    let (runner, _) = runner(RunOptions::with_seed(500));
    let report = runner.run_workload(&insert_duplicate_contention());
    assert!(report.passed(), "{}", report);
    assert!(report.total_tolerated() > 0);
}

#[test]
fn test_duplicate_contention_fails_without_tolerance() {
    let strict = extend_workload(&insert_duplicate_contention(), |c, _| {
        c.classifier = fsmharness::ErrorClassifier::new();
    });
    let (runner, _) = runner(RunOptions::with_seed(501));
    let report = runner.run_workload(&strict);
    assert_eq!(report.status(), WorkloadStatus::WorkersFailed);
    let failure = report.failures().next().unwrap().failure.as_ref().unwrap();
    assert_eq!(failure.error.code(), Some(fsmharness::ErrorCode::DUPLICATE_KEY));
}

// ============================================================================
// Shared collections: several runs in one namespace
// ============================================================================

fn shared_collection(seed: u64) -> RunOptions {
    RunOptions {
        same_collection: true,
        ..RunOptions::with_seed(seed)
    }
}

#[test]
fn test_update_inc_twice_in_one_collection() {
    let (runner, _) = runner(shared_collection(600));
    let report = runner.run(&[update_inc(), update_inc()], RunMode::Serial);
    assert!(report.passed(), "{}", report);
    assert_eq!(report.workloads[0].namespace, report.workloads[1].namespace);
}

#[test]
fn test_insert_unique_twice_in_one_collection() {
    let (runner, cluster) = runner(shared_collection(601));
    let report = runner.run(&[insert_unique(), insert_unique()], RunMode::Serial);
    assert!(report.passed(), "{}", report);
    let ns = report.workloads[0].namespace.as_ref().unwrap();
    assert_eq!(count_docs(&cluster, ns), 200);
}

#[test]
fn test_duplicate_contention_shares_collection_with_inserts() {
    let configs = [insert_unique(), insert_duplicate_contention()];
    for mode in [RunMode::Serial, RunMode::Parallel] {
        let (runner, _) = runner(shared_collection(602));
        let report = runner.run(&configs, mode);
        assert!(report.passed(), "{:?}: {}", mode, report);
    }
}

#[test]
fn test_every_builtin_runs_twice_in_one_collection() {
    let registry = builtin_registry();
    let mut names: Vec<_> = registry.workload_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names.len(), 6);

    for (i, name) in names.iter().enumerate() {
        let config = registry.build(name).unwrap();
        let configs = [config.clone(), config];
        for mode in [RunMode::Serial, RunMode::Parallel] {
            let (runner, _) = runner(shared_collection(700 + i as u64));
            let report = runner.run(&configs, mode);
            assert!(report.passed(), "{} {:?}: {}", name, mode, report);
            assert_eq!(report.workloads.len(), 2);
        }
    }
}
