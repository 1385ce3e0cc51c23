//! The built-in library as a suite: both run modes, manifest directories

use crate::common::*;
use fsmharness::{builtin_registry, run_suite, RunMode, RunOptions, WorkloadStatus};
use std::path::Path;
use tempfile::TempDir;

fn all_builtins() -> Vec<fsmharness::WorkloadConfig> {
    let registry = builtin_registry();
    let mut names: Vec<_> = registry.workload_names().map(str::to_string).collect();
    names.sort();
    names.iter().map(|n| registry.build(n).unwrap()).collect()
}

#[test]
fn test_builtins_pass_in_parallel() {
    let (runner, _) = runner(RunOptions::with_seed(1000));
    let report = runner.run(&all_builtins(), RunMode::Parallel);
    assert!(report.passed(), "{}", report);
    assert_eq!(report.workloads.len(), 6);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_builtins_pass_serially() {
    let (runner, _) = runner(RunOptions::with_seed(1001));
    let report = runner.run(&all_builtins(), RunMode::Serial);
    assert!(report.passed(), "{}", report);
}

#[test]
fn test_builtins_pass_in_one_database() {
    let options = RunOptions {
        same_db: true,
        ..RunOptions::with_seed(1002)
    };
    let (runner, _) = runner(options);
    let report = runner.run(&all_builtins(), RunMode::Serial);
    assert!(report.passed(), "{}", report);
    let dbs: std::collections::HashSet<_> = report
        .workloads
        .iter()
        .map(|w| w.namespace.as_ref().unwrap().db.clone())
        .collect();
    assert_eq!(dbs.len(), 1);
}

fn write(dir: &Path, name: &str, text: &str) {
    std::fs::write(dir.join(name), text).unwrap();
}

#[test]
fn test_manifest_directory_with_modifier() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "inserts.toml", "workload = \"insert_unique\"\nthread_count = 2\n");
    write(
        dir.path(),
        "noindex.toml",
        "workload = \"indexed_insert_base\"\nmodifiers = [\"indexed_noindex\"]\niterations = 10\n",
    );
    write(
        dir.path(),
        "tuned.toml",
        "workload = \"index_count\"\n\n[data]\nindexedField = \"y\"\n",
    );

    let (runner, _) = runner(RunOptions::with_seed(1003));
    let report = run_suite(&runner, dir.path(), &builtin_registry(), &[], RunMode::Parallel).unwrap();
    assert!(report.passed(), "{}", report);
    assert_eq!(report.workload("inserts").unwrap().thread_count, 2);
    assert_eq!(report.workload("noindex").unwrap().total_iterations(), 100);
}

#[test]
fn test_failing_manifest_sets_exit_code() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "good.toml", "workload = \"update_inc\"\n");
    write(dir.path(), "typo.toml", "workload = \"update_inc\"\nthreads = 3\n");

    let (runner, _) = runner(RunOptions::with_seed(1004));
    let report = run_suite(&runner, dir.path(), &builtin_registry(), &[], RunMode::Serial).unwrap();
    assert_eq!(report.workload("good").unwrap().status(), WorkloadStatus::Passed);
    assert_eq!(report.workload("typo").unwrap().status(), WorkloadStatus::ConfigError);
    assert_eq!(report.exit_code(), 1);
}
