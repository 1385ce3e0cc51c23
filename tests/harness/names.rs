//! Name allocation and harness database cleanup

use crate::common::*;
use fsmharness::workloads::insert_unique;
use fsmharness::{
    drop_harness_databases, is_harness_db_name, Cluster, NameAllocator, RunOptions,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

#[test]
fn test_names_unique_across_threads() {
    let names = Arc::new(NameAllocator::new());
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let names = names.clone();
            thread::spawn(move || {
                (0..1_000)
                    .flat_map(|_| [names.unique_db_name("test"), names.unique_coll_name()])
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for name in handle.join().unwrap() {
            assert!(seen.insert(name.clone()), "duplicate name {}", name);
        }
    }
    assert_eq!(seen.len(), 20_000);
}

#[test]
fn test_drop_harness_databases_after_kept_run() {
    let (runner, cluster) = runner(keep_databases(11));
    let configs = vec![insert_unique(), insert_unique()];
    let report = runner.run_workloads_serially(&configs);
    assert!(report.passed(), "{}", report);

    let client = cluster.connect().unwrap();
    client.database("userdata").collection("c").insert_one(fsmharness::doc! { "x" => 1 }).unwrap();

    let before = client.list_database_names().unwrap();
    assert_eq!(before.iter().filter(|n| is_harness_db_name(n)).count(), 2);

    let dropped = drop_harness_databases(client.as_ref()).unwrap();
    assert_eq!(dropped.len(), 2);
    assert_eq!(client.list_database_names().unwrap(), vec!["userdata".to_string()]);
}

#[test]
fn test_cleanup_leaves_nothing_behind() {
    let (runner, cluster) = runner(RunOptions::with_seed(12));
    assert!(runner.run_workload(&insert_unique()).passed());
    let client = cluster.connect().unwrap();
    assert!(client
        .list_database_names()
        .unwrap()
        .iter()
        .all(|n| !is_harness_db_name(n)));
}
