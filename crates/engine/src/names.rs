//! Collision-free database and collection names
//!
//! Names follow a fixed format so that cleanup code can recognise them:
//!
//! - databases: `<prefix>fsmdb<N>`
//! - collections: `fsmcoll<N>`
//!
//! Each kind has its own counter starting at 0. An allocator is created once
//! per suite and shared by reference.

use fsm_core::{Client, HarnessResult};
use std::sync::atomic::{AtomicU64, Ordering};

/// Marker embedded in every harness database name
pub const DB_MARKER: &str = "fsmdb";
/// Marker embedded in every harness collection name
pub const COLL_MARKER: &str = "fsmcoll";

/// Monotonic name source
#[derive(Debug, Default)]
pub struct NameAllocator {
    next_db: AtomicU64,
    next_coll: AtomicU64,
}

impl NameAllocator {
    /// Allocator whose counters start at 0
    pub fn new() -> Self {
        Self::default()
    }

    /// `prefix + "fsmdb" + N`
    pub fn unique_db_name(&self, prefix: &str) -> String {
        let n = self.next_db.fetch_add(1, Ordering::Relaxed);
        format!("{}{}{}", prefix, DB_MARKER, n)
    }

    /// `"fsmcoll" + N`
    pub fn unique_coll_name(&self) -> String {
        let n = self.next_coll.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", COLL_MARKER, n)
    }
}

/// Whether `name` was produced by [`NameAllocator::unique_db_name`]
pub fn is_harness_db_name(name: &str) -> bool {
    name.contains(DB_MARKER)
}

/// Whether `name` was produced by [`NameAllocator::unique_coll_name`]
pub fn is_harness_coll_name(name: &str) -> bool {
    name.contains(COLL_MARKER)
}

/// Drop every database carrying the harness marker
///
/// Returns the names dropped.
///
/// # Errors
///
/// Returns the first listing or drop failure.
pub fn drop_harness_databases(client: &dyn Client) -> HarnessResult<Vec<String>> {
    let mut dropped = Vec::new();
    for name in client.list_database_names()? {
        if is_harness_db_name(&name) {
            client.drop_database(&name)?;
            tracing::debug!(db = %name, "dropped harness database");
            dropped.push(name);
        }
    }
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_format_and_start() {
        let names = NameAllocator::new();
        assert_eq!(names.unique_db_name("test"), "testfsmdb0");
        assert_eq!(names.unique_db_name("test"), "testfsmdb1");
        assert_eq!(names.unique_coll_name(), "fsmcoll0");
    }

    #[test]
    fn test_counters_are_independent() {
        let names = NameAllocator::new();
        names.unique_db_name("");
        names.unique_db_name("");
        assert_eq!(names.unique_coll_name(), "fsmcoll0");
    }

    #[test]
    fn test_unique_across_threads() {
        let names = Arc::new(NameAllocator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let names = Arc::clone(&names);
                thread::spawn(move || {
                    (0..1250).map(|_| names.unique_coll_name()).collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all = HashSet::new();
        for h in handles {
            for name in h.join().unwrap() {
                assert!(all.insert(name));
            }
        }
        assert_eq!(all.len(), 10_000);
    }

    #[test]
    fn test_markers_recognised() {
        let names = NameAllocator::new();
        assert!(is_harness_db_name(&names.unique_db_name("x")));
        assert!(is_harness_coll_name(&names.unique_coll_name()));
        assert!(!is_harness_db_name("admin"));
        assert!(!is_harness_coll_name("system.users"));
    }
}
