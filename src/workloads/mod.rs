//! Built-in workloads
//!
//! | Name | What it stresses |
//! |---|---|
//! | `insert_unique` | concurrent inserts of distinct documents |
//! | `index_count` | index creation in setup, index listing in teardown |
//! | `indexed_insert_base` | inserts and lookups on an indexed field |
//! | `indexed_insert_noindex` | the same without the index |
//! | `update_inc` | server-side `$inc` on a shared document |
//! | `insert_duplicate_contention` | unique-index races between workers |
//!
//! Each factory returns a fresh config; [`builtin_registry`] registers all
//! of them under their names, plus the `indexed_noindex` modifier.

mod index_count;
mod indexed_insert;
mod insert_duplicate;
mod insert_unique;
mod update_inc;

pub use index_count::index_count;
pub use indexed_insert::{indexed_insert_base, indexed_insert_noindex};
pub use insert_duplicate::insert_duplicate_contention;
pub use insert_unique::insert_unique;
pub use update_inc::update_inc;

use fsm_engine::{indexed_noindex, SharedData, WorkloadRegistry};
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared-data key holding the instance number claimed in setup
const INSTANCE: &str = "instance";

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

/// Give this run of a workload a process-wide unique number
///
/// Runs sharing one collection tag their documents with it so they never
/// collide on `_id`.
fn claim_instance(data: &SharedData) -> i64 {
    let n = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed) as i64;
    data.set(INSTANCE, n);
    n
}

/// Instance number claimed by [`claim_instance`], 0 if setup never ran
fn instance(data: &SharedData) -> i64 {
    data.get_int(INSTANCE).unwrap_or(0)
}

/// Registry holding every built-in workload and modifier
pub fn builtin_registry() -> WorkloadRegistry {
    let mut registry = WorkloadRegistry::new();
    registry
        .register("insert_unique", insert_unique)
        .register("index_count", index_count)
        .register("indexed_insert_base", indexed_insert_base)
        .register("indexed_insert_noindex", indexed_insert_noindex)
        .register("update_inc", update_inc)
        .register("insert_duplicate_contention", insert_duplicate_contention)
        .register_modifier("indexed_noindex", indexed_noindex);
    registry
}
