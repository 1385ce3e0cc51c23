//! Workers race to insert the same small set of keys under a unique index.
//!
//! Losing a race is `DUPLICATE_KEY`, which this workload tolerates. The
//! index is sparse so documents without the key, written by other workloads
//! sharing the collection, never collide with each other.

use fsm_core::{doc, ErrorCode, HarnessResult, IndexSpec};
use fsm_engine::{HookContext, StateContext, WorkloadConfig};
use rand::Rng;

const KEY: &str = "key";
const KEY_SPACE: i64 = 10;

fn setup(ctx: &HookContext<'_>) -> HarnessResult<()> {
    ctx.collection().create_index(IndexSpec::ascending(KEY).unique().sparse())?;
    Ok(())
}

fn insert(ctx: &mut StateContext) -> HarnessResult<()> {
    let key = ctx.rng.gen_range(0..KEY_SPACE);
    let result = ctx.collection().insert_one(doc! { KEY => key, "tid" => ctx.tid });
    ctx.tolerate(result)?;
    Ok(())
}

fn remove(ctx: &mut StateContext) -> HarnessResult<()> {
    let key = ctx.rng.gen_range(0..KEY_SPACE);
    ctx.collection().delete_one(&doc! { KEY => key })?;
    Ok(())
}

fn teardown(ctx: &HookContext<'_>) -> HarnessResult<()> {
    let groups = ctx
        .collection()
        .aggregate_count(&doc! { KEY => doc! { "$exists" => true } }, KEY)?;
    let duplicated: Vec<_> = groups.iter().filter(|(_, n)| *n > 1).collect();
    ctx.assert_always(duplicated.is_empty(), || {
        format!("unique index let duplicates through: {:?}", duplicated)
    })?;
    ctx.assert_when_own_coll(groups.len() as i64 <= KEY_SPACE, || {
        format!("{} distinct keys from a space of {}", groups.len(), KEY_SPACE)
    })
}

/// Unique-index contention; duplicate-key failures are expected
pub fn insert_duplicate_contention() -> WorkloadConfig {
    WorkloadConfig::new("insert_duplicate_contention")
        .threads(8)
        .iterations(50)
        .state("insert", insert)
        .state("remove", remove)
        .transition("insert", "insert", 0.7)
        .transition("insert", "remove", 0.3)
        .transition("remove", "insert", 1.0)
        .start_state("insert")
        .tolerate([ErrorCode::DUPLICATE_KEY])
        .setup(setup)
        .teardown(teardown)
}
