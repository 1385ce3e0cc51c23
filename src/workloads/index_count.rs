//! Setup builds an index; teardown checks the index list no matter what
//! the workers did in between.

use fsm_core::{doc, HarnessResult, IndexSpec};
use fsm_engine::{HookContext, SharedData, StateContext, WorkloadConfig};
use rand::Rng;

const FIELD: &str = "indexedField";

fn indexed_field(data: &SharedData) -> String {
    data.get_str(FIELD).unwrap_or_else(|| "x".to_string())
}

fn setup(ctx: &HookContext<'_>) -> HarnessResult<()> {
    ctx.collection().create_index(IndexSpec::ascending(&indexed_field(ctx.data)))?;
    Ok(())
}

fn insert(ctx: &mut StateContext) -> HarnessResult<()> {
    let value: i64 = ctx.rng.gen_range(0..100);
    ctx.collection().insert_one(doc! { indexed_field(&ctx.data) => value })?;
    Ok(())
}

fn query(ctx: &mut StateContext) -> HarnessResult<()> {
    let value: i64 = ctx.rng.gen_range(0..100);
    let field = indexed_field(&ctx.data);
    let docs = ctx.collection().find(&doc! { field.as_str() => value })?;
    ctx.assert_always(
        docs.iter().all(|d| d.get(&field).and_then(|v| v.as_int()) == Some(value)),
        || format!("find on {} returned a non-matching document", field),
    )
}

fn teardown(ctx: &HookContext<'_>) -> HarnessResult<()> {
    let indexes = ctx.collection().list_indexes()?;
    ctx.assert_when_own_coll(indexes.len() == 2, || {
        let names: Vec<_> = indexes.iter().map(|i| i.name.as_str()).collect();
        format!("expected _id_ plus one index, found {:?}", names)
    })
}

/// One worker; exactly two indexes must survive the run
pub fn index_count() -> WorkloadConfig {
    WorkloadConfig::new("index_count")
        .threads(1)
        .iterations(25)
        .data(FIELD, "x")
        .state("insert", insert)
        .state("query", query)
        .transition("insert", "insert", 0.5)
        .transition("insert", "query", 0.5)
        .transition("query", "insert", 1.0)
        .start_state("insert")
        .setup(setup)
        .teardown(teardown)
}
