//! Inserts keyed by tid on an indexed field, with lookups checking each
//! worker's own count
//!
//! `data.indexExists` tells states whether the index is there; the
//! `find` state checks the collection agrees.

use fsm_core::{doc, HarnessResult, IndexSpec, Value};
use fsm_engine::modifiers::{INDEXED_FIELD, INDEX_EXISTS, SHARD_KEY};
use fsm_engine::{indexed_noindex, HookContext, SharedData, StateContext, WorkloadConfig};

const INSERTED: &str = "nInserted";

fn indexed_field(data: &SharedData) -> HarnessResult<String> {
    data.get_str(INDEXED_FIELD).ok_or_else(|| {
        fsm_core::HarnessError::assertion(format!("data.{} is not set", INDEXED_FIELD))
    })
}

fn setup(ctx: &HookContext<'_>) -> HarnessResult<()> {
    let field = indexed_field(ctx.data)?;
    ctx.collection().create_index(IndexSpec::ascending(&field))?;
    ctx.data.set(INDEX_EXISTS, true);
    Ok(())
}

fn insert(ctx: &mut StateContext) -> HarnessResult<()> {
    let field = indexed_field(&ctx.data)?;
    ctx.collection().insert_one(doc! { field => ctx.tid })?;
    let inserted = ctx.locals.get(INSERTED).and_then(Value::as_int).unwrap_or(0);
    ctx.locals.insert(INSERTED.to_string(), Value::Int(inserted + 1));
    Ok(())
}

fn find(ctx: &mut StateContext) -> HarnessResult<()> {
    let field = indexed_field(&ctx.data)?;
    let coll = ctx.collection();

    let expected = ctx.locals.get(INSERTED).and_then(Value::as_int).unwrap_or(0) as u64;
    let found = coll.count_documents(&doc! { field.as_str() => ctx.tid })?;
    ctx.assert_when_own_coll(found == expected, || {
        format!("tid {} inserted {} documents but finds {}", ctx.tid, expected, found)
    })?;

    let index_name = IndexSpec::ascending(&field).name;
    let has_index = coll.list_indexes()?.iter().any(|i| i.name == index_name);
    let index_exists = ctx.data.get_bool(INDEX_EXISTS).unwrap_or(false);
    ctx.assert_when_own_coll(has_index == index_exists, || {
        format!("indexExists is {} but index present is {}", index_exists, has_index)
    })
}

/// Indexed inserts and per-tid lookups
pub fn indexed_insert_base() -> WorkloadConfig {
    WorkloadConfig::new("indexed_insert_base")
        .threads(10)
        .iterations(40)
        .data(INDEXED_FIELD, "indexed_insert_base")
        .data(SHARD_KEY, "indexed_insert_base")
        .data(INDEX_EXISTS, true)
        .state("insert", insert)
        .state("find", find)
        .transition("insert", "insert", 0.2)
        .transition("insert", "find", 0.8)
        .transition("find", "insert", 0.8)
        .transition("find", "find", 0.2)
        .start_state("insert")
        .setup(setup)
}

/// [`indexed_insert_base`] with the index dropped during setup
pub fn indexed_insert_noindex() -> WorkloadConfig {
    let mut config = indexed_noindex(&indexed_insert_base());
    config.name = "indexed_insert_noindex".to_string();
    tracing::trace!(workload = %config.name, "built");
    config
}
