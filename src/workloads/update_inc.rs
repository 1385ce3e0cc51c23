//! Workers `$inc` their own field of one shared document.
//!
//! Each worker checks its field against its private count; teardown checks
//! the document's total against the total recorded in shared data. Each
//! run owns its own document, so runs sharing a collection stay apart.

use fsm_core::{doc, HarnessError, HarnessResult, UpdateOptions, Value};
use fsm_engine::{HookContext, SharedData, StateContext, WorkloadConfig};

use super::claim_instance;

const DOC_ID: &str = "docId";
const UPDATES: &str = "count";
const TOTAL: &str = "totalUpdates";

fn field_name(tid: usize) -> String {
    format!("t{}", tid)
}

fn doc_id(data: &SharedData) -> HarnessResult<String> {
    data.get_str(DOC_ID)
        .ok_or_else(|| HarnessError::assertion(format!("data.{} is not set", DOC_ID)))
}

fn setup(ctx: &HookContext<'_>) -> HarnessResult<()> {
    let id = format!("{}-{}", ctx.workload, claim_instance(ctx.data));
    ctx.collection().insert_one(doc! { "_id" => id.as_str() })?;
    ctx.data.set(DOC_ID, id);
    ctx.data.set(TOTAL, 0);
    Ok(())
}

fn update(ctx: &mut StateContext) -> HarnessResult<()> {
    let id = doc_id(&ctx.data)?;
    let result = ctx.collection().update_one(
        &doc! { "_id" => id.as_str() },
        &doc! { "$inc" => doc! { field_name(ctx.tid) => 1 } },
        UpdateOptions::default(),
    );
    let Some(result) = ctx.tolerate(result)? else {
        return Ok(());
    };
    ctx.assert_always(result.matched == 1, || format!("{} did not match", id))?;

    let count = ctx.locals.get(UPDATES).and_then(Value::as_int).unwrap_or(0) + 1;
    ctx.locals.insert(UPDATES.to_string(), Value::Int(count));
    ctx.data.update(|d| {
        let total = d.get(TOTAL).and_then(Value::as_int).unwrap_or(0);
        d.insert(TOTAL.to_string(), Value::Int(total + 1));
    });
    Ok(())
}

fn find(ctx: &mut StateContext) -> HarnessResult<()> {
    let id = doc_id(&ctx.data)?;
    let found = ctx.collection().find_one(&doc! { "_id" => id })?;
    let value = found
        .as_ref()
        .and_then(|d| d.get(&field_name(ctx.tid)))
        .and_then(Value::as_int)
        .unwrap_or(0);
    let expected = ctx.locals.get(UPDATES).and_then(Value::as_int).unwrap_or(0);
    ctx.assert_when_own_coll(value == expected, || {
        format!("tid {} counted {} updates, document has {}", ctx.tid, expected, value)
    })
}

fn teardown(ctx: &HookContext<'_>) -> HarnessResult<()> {
    let id = doc_id(ctx.data)?;
    let doc = ctx.collection().find_one(&doc! { "_id" => id })?;
    let sum: i64 = doc
        .iter()
        .flat_map(|d| d.iter())
        .filter(|(k, _)| k.starts_with('t'))
        .filter_map(|(_, v)| v.as_int())
        .sum();
    let total = ctx.data.get_int(TOTAL).unwrap_or(0);
    ctx.assert_when_own_coll(sum == total, || {
        format!("document sums to {} but workers recorded {}", sum, total)
    })
}

/// Concurrent `$inc` on distinct fields of one document
pub fn update_inc() -> WorkloadConfig {
    WorkloadConfig::new("update_inc")
        .threads(5)
        .iterations(30)
        .state("update", update)
        .state("find", find)
        .transition("update", "update", 0.5)
        .transition("update", "find", 0.5)
        .transition("find", "update", 1.0)
        .start_state("update")
        .setup(setup)
        .teardown(teardown)
}
