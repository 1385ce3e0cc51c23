//! Every worker inserts one document per iteration; teardown counts them.

use fsm_core::{doc, HarnessResult};
use fsm_engine::{HookContext, StateContext, WorkloadConfig};

use super::{claim_instance, instance, INSTANCE};

fn setup(ctx: &HookContext<'_>) -> HarnessResult<()> {
    claim_instance(ctx.data);
    Ok(())
}

fn insert(ctx: &mut StateContext) -> HarnessResult<()> {
    let run = instance(&ctx.data);
    let id = format!("{}:{}:{}-{}", ctx.workload, run, ctx.tid, ctx.iteration);
    ctx.collection().insert_one(doc! {
        "_id" => id,
        INSTANCE => run,
        "tid" => ctx.tid,
        "iteration" => ctx.iteration,
    })?;
    Ok(())
}

fn teardown(ctx: &HookContext<'_>) -> HarnessResult<()> {
    let found = ctx
        .collection()
        .count_documents(&doc! { INSTANCE => instance(ctx.data) })?;
    let expected = (ctx.thread_count * ctx.iterations) as u64;
    ctx.assert_when_own_coll(found == expected, || {
        format!("expected {} documents, found {}", expected, found)
    })
}

/// 5 workers × 20 inserts, expecting exactly 100 documents
pub fn insert_unique() -> WorkloadConfig {
    WorkloadConfig::new("insert_unique")
        .threads(5)
        .iterations(20)
        .state("insert", insert)
        .transition("insert", "insert", 1.0)
        .start_state("insert")
        .setup(setup)
        .teardown(teardown)
}
