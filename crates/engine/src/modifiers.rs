//! Reusable workload modifiers
//!
//! Each modifier is an [`extend_workload`] step packaged as a function, so
//! the same change can be layered onto any compatible base.

use fsm_core::{ErrorCode, HarnessError, HarnessResult, IndexSpec, Value};
use std::sync::Arc;

use crate::context::HookContext;
use crate::workload::{extend_workload, WorkloadConfig};

/// Data key naming the indexed field
pub const INDEXED_FIELD: &str = "indexedField";
/// Data key telling states whether the index is present
pub const INDEX_EXISTS: &str = "indexExists";
/// Data key naming the shard key
pub const SHARD_KEY: &str = "shardKey";

/// Run an indexed workload without its index
///
/// The derived setup runs the parent's setup, then drops the ascending index
/// on `data.indexedField`. `data.shardKey` is removed and
/// `data.indexExists` is `false` from the first state on.
pub fn indexed_noindex(base: &WorkloadConfig) -> WorkloadConfig {
    extend_workload(base, |config, parent| {
        let parent = parent.clone();
        config.name = format!("{}_noindex", parent.name);
        config.data.remove(SHARD_KEY);
        config.data.insert(INDEX_EXISTS.to_string(), Value::Bool(false));
        config.setup = Some(Arc::new(move |ctx: &HookContext<'_>| -> HarnessResult<()> {
            parent.run_setup(ctx)?;

            let field = ctx.data.get_str(INDEXED_FIELD).ok_or_else(|| {
                HarnessError::assertion(format!(
                    "{}: indexed_noindex needs data.{}",
                    ctx.workload, INDEXED_FIELD
                ))
            })?;
            let index = IndexSpec::ascending(&field).name;
            ctx.collection().drop_index(&index)?;
            tracing::debug!(workload = %ctx.workload, index = %index, "dropped index");

            ctx.data.remove(SHARD_KEY);
            ctx.data.set(INDEX_EXISTS, false);
            Ok(())
        }));
    })
}

/// Tolerate additional error codes
pub fn with_tolerated_codes(base: &WorkloadConfig, codes: &[ErrorCode]) -> WorkloadConfig {
    extend_workload(base, |config, _| {
        for &code in codes {
            config.classifier.add_code(code);
        }
    })
}
