//! Index key extraction and uniqueness enforcement
//!
//! Indexes are not materialized; a unique index is enforced by scanning
//! the collection under its write lock. Missing fields index as null, so
//! two documents lacking a uniquely indexed field collide, unless the index
//! is sparse: a sparse index skips documents missing every indexed field.

use fsm_core::error::{CommandError, CommandResult, ErrorCode};
use fsm_core::types::IndexSpec;
use fsm_core::value::{Document, Value};

use crate::matcher::get_path;
use crate::server::CollectionData;

/// Key of `doc` under `spec`, one value per indexed field
pub fn index_key(doc: &Document, spec: &IndexSpec) -> Vec<Value> {
    spec.fields()
        .map(|field| get_path(doc, field).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Key of `doc` under `spec`, or `None` when a sparse index skips it
pub fn indexed_key(doc: &Document, spec: &IndexSpec) -> Option<Vec<Value>> {
    if spec.sparse && spec.fields().all(|field| get_path(doc, field).is_none()) {
        return None;
    }
    Some(index_key(doc, spec))
}

/// Index keys compare with cross-numeric equality (`1 == 1.0`)
pub fn keys_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.query_eq(y))
}

/// Positions of the first pair of documents sharing a key under `spec`
pub fn first_duplicate(docs: &[Document], spec: &IndexSpec) -> Option<(usize, usize)> {
    let keys: Vec<Option<Vec<Value>>> = docs.iter().map(|d| indexed_key(d, spec)).collect();
    for i in 0..keys.len() {
        let Some(a) = &keys[i] else { continue };
        for j in i + 1..keys.len() {
            if matches!(&keys[j], Some(b) if keys_equal(a, b)) {
                return Some((i, j));
            }
        }
    }
    None
}

/// Verify `doc` does not collide with any other document on a unique index
///
/// `skip` names the position of the document being replaced, if any.
///
/// # Errors
///
/// Returns `DUPLICATE_KEY` naming the violated index.
pub fn check_unique(data: &CollectionData, doc: &Document, skip: Option<usize>) -> CommandResult<()> {
    for spec in data.indexes.iter().filter(|ix| ix.unique) {
        let Some(key) = indexed_key(doc, spec) else {
            continue;
        };
        let collides = data
            .docs
            .iter()
            .enumerate()
            .filter(|(pos, _)| Some(*pos) != skip)
            .any(|(_, other)| matches!(indexed_key(other, spec), Some(k) if keys_equal(&key, &k)));
        if collides {
            return Err(CommandError::new(
                ErrorCode::DUPLICATE_KEY,
                format!(
                    "E11000 duplicate key error index: {} dup key: {:?}",
                    spec.name, key
                ),
            ));
        }
    }
    Ok(())
}
