//! Filter matching and update application
//!
//! Supports the subset of the query language the harness workloads use:
//! - Field equality (numeric-type agnostic, array membership)
//! - `$gt`, `$gte`, `$lt`, `$lte`, `$ne`, `$in`, `$exists`
//! - Top-level `$and` / `$or`
//! - Updates: `$set`, `$inc`, `$unset`, or full replacement
//!
//! Field names may be dotted paths into nested documents.

use fsm_core::error::{CommandError, CommandResult, ErrorCode};
use fsm_core::value::{Document, Value};
use std::cmp::Ordering;

// ============================================================================
// Paths
// ============================================================================

/// Resolve a dotted path inside a document
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = doc.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Set a dotted path, creating intermediate documents as needed
pub fn set_path(doc: &mut Document, path: &str, value: Value) -> CommandResult<()> {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
            Ok(())
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Document::new()));
            match entry {
                Value::Object(inner) => set_path(inner, rest, value),
                other => Err(CommandError::new(
                    ErrorCode::TYPE_MISMATCH,
                    format!(
                        "cannot create field '{}' in element of type {}",
                        rest,
                        other.type_name()
                    ),
                )),
            }
        }
    }
}

/// Remove a dotted path; returns true if something was removed
pub fn remove_path(doc: &mut Document, path: &str) -> bool {
    match path.split_once('.') {
        None => doc.remove(path).is_some(),
        Some((head, rest)) => match doc.get_mut(head) {
            Some(Value::Object(inner)) => remove_path(inner, rest),
            _ => false,
        },
    }
}

// ============================================================================
// Filters
// ============================================================================

fn bad_value(msg: impl Into<String>) -> CommandError {
    CommandError::new(ErrorCode::BAD_VALUE, msg)
}

fn is_operator_doc(value: &Value) -> bool {
    match value {
        Value::Object(o) => !o.is_empty() && o.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

/// Check whether `doc` satisfies `filter`
///
/// # Errors
///
/// Returns `BAD_VALUE` for unknown operators or malformed operands.
pub fn matches(doc: &Document, filter: &Document) -> CommandResult<bool> {
    for (key, cond) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let clauses = clause_list(key, cond)?;
                let mut all = true;
                for clause in clauses {
                    if !matches(doc, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let clauses = clause_list(key, cond)?;
                let mut any = false;
                for clause in clauses {
                    if matches(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            k if k.starts_with('$') => {
                return Err(bad_value(format!("unknown top level operator: {}", k)));
            }
            field => field_matches(get_path(doc, field), cond)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clause_list<'a>(op: &str, cond: &'a Value) -> CommandResult<Vec<&'a Document>> {
    let arr = cond
        .as_array()
        .ok_or_else(|| bad_value(format!("{} must be an array", op)))?;
    arr.iter()
        .map(|v| {
            v.as_object()
                .ok_or_else(|| bad_value(format!("{} entries must be documents", op)))
        })
        .collect()
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !matches!(expected, Value::Array(_)) => {
            items.iter().any(|item| item.query_eq(expected))
        }
        Some(v) => v.query_eq(expected),
    }
}

fn type_class(value: &Value) -> &'static str {
    if value.is_number() {
        "Number"
    } else {
        value.type_name()
    }
}

fn compare(actual: Option<&Value>, expected: &Value, accept: fn(Ordering) -> bool) -> bool {
    match actual {
        // Comparisons only match values of the same type class
        Some(v) if type_class(v) == type_class(expected) => accept(v.query_cmp(expected)),
        _ => false,
    }
}

fn field_matches(actual: Option<&Value>, cond: &Value) -> CommandResult<bool> {
    let ops = match cond {
        Value::Object(ops) if is_operator_doc(cond) => ops,
        _ => return Ok(equals(actual, cond)),
    };
    for (op, operand) in ops {
        let ok = match op.as_str() {
            "$eq" => equals(actual, operand),
            "$ne" => !equals(actual, operand),
            "$gt" => compare(actual, operand, |o| o == Ordering::Greater),
            "$gte" => compare(actual, operand, |o| o != Ordering::Less),
            "$lt" => compare(actual, operand, |o| o == Ordering::Less),
            "$lte" => compare(actual, operand, |o| o != Ordering::Greater),
            "$in" => {
                let candidates = operand
                    .as_array()
                    .ok_or_else(|| bad_value("$in needs an array"))?;
                candidates.iter().any(|c| equals(actual, c))
            }
            "$exists" => {
                let want = operand
                    .as_bool()
                    .ok_or_else(|| bad_value("$exists needs a boolean"))?;
                actual.is_some() == want
            }
            other => return Err(bad_value(format!("unknown operator: {}", other))),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

// ============================================================================
// Updates
// ============================================================================

/// Check whether an update document uses operators (vs. replacement)
///
/// # Errors
///
/// Returns `BAD_VALUE` when operator and plain fields are mixed.
pub fn is_operator_update(update: &Document) -> CommandResult<bool> {
    let ops = update.keys().filter(|k| k.starts_with('$')).count();
    if ops == 0 {
        Ok(false)
    } else if ops == update.len() {
        Ok(true)
    } else {
        Err(bad_value("update mixes operators and plain fields"))
    }
}

/// Apply an update to a document in place; returns true if it changed
///
/// # Errors
///
/// Returns `BAD_VALUE` for malformed updates, `TYPE_MISMATCH` when `$inc`
/// targets a non-numeric field.
pub fn apply_update(doc: &mut Document, update: &Document) -> CommandResult<bool> {
    let before = doc.clone();
    if is_operator_update(update)? {
        for (op, fields) in update {
            let fields = fields
                .as_object()
                .ok_or_else(|| bad_value(format!("{} needs a document operand", op)))?;
            for (path, operand) in fields {
                if path == "_id" {
                    return Err(bad_value("the _id field is immutable"));
                }
                match op.as_str() {
                    "$set" => set_path(doc, path, operand.clone())?,
                    "$unset" => {
                        remove_path(doc, path);
                    }
                    "$inc" => {
                        let next = increment(get_path(doc, path), operand, path)?;
                        set_path(doc, path, next)?;
                    }
                    other => return Err(bad_value(format!("unknown update operator: {}", other))),
                }
            }
        }
    } else {
        let id = doc.get("_id").cloned();
        if let (Some(new_id), Some(old_id)) = (update.get("_id"), id.as_ref()) {
            if !new_id.query_eq(old_id) {
                return Err(bad_value("the _id field is immutable"));
            }
        }
        *doc = update.clone();
        if let Some(id) = id {
            doc.insert("_id".to_string(), id);
        }
    }
    Ok(*doc != before)
}

fn increment(current: Option<&Value>, by: &Value, path: &str) -> CommandResult<Value> {
    let mismatch = |what: &str| {
        CommandError::new(
            ErrorCode::TYPE_MISMATCH,
            format!("cannot $inc field '{}': {}", path, what),
        )
    };
    match (current, by) {
        (None, Value::Int(b)) => Ok(Value::Int(*b)),
        (None, Value::Float(b)) => Ok(Value::Float(*b)),
        (Some(Value::Int(a)), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| mismatch("integer overflow")),
        (Some(a), b) if a.is_number() && b.is_number() => Ok(Value::Float(
            a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default(),
        )),
        (_, b) if !b.is_number() => Err(mismatch("increment is not numeric")),
        (current, _) => Err(mismatch(&format!(
            "field has type {}",
            current.map(Value::type_name).unwrap_or("missing")
        ))),
    }
}

/// Seed document for an upsert: the plain equality fields of the filter
pub fn upsert_seed(filter: &Document) -> CommandResult<Document> {
    let mut seed = Document::new();
    for (key, cond) in filter {
        if key.starts_with('$') || is_operator_doc(cond) {
            continue;
        }
        set_path(&mut seed, key, cond.clone())?;
    }
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsm_core::doc;

    #[test]
    fn test_equality_match_is_numeric_agnostic() {
        let d = doc! { "x" => 1 };
        assert!(matches(&d, &doc! { "x" => 1.0 }).unwrap());
        assert!(!matches(&d, &doc! { "x" => 2 }).unwrap());
    }

    #[test]
    fn test_missing_field_matches_null() {
        let d = doc! { "x" => 1 };
        assert!(matches(&d, &doc! { "y" => () }).unwrap());
    }

    #[test]
    fn test_array_membership() {
        let d = doc! { "tags" => vec![Value::from("a"), Value::from("b")] };
        assert!(matches(&d, &doc! { "tags" => "b" }).unwrap());
        assert!(!matches(&d, &doc! { "tags" => "c" }).unwrap());
    }

    #[test]
    fn test_comparison_operators() {
        let d = doc! { "n" => 5 };
        assert!(matches(&d, &doc! { "n" => doc! { "$gt" => 4 } }).unwrap());
        assert!(matches(&d, &doc! { "n" => doc! { "$gte" => 5, "$lt" => 6 } }).unwrap());
        assert!(!matches(&d, &doc! { "n" => doc! { "$lte" => 4 } }).unwrap());
        // strings never compare against numbers
        assert!(!matches(&d, &doc! { "n" => doc! { "$gt" => "a" } }).unwrap());
    }

    #[test]
    fn test_in_and_exists() {
        let d = doc! { "n" => 5 };
        let inlist = Value::Array(vec![Value::Int(1), Value::Int(5)]);
        assert!(matches(&d, &doc! { "n" => doc! { "$in" => inlist } }).unwrap());
        assert!(matches(&d, &doc! { "m" => doc! { "$exists" => false } }).unwrap());
        assert!(!matches(&d, &doc! { "n" => doc! { "$exists" => false } }).unwrap());
    }

    #[test]
    fn test_or_clause() {
        let d = doc! { "a" => 1 };
        let clauses = Value::Array(vec![
            Value::Object(doc! { "a" => 2 }),
            Value::Object(doc! { "a" => 1 }),
        ]);
        assert!(matches(&d, &doc! { "$or" => clauses }).unwrap());
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let d = doc! { "a" => 1 };
        let err = matches(&d, &doc! { "a" => doc! { "$regex" => "x" } }).unwrap_err();
        assert_eq!(err.code, ErrorCode::BAD_VALUE);
    }

    #[test]
    fn test_dotted_paths() {
        let mut d = doc! { "a" => doc! { "b" => 1 } };
        assert_eq!(get_path(&d, "a.b"), Some(&Value::Int(1)));
        set_path(&mut d, "a.c.d", Value::Int(2)).unwrap();
        assert_eq!(get_path(&d, "a.c.d"), Some(&Value::Int(2)));
        assert!(remove_path(&mut d, "a.b"));
        assert_eq!(get_path(&d, "a.b"), None);
    }

    #[test]
    fn test_set_inc_unset() {
        let mut d = doc! { "_id" => 1, "n" => 1, "gone" => true };
        let changed = apply_update(
            &mut d,
            &doc! {
                "$inc" => doc! { "n" => 2 },
                "$set" => doc! { "s" => "x" },
                "$unset" => doc! { "gone" => "" },
            },
        )
        .unwrap();
        assert!(changed);
        assert_eq!(d, doc! { "_id" => 1, "n" => 3, "s" => "x" });
    }

    #[test]
    fn test_inc_type_mismatch() {
        let mut d = doc! { "s" => "text" };
        let err = apply_update(&mut d, &doc! { "$inc" => doc! { "s" => 1 } }).unwrap_err();
        assert_eq!(err.code, ErrorCode::TYPE_MISMATCH);
    }

    #[test]
    fn test_replacement_preserves_id() {
        let mut d = doc! { "_id" => 7, "a" => 1 };
        apply_update(&mut d, &doc! { "b" => 2 }).unwrap();
        assert_eq!(d, doc! { "_id" => 7, "b" => 2 });
    }

    #[test]
    fn test_mixed_update_rejected() {
        let mut d = doc! { "a" => 1 };
        let err = apply_update(&mut d, &doc! { "$set" => doc! { "a" => 2 }, "b" => 1 }).unwrap_err();
        assert_eq!(err.code, ErrorCode::BAD_VALUE);
    }

    #[test]
    fn test_noop_update_reports_unchanged() {
        let mut d = doc! { "a" => 1 };
        assert!(!apply_update(&mut d, &doc! { "$set" => doc! { "a" => 1 } }).unwrap());
    }

    #[test]
    fn test_upsert_seed_skips_operators() {
        let seed = upsert_seed(&doc! { "k" => 3, "n" => doc! { "$gt" => 1 } }).unwrap();
        assert_eq!(seed, doc! { "k" => 3 });
    }
}
