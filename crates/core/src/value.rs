//! Value types for the FSM harness
//!
//! This module defines:
//! - Value: the closed set of dynamic values carried in workload `data`,
//!   documents sent to the database under test, and command replies
//! - Document: an ordered field-name → Value map
//!
//! ## Type Rules
//!
//! - Seven types only: Null, Bool, Int, Float, String, Array, Object
//! - No implicit type coercions in `PartialEq`: `Int(1) != Float(1.0)`
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - Query comparison (`query_cmp`) is the only place numbers of different
//!   types compare, matching how a document database orders numerics

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Ordered map of field names to values.
///
/// `BTreeMap` keeps iteration deterministic, which keeps seeded runs
/// reproducible when documents are walked.
pub type Document = BTreeMap<String, Value>;

/// Dynamic value used for workload data and documents
///
/// ## Type Equality
///
/// Different types are NEVER equal, even if they contain the same "value":
/// - `Int(1) != Float(1.0)`
/// - `String("1") != Int(1)`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Array of values
    Array(Vec<Value>),
    /// Nested document
    Object(Document),
}

// Custom PartialEq implementation for IEEE-754 float semantics
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is a numeric value (Int or Float)
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric view of Int or Float values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as &[Value] if this is an Array value
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as &Document if this is an Object value
    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Canonical type rank used when ordering values of different types.
    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::String(_) => 2,
            Value::Object(_) => 3,
            Value::Array(_) => 4,
            Value::Bool(_) => 5,
        }
    }

    /// Total order used by query operators and index keys.
    ///
    /// Numbers compare by numeric value regardless of Int/Float; values of
    /// different types order by type rank (null < numbers < strings <
    /// objects < arrays < booleans). NaN sorts below every other number.
    pub fn query_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (a, b) if a.is_number() && b.is_number() => {
                let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                match (x.is_nan(), y.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                }
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.query_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Object(a), Value::Object(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    let ord = ka.cmp(kb).then_with(|| va.query_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }

    /// Equality as a query sees it: `Int(1)` matches `Float(1.0)`.
    pub fn query_eq(&self, other: &Value) -> bool {
        self.query_cmp(other) == Ordering::Equal
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl From<Document> for Value {
    fn from(o: Document) -> Self {
        Value::Object(o)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

/// Build a [`Document`] from `key => value` pairs.
///
/// ```
/// use fsm_core::doc;
/// let d = doc! { "_id" => 1, "name" => "a" };
/// assert_eq!(d.len(), 2);
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::value::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut d = $crate::value::Document::new();
        $(
            d.insert(::std::string::String::from($key), $crate::value::Value::from($value));
        )+
        d
    }};
}
