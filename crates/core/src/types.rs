//! Shared types for the FSM harness
//!
//! - Namespace: database + collection pair a workload runs against
//! - Topology: shape of the cluster under test
//! - IndexSpec: index definition as sent to / listed by a collection
//! - UpdateOptions / UpdateResult / DeleteResult: write-operation metadata

use crate::value::{Document, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Worker thread identifier in `[0, thread_count)`
pub type Tid = usize;

/// Name of the default `_id` index every collection carries
pub const ID_INDEX_NAME: &str = "_id_";

/// Database + collection a workload runs against
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace {
    /// Database name
    pub db: String,
    /// Collection name
    pub coll: String,
}

impl Namespace {
    /// Create a namespace
    pub fn new(db: impl Into<String>, coll: impl Into<String>) -> Self {
        Namespace {
            db: db.into(),
            coll: coll.into(),
        }
    }

    /// Full `db.coll` name
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.db, self.coll)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.coll)
    }
}

/// Shape of the cluster under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// A single server
    Standalone,
    /// A replicated set of servers
    ReplicaSet,
    /// A routed, sharded cluster
    Sharded,
}

impl Topology {
    /// Check if this is a sharded cluster
    pub fn is_sharded(&self) -> bool {
        matches!(self, Topology::Sharded)
    }

    /// Check if this is a replica set
    pub fn is_replica_set(&self) -> bool {
        matches!(self, Topology::ReplicaSet)
    }
}

/// Index definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name
    pub name: String,
    /// Key pattern, e.g. `{x: 1}`
    pub keys: Document,
    /// Enforce uniqueness of the key
    #[serde(default)]
    pub unique: bool,
    /// Leave out documents missing every indexed field
    #[serde(default)]
    pub sparse: bool,
}

impl IndexSpec {
    /// Ascending single-field index named `<field>_1`
    pub fn ascending(field: &str) -> Self {
        let mut keys = Document::new();
        keys.insert(field.to_string(), Value::Int(1));
        IndexSpec {
            name: format!("{}_1", field),
            keys,
            unique: false,
            sparse: false,
        }
    }

    /// Mark the index unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the index sparse
    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    /// Override the generated name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The default `_id_` index
    pub fn id_index() -> Self {
        IndexSpec::ascending("_id").named(ID_INDEX_NAME).unique()
    }

    /// Field names in key-pattern order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

/// Options for update operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a document built from filter + update when nothing matches
    pub upsert: bool,
}

impl UpdateOptions {
    /// Options with upsert enabled
    pub fn upsert() -> Self {
        UpdateOptions { upsert: true }
    }
}

/// Outcome of an update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    /// Documents matching the filter
    pub matched: u64,
    /// Documents actually changed
    pub modified: u64,
    /// `_id` of the upserted document, if any
    pub upserted_id: Option<Value>,
}

/// Outcome of a delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    /// Documents removed
    pub deleted: u64,
}
