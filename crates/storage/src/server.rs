//! Shared server state behind every in-memory connection
//!
//! # Design
//!
//! - DashMap of databases, each a DashMap of collections: lock-free lookup,
//!   only the target shard locks on create/drop
//! - One `RwLock` per collection guarding documents + indexes: operations on
//!   different collections never contend
//! - Atomic op counters reported through `serverStatus`

use dashmap::DashMap;
use fsm_core::types::IndexSpec;
use fsm_core::value::{Document, Value};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::failpoint::FailPoints;

/// Documents and indexes of one collection
#[derive(Debug)]
pub struct CollectionData {
    /// Documents in insertion order
    pub docs: Vec<Document>,
    /// Indexes, `_id_` first
    pub indexes: Vec<IndexSpec>,
}

impl CollectionData {
    fn new() -> Self {
        CollectionData {
            docs: Vec::new(),
            indexes: vec![IndexSpec::id_index()],
        }
    }
}

/// One collection
#[derive(Debug)]
pub struct CollectionState {
    /// Guarded contents
    pub data: RwLock<CollectionData>,
}

/// One database
#[derive(Debug, Default)]
pub struct DatabaseState {
    /// Collections by name
    pub collections: DashMap<String, Arc<CollectionState>>,
}

/// Per-operation counters, as reported under `serverStatus.opcounters`
#[derive(Debug, Default)]
pub struct OpCounters {
    /// Documents inserted
    pub insert: AtomicU64,
    /// Find / count / aggregate operations
    pub query: AtomicU64,
    /// Update operations
    pub update: AtomicU64,
    /// Delete operations
    pub delete: AtomicU64,
    /// Database commands
    pub command: AtomicU64,
}

impl OpCounters {
    /// Increment one counter
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Counters as a reply document
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for (name, counter) in [
            ("insert", &self.insert),
            ("query", &self.query),
            ("update", &self.update),
            ("delete", &self.delete),
            ("command", &self.command),
        ] {
            doc.insert(name.to_string(), Value::Int(counter.load(Ordering::Relaxed) as i64));
        }
        doc
    }
}

/// State shared by every connection to one in-memory server
#[derive(Debug, Default)]
pub struct ServerState {
    /// Databases by name
    pub databases: DashMap<String, Arc<DatabaseState>>,
    /// Active fail points
    pub failpoints: FailPoints,
    /// Operation counters
    pub opcounters: OpCounters,
    /// Connections ever opened
    pub total_connections: AtomicU64,
    /// Connections currently open
    pub current_connections: AtomicU64,
}

impl ServerState {
    /// Create an empty server
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a collection without creating it
    pub fn collection(&self, db: &str, coll: &str) -> Option<Arc<CollectionState>> {
        let db = self.databases.get(db)?;
        let coll = db.collections.get(coll)?;
        Some(Arc::clone(&coll))
    }

    /// Look up a collection, creating database and collection on demand
    ///
    /// Returns the collection and whether it was newly created.
    pub fn collection_or_create(&self, db: &str, coll: &str) -> (Arc<CollectionState>, bool) {
        let db_state = Arc::clone(
            &self
                .databases
                .entry(db.to_string())
                .or_insert_with(|| Arc::new(DatabaseState::default())),
        );
        let mut created = false;
        let state = Arc::clone(&db_state.collections.entry(coll.to_string()).or_insert_with(|| {
            created = true;
            Arc::new(CollectionState {
                data: RwLock::new(CollectionData::new()),
            })
        }));
        if created {
            tracing::debug!(db, coll, "created collection");
        }
        (state, created)
    }

    /// Drop a collection; returns true if it existed
    pub fn drop_collection(&self, db: &str, coll: &str) -> bool {
        // Empty database entries stay; listing skips them
        match self.databases.get(db) {
            Some(db_state) => db_state.collections.remove(coll).is_some(),
            None => false,
        }
    }

    /// Drop a database; returns true if it existed
    pub fn drop_database(&self, db: &str) -> bool {
        self.databases.remove(db).is_some()
    }

    /// Sorted names of databases holding at least one collection
    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .databases
            .iter()
            .filter(|entry| !entry.value().collections.is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Sorted names of the collections in one database
    pub fn collection_names(&self, db: &str) -> Vec<String> {
        let mut names: Vec<String> = match self.databases.get(db) {
            Some(state) => state.collections.iter().map(|e| e.key().clone()).collect(),
            None => Vec::new(),
        };
        names.sort();
        names
    }
}
