//! Collaborator traits for the database under test
//!
//! The harness never talks to a server directly. Workloads and the runner
//! go through these traits, so any backend (a driver wrapper for a real
//! cluster, or the in-memory backend used by the harness's own tests) can be
//! plugged in.
//!
//! Thread safety: all methods must be safe to call concurrently from
//! multiple worker threads (requires Send + Sync).
//!
//! Handles are cheap to clone behind `Arc`. `Cluster::connect` must return a
//! distinct connection each time so that workers do not serialize through a
//! shared connection.

use std::sync::Arc;

use crate::error::CommandResult;
use crate::types::{DeleteResult, IndexSpec, Topology, UpdateOptions, UpdateResult};
use crate::value::{Document, Value};

/// Entry point to the cluster under test
pub trait Cluster: Send + Sync {
    /// Open a new connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    fn connect(&self) -> CommandResult<Arc<dyn Client>>;

    /// Shape of the cluster
    fn topology(&self) -> Topology;
}

/// One connection to the cluster
pub trait Client: Send + Sync {
    /// Identifier distinguishing this connection from others
    fn connection_id(&self) -> u64;

    /// Handle to a database (created lazily on first write)
    fn database(&self, name: &str) -> Arc<dyn Database>;

    /// Names of all databases holding at least one collection
    ///
    /// # Errors
    ///
    /// Returns an error if the listing command fails.
    fn list_database_names(&self) -> CommandResult<Vec<String>>;

    /// Drop a database and all of its collections
    ///
    /// # Errors
    ///
    /// Returns an error if the drop command fails.
    fn drop_database(&self, name: &str) -> CommandResult<()>;
}

/// Handle to one database
pub trait Database: Send + Sync {
    /// Database name
    fn name(&self) -> &str;

    /// Handle to a collection (created lazily on first write)
    fn collection(&self, name: &str) -> Arc<dyn Collection>;

    /// Run a database command, e.g. `{ping: 1}`
    ///
    /// Returns the reply document (with `ok: 1`) on success.
    ///
    /// # Errors
    ///
    /// Returns the `{ok: 0, code, errmsg}` reply as a `CommandError`.
    fn run_command(&self, command: &Document) -> CommandResult<Document>;

    /// Names of the collections in this database
    ///
    /// # Errors
    ///
    /// Returns an error if the listing command fails.
    fn list_collection_names(&self) -> CommandResult<Vec<String>>;

    /// Drop this database
    ///
    /// # Errors
    ///
    /// Returns an error if the drop command fails.
    fn drop_database(&self) -> CommandResult<()>;
}

/// Handle to one collection
///
/// Filters are documents of field equality or comparison operators
/// (`$gt`, `$gte`, `$lt`, `$lte`, `$ne`, `$in`, `$exists`). Updates are
/// operator documents (`$set`, `$inc`, `$unset`) or full replacements.
pub trait Collection: Send + Sync {
    /// Collection name
    fn name(&self) -> &str;

    /// Insert one document, generating `_id` when absent
    ///
    /// Returns the `_id` of the inserted document.
    ///
    /// # Errors
    ///
    /// Returns `DUPLICATE_KEY` on a unique index violation.
    fn insert_one(&self, doc: Document) -> CommandResult<Value>;

    /// Insert documents in order, stopping at the first failure
    ///
    /// # Errors
    ///
    /// Returns the first failure; earlier documents stay inserted.
    fn insert_many(&self, docs: Vec<Document>) -> CommandResult<Vec<Value>>;

    /// Update the first matching document
    ///
    /// # Errors
    ///
    /// Returns an error if the update is malformed or violates an index.
    fn update_one(
        &self,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> CommandResult<UpdateResult>;

    /// Update every matching document
    ///
    /// # Errors
    ///
    /// Returns an error if the update is malformed or violates an index.
    fn update_many(&self, filter: &Document, update: &Document) -> CommandResult<UpdateResult>;

    /// Remove the first matching document
    ///
    /// # Errors
    ///
    /// Returns an error if the filter is malformed.
    fn delete_one(&self, filter: &Document) -> CommandResult<DeleteResult>;

    /// Remove every matching document
    ///
    /// # Errors
    ///
    /// Returns an error if the filter is malformed.
    fn delete_many(&self, filter: &Document) -> CommandResult<DeleteResult>;

    /// All matching documents
    ///
    /// # Errors
    ///
    /// Returns an error if the filter is malformed.
    fn find(&self, filter: &Document) -> CommandResult<Vec<Document>>;

    /// First matching document
    ///
    /// # Errors
    ///
    /// Returns an error if the filter is malformed.
    fn find_one(&self, filter: &Document) -> CommandResult<Option<Document>> {
        Ok(self.find(filter)?.into_iter().next())
    }

    /// Number of matching documents
    ///
    /// # Errors
    ///
    /// Returns an error if the filter is malformed.
    fn count_documents(&self, filter: &Document) -> CommandResult<u64>;

    /// Group matching documents by `field` and count each group
    ///
    /// Equivalent of a `$match` + `$group: {_id: "$field", count: {$sum: 1}}`
    /// pipeline. Documents missing the field group under `Null`.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter is malformed.
    fn aggregate_count(&self, filter: &Document, field: &str) -> CommandResult<Vec<(Value, u64)>>;

    /// Create an index; creating an identical index again is a no-op
    ///
    /// # Errors
    ///
    /// Returns `INDEX_OPTIONS_CONFLICT` if an index with the same name but a
    /// different definition exists, or `DUPLICATE_KEY` if existing documents
    /// violate a unique index.
    fn create_index(&self, spec: IndexSpec) -> CommandResult<()>;

    /// Drop an index by name
    ///
    /// # Errors
    ///
    /// Returns `INDEX_NOT_FOUND` if no such index exists.
    fn drop_index(&self, name: &str) -> CommandResult<()>;

    /// Drop every index except `_id_`
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist.
    fn drop_indexes(&self) -> CommandResult<()>;

    /// Indexes on this collection, `_id_` first
    ///
    /// # Errors
    ///
    /// Returns `NAMESPACE_NOT_FOUND` if the collection does not exist.
    fn list_indexes(&self) -> CommandResult<Vec<IndexSpec>>;

    /// Drop the collection and its indexes
    ///
    /// Returns `true` if the collection existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the drop command fails.
    fn drop_collection(&self) -> CommandResult<bool>;
}
