//! Core types and traits for the FSM harness
//!
//! This crate defines the foundational types used throughout the system:
//! - Value / Document: dynamic values for workload data and database documents
//! - Error: ConfigError, CommandError, HarnessError and ErrorCode
//! - Types: Namespace, Topology, IndexSpec, write results
//! - Traits: the database collaborator (Cluster, Client, Database, Collection)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{
    CommandError, CommandResult, ConfigError, ErrorCode, HarnessError, HarnessResult,
    TRANSIENT_TRANSACTION_ERROR,
};
pub use traits::{Client, Cluster, Collection, Database};
pub use types::{
    DeleteResult, IndexSpec, Namespace, Tid, Topology, UpdateOptions, UpdateResult, ID_INDEX_NAME,
};
pub use value::{Document, Value};
