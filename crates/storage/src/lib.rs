//! In-memory document backend for the FSM harness
//!
//! This crate implements the collaborator traits from `fsm-core` entirely
//! in process:
//! - MemoryCluster / MemoryClient: connections sharing one server state
//! - MemoryDatabase: command dispatch (`ping`, `serverStatus`, `count`, ...)
//! - MemoryCollection: CRUD, filters, updates and unique indexes
//! - FailPoints: `failCommand` error injection
//!
//! # Concurrency
//!
//! - DashMap lookups for databases and collections
//! - One RwLock per collection; writers to different collections never
//!   contend
//! - Atomic counters for `serverStatus`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cluster;
pub mod collection;
pub mod database;
pub mod failpoint;
pub mod index;
pub mod matcher;
pub mod server;

pub use cluster::{MemoryClient, MemoryCluster};
pub use collection::MemoryCollection;
pub use database::MemoryDatabase;
pub use failpoint::{FailPointMode, FailPoints, FAIL_COMMAND};
pub use server::ServerState;
