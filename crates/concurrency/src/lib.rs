//! Concurrency primitives for the FSM harness
//!
//! - CountdownLatch: start barrier that tolerates missing parties
//! - CancellationToken: sticky error latch shared by a workload's workers
//! - WorkerGroup: named, scoped worker threads with prepare/run phases

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod latch;
pub mod worker;

pub use cancel::{CancelReason, CancellationToken};
pub use latch::{Arrival, CountdownLatch};
pub use worker::{panic_message, WorkerGroup, WorkerResult};
