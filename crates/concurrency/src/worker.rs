//! Worker thread groups
//!
//! A group runs `count` named OS threads through two phases:
//!
//! 1. **prepare**: per-worker setup (open a connection, seed an RNG). Runs
//!    before the start barrier.
//! 2. **run**: the body proper. Starts only once every worker has finished
//!    preparing, so first operations interleave as tightly as possible.
//!
//! A failed prepare, an `Err` from run, or a panic in either phase trips the
//! group's [`CancellationToken`] so the remaining workers can wind down. The
//! group always joins every thread before returning.

use fsm_core::{HarnessError, HarnessResult, Tid};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crate::cancel::{CancelReason, CancellationToken};
use crate::latch::CountdownLatch;

/// Result of one worker
#[derive(Debug)]
pub struct WorkerResult<T> {
    /// Worker id in `[0, count)`
    pub tid: Tid,
    /// What the worker returned
    pub result: HarnessResult<T>,
}

impl<T> WorkerResult<T> {
    /// Whether the worker returned `Ok`
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// A named group of worker threads sharing a cancellation token
#[derive(Debug, Clone)]
pub struct WorkerGroup {
    name: String,
    token: CancellationToken,
}

impl WorkerGroup {
    /// Create a group whose threads are named `<name>-<tid>`
    pub fn new(name: impl Into<String>, token: CancellationToken) -> Self {
        WorkerGroup {
            name: name.into(),
            token,
        }
    }

    /// The group's token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Spawn `count` workers, wait for all of them, return their results in
    /// tid order
    ///
    /// Closures may borrow from the caller; threads are scoped to this call.
    pub fn run<S, T, P, R>(&self, count: usize, prepare: P, run: R) -> Vec<WorkerResult<T>>
    where
        S: Send,
        T: Send,
        P: Fn(Tid) -> HarnessResult<S> + Sync,
        R: Fn(Tid, S) -> HarnessResult<T> + Sync,
    {
        let start = CountdownLatch::new(count);
        let prepare = &prepare;
        let run = &run;
        let start = &start;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(count);
            for tid in 0..count {
                let token = self.token.clone();
                let spawned = thread::Builder::new()
                    .name(format!("{}-{}", self.name, tid))
                    .spawn_scoped(scope, move || {
                        worker_main(tid, &token, start, prepare, run)
                    });
                match spawned {
                    Ok(handle) => handles.push((tid, Some(handle), None)),
                    Err(e) => {
                        tracing::error!(group = %self.name, tid, error = %e, "failed to spawn worker");
                        self.token
                            .cancel(CancelReason::worker(tid, format!("spawn failed: {}", e)));
                        start.count_down();
                        handles.push((tid, None, Some(HarnessError::Io(e))));
                    }
                }
            }

            handles
                .into_iter()
                .map(|(tid, handle, spawn_error)| {
                    let result = match (handle, spawn_error) {
                        (Some(handle), _) => match handle.join() {
                            Ok(result) => result,
                            Err(payload) => Err(HarnessError::Panic(panic_message(payload.as_ref()))),
                        },
                        (None, Some(e)) => Err(e),
                        (None, None) => Err(HarnessError::Panic("worker never started".to_string())),
                    };
                    WorkerResult { tid, result }
                })
                .collect()
        })
    }
}

fn worker_main<S, T, P, R>(
    tid: Tid,
    token: &CancellationToken,
    start: &CountdownLatch,
    prepare: &P,
    run: &R,
) -> HarnessResult<T>
where
    P: Fn(Tid) -> HarnessResult<S>,
    R: Fn(Tid, S) -> HarnessResult<T>,
{
    let arrival = start.arrival();
    let prepared = catch(tid, token, || prepare(tid));
    arrival.arrive_and_wait();

    let state = prepared?;
    tracing::trace!(tid, "worker started");
    let result = catch(tid, token, || run(tid, state));
    tracing::trace!(tid, ok = result.is_ok(), "worker finished");
    result
}

/// Run `f`, turning a panic or an error into a tripped token
fn catch<T>(
    tid: Tid,
    token: &CancellationToken,
    f: impl FnOnce() -> HarnessResult<T>,
) -> HarnessResult<T> {
    let result = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(HarnessError::Panic(panic_message(payload.as_ref()))),
    };
    if let Err(e) = &result {
        if !matches!(e, HarnessError::Cancelled(_)) {
            token.cancel(CancelReason::worker(tid, e.to_string()));
        }
    }
    result
}

/// Text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
