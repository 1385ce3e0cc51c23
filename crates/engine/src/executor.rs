//! The per-worker state-machine loop
//!
//! ```text
//! state = start_state
//! for i in 0..iterations:
//!     stop if the workload is cancelled
//!     run states[state]
//!     classify any error: tolerated → count and go on, otherwise → trip
//!     the token and stop
//!     state = sample(transitions[state]), stop if there is no exit
//! ```
//!
//! The token is checked once per iteration, so after a sibling trips it a
//! worker runs at most the state it is already in.

use fsm_concurrency::{panic_message, CancelReason};
use fsm_core::{ConfigError, HarnessError, HarnessResult};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, warn};

use crate::context::StateContext;
use crate::report::{Termination, WorkerFailure, WorkerOutcome};
use crate::workload::{StateFn, WorkloadConfig};

/// Run one worker to completion
///
/// Never returns an error: every way the loop can end is recorded in the
/// outcome. An unexpected failure cancels the workload's token before
/// returning.
pub fn run_worker(config: &WorkloadConfig, mut ctx: StateContext) -> WorkerOutcome {
    let tid = ctx.tid;
    let mut visited: BTreeMap<String, u64> = BTreeMap::new();
    let mut iterations_run = 0;
    let mut failure = None;
    let mut termination = Termination::Completed;
    let mut previous: Option<String> = None;
    let mut state = config.start_state.clone();

    debug!(workload = %config.name, tid, iterations = config.iterations, "worker starting");

    for i in 0..config.iterations {
        if ctx.is_cancelled() {
            termination = Termination::Cancelled;
            break;
        }
        ctx.iteration = i;

        let result = match config.states.get(&state) {
            Some(f) => call_state(f, &mut ctx),
            None => Err(missing_state(config, previous.as_deref(), &state)),
        };
        iterations_run += 1;
        *visited.entry(state.clone()).or_insert(0) += 1;

        match result {
            Ok(()) => {}
            Err(HarnessError::Cancelled(_)) if ctx.is_cancelled() => {
                termination = Termination::Cancelled;
                break;
            }
            Err(e) if ctx.classifier().is_tolerated(&e) => {
                ctx.note_tolerated();
                warn!(
                    workload = %config.name,
                    tid,
                    state = %state,
                    iteration = i,
                    code = e.code().map(|c| c.0),
                    error = %e,
                    "tolerated error"
                );
            }
            Err(e) => {
                error!(
                    workload = %config.name,
                    tid,
                    state = %state,
                    iteration = i,
                    error = %e,
                    "state failed"
                );
                ctx.token().cancel(CancelReason::worker(
                    tid,
                    format!("state '{}' at iteration {}: {}", state, i, e),
                ));
                failure = Some(WorkerFailure {
                    state: Some(state.clone()),
                    iteration: Some(i),
                    error: e,
                });
                termination = Termination::Failed;
                break;
            }
        }

        if i + 1 == config.iterations {
            break;
        }
        match config.transitions.sample_next(&state, &mut ctx.rng) {
            Some(next) => {
                let next = next.to_string();
                previous = Some(std::mem::replace(&mut state, next));
            }
            None => {
                debug!(workload = %config.name, tid, state = %state, "terminal state reached");
                termination = Termination::TerminalState(state.clone());
                break;
            }
        }
    }

    debug!(
        workload = %config.name,
        tid,
        iterations_run,
        termination = %termination,
        "worker finished"
    );

    WorkerOutcome {
        tid,
        iterations_run,
        states_visited: visited,
        tolerated_errors: ctx.tolerated_errors(),
        termination,
        failure,
    }
}

fn call_state(f: &StateFn, ctx: &mut StateContext) -> HarnessResult<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| f(ctx))) {
        Ok(result) => result,
        Err(payload) => Err(HarnessError::Panic(panic_message(payload.as_ref()))),
    }
}

fn missing_state(config: &WorkloadConfig, from: Option<&str>, state: &str) -> HarnessError {
    let err = match from {
        Some(from) => ConfigError::DanglingTransition {
            workload: config.name.clone(),
            from: from.to_string(),
            to: state.to_string(),
        },
        None => ConfigError::UnknownStartState {
            workload: config.name.clone(),
            state: state.to_string(),
        },
    };
    err.into()
}
