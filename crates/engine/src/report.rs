//! Run results
//!
//! ```text
//! SuiteReport
//!   └── WorkloadReport (one per workload)
//!         └── WorkerOutcome (one per tid)
//! ```
//!
//! Every level implements `Display`; the suite's rendering is what the
//! runner binary prints. Failure lines carry the run seed so the
//! interleaving can be replayed.

use fsm_core::{HarnessError, Namespace, Tid};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// How a worker's loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Ran every iteration
    Completed,
    /// Reached a state with no usable outgoing edge
    TerminalState(String),
    /// Observed the workload's cancellation token
    Cancelled,
    /// An unexpected error ended the loop
    Failed,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Completed => f.write_str("completed"),
            Termination::TerminalState(s) => write!(f, "stopped in terminal state '{}'", s),
            Termination::Cancelled => f.write_str("cancelled"),
            Termination::Failed => f.write_str("failed"),
        }
    }
}

/// Where and why a worker failed
#[derive(Debug)]
pub struct WorkerFailure {
    /// State being executed, if the failure happened inside one
    pub state: Option<String>,
    /// Iteration index, if the failure happened inside one
    pub iteration: Option<usize>,
    /// The error
    pub error: HarnessError,
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.state, self.iteration) {
            (Some(state), Some(i)) => write!(f, "in state '{}' at iteration {}: {}", state, i, self.error),
            _ => write!(f, "{}", self.error),
        }
    }
}

/// Result of one worker
#[derive(Debug)]
pub struct WorkerOutcome {
    /// Worker id
    pub tid: Tid,
    /// State functions executed, tolerated failures included
    pub iterations_run: usize,
    /// Executions per state
    pub states_visited: BTreeMap<String, u64>,
    /// Failures swallowed by the classifier
    pub tolerated_errors: u64,
    /// How the loop ended
    pub termination: Termination,
    /// Set when the worker failed
    pub failure: Option<WorkerFailure>,
}

impl WorkerOutcome {
    /// Outcome for a worker whose loop never produced a result: a failed
    /// connection, or a panic outside any state function
    pub fn aborted(tid: Tid, error: HarnessError) -> Self {
        WorkerOutcome {
            tid,
            iterations_run: 0,
            states_visited: BTreeMap::new(),
            tolerated_errors: 0,
            termination: Termination::Failed,
            failure: Some(WorkerFailure {
                state: None,
                iteration: None,
                error,
            }),
        }
    }

    /// Whether the worker did not fail
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

impl fmt::Display for WorkerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tid {}: {} after {} iterations ({} tolerated errors)",
            self.tid, self.termination, self.iterations_run, self.tolerated_errors
        )?;
        if let Some(failure) = &self.failure {
            write!(f, " {}", failure)?;
        }
        Ok(())
    }
}

/// Overall verdict of one workload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadStatus {
    /// Everything passed
    Passed,
    /// Config was rejected; nothing ran
    ConfigError,
    /// Setup failed; workers and teardown were skipped
    SetupFailed,
    /// At least one worker failed
    WorkersFailed,
    /// Workers passed but teardown failed
    TeardownFailed,
}

impl WorkloadStatus {
    /// Whether this is a pass
    pub fn is_pass(self) -> bool {
        self == WorkloadStatus::Passed
    }
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkloadStatus::Passed => "PASS",
            WorkloadStatus::ConfigError => "FAIL (config)",
            WorkloadStatus::SetupFailed => "FAIL (setup)",
            WorkloadStatus::WorkersFailed => "FAIL (workers)",
            WorkloadStatus::TeardownFailed => "FAIL (teardown)",
        };
        f.write_str(s)
    }
}

/// Result of one workload
#[derive(Debug)]
pub struct WorkloadReport {
    /// Workload name
    pub name: String,
    /// Namespace the workload ran against, if it got that far
    pub namespace: Option<Namespace>,
    /// Run seed
    pub seed: u64,
    /// Workers after scaling
    pub thread_count: usize,
    /// Iterations per worker after scaling
    pub iterations: usize,
    /// Wall time from setup start to teardown end
    pub duration: Duration,
    /// One entry per worker, in tid order
    pub outcomes: Vec<WorkerOutcome>,
    /// Validation warnings
    pub warnings: Vec<String>,
    /// Rejected config
    pub config_error: Option<HarnessError>,
    /// Failed setup
    pub setup_error: Option<HarnessError>,
    /// Failed teardown
    pub teardown_error: Option<HarnessError>,
}

impl WorkloadReport {
    /// Report for a workload whose config never ran
    pub fn config_failure(name: impl Into<String>, seed: u64, error: HarnessError) -> Self {
        WorkloadReport {
            config_error: Some(error),
            ..Self::empty(name, seed)
        }
    }

    pub(crate) fn empty(name: impl Into<String>, seed: u64) -> Self {
        WorkloadReport {
            name: name.into(),
            namespace: None,
            seed,
            thread_count: 0,
            iterations: 0,
            duration: Duration::ZERO,
            outcomes: Vec::new(),
            warnings: Vec::new(),
            config_error: None,
            setup_error: None,
            teardown_error: None,
        }
    }

    /// Verdict, most severe cause first
    pub fn status(&self) -> WorkloadStatus {
        if self.config_error.is_some() {
            WorkloadStatus::ConfigError
        } else if self.setup_error.is_some() {
            WorkloadStatus::SetupFailed
        } else if self.outcomes.iter().any(|o| !o.is_ok()) {
            WorkloadStatus::WorkersFailed
        } else if self.teardown_error.is_some() {
            WorkloadStatus::TeardownFailed
        } else {
            WorkloadStatus::Passed
        }
    }

    /// Whether the workload passed
    pub fn passed(&self) -> bool {
        self.status().is_pass()
    }

    /// Failed workers
    pub fn failures(&self) -> impl Iterator<Item = &WorkerOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    /// Sum of iterations over all workers
    pub fn total_iterations(&self) -> usize {
        self.outcomes.iter().map(|o| o.iterations_run).sum()
    }

    /// Sum of tolerated errors over all workers
    pub fn total_tolerated(&self) -> u64 {
        self.outcomes.iter().map(|o| o.tolerated_errors).sum()
    }
}

impl fmt::Display for WorkloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} threads x {} iterations, {:.3}s",
            self.status(),
            self.name,
            self.thread_count,
            self.iterations,
            self.duration.as_secs_f64()
        )?;
        if let Some(ns) = &self.namespace {
            write!(f, ", {}", ns)?;
        }
        write!(f, ")")?;

        if let Some(e) = &self.config_error {
            write!(f, "\n  config: {}", e)?;
        }
        if let Some(e) = &self.setup_error {
            write!(f, "\n  setup: {}", e)?;
        }
        for outcome in self.failures() {
            write!(f, "\n  {}", outcome)?;
        }
        if let Some(e) = &self.teardown_error {
            write!(f, "\n  teardown: {}", e)?;
        }
        if !self.passed() {
            write!(f, "\n  replay with seed {}", self.seed)?;
        }
        Ok(())
    }
}

/// Result of a suite
#[derive(Debug)]
pub struct SuiteReport {
    /// Run seed
    pub seed: u64,
    /// Total wall time
    pub elapsed: Duration,
    /// One report per workload
    pub workloads: Vec<WorkloadReport>,
}

impl SuiteReport {
    /// Whether every workload passed
    pub fn passed(&self) -> bool {
        self.workloads.iter().all(WorkloadReport::passed)
    }

    /// Failed workloads
    pub fn failed(&self) -> impl Iterator<Item = &WorkloadReport> {
        self.workloads.iter().filter(|w| !w.passed())
    }

    /// Process exit status: 0 when everything passed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    /// Report for a workload by name
    pub fn workload(&self, name: &str) -> Option<&WorkloadReport> {
        self.workloads.iter().find(|w| w.name == name)
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for w in &self.workloads {
            writeln!(f, "{}", w)?;
        }
        let failed = self.failed().count();
        write!(
            f,
            "{} workloads, {} passed, {} failed in {:.3}s (seed {})",
            self.workloads.len(),
            self.workloads.len() - failed,
            failed,
            self.elapsed.as_secs_f64(),
            self.seed
        )
    }
}
