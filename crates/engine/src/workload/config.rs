//! Workload configuration
//!
//! A [`WorkloadConfig`] is the typed form of a workload's declarative
//! description: named state functions, a transition matrix, a start state,
//! worker and iteration counts, initial shared data and optional lifecycle
//! hooks.
//!
//! Functions are held behind `Arc`, so cloning a config is cheap and a clone
//! can be changed freely without touching the original.
//!
//! # Example
//!
//! ```
//! use fsm_engine::WorkloadConfig;
//!
//! let config = WorkloadConfig::new("insert_only")
//!     .threads(5)
//!     .iterations(20)
//!     .state("insert", |ctx| {
//!         let id = format!("{}-{}", ctx.tid, ctx.iteration);
//!         ctx.collection().insert_one(fsm_core::doc! { "_id" => id })?;
//!         Ok(())
//!     })
//!     .transition("insert", "insert", 1.0)
//!     .start_state("insert");
//! assert!(config.validate().is_ok());
//! ```

use fsm_core::{Document, ErrorCode, HarnessResult, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::classify::ErrorClassifier;
use crate::context::{HookContext, StateContext};
use crate::transitions::TransitionTable;

/// One state: performs a database operation for the calling worker
pub type StateFn = Arc<dyn Fn(&mut StateContext) -> HarnessResult<()> + Send + Sync>;

/// `setup` / `teardown` hook
pub type HookFn = Arc<dyn Fn(&HookContext<'_>) -> HarnessResult<()> + Send + Sync>;

/// Declarative description of one workload
#[derive(Clone)]
pub struct WorkloadConfig {
    /// Name used in logs and reports
    pub name: String,
    /// Concurrent workers
    pub thread_count: usize,
    /// State transitions per worker
    pub iterations: usize,
    /// State every worker starts in
    pub start_state: String,
    /// State functions by name
    pub states: BTreeMap<String, StateFn>,
    /// Transition matrix
    pub transitions: TransitionTable,
    /// Initial shared data
    pub data: Document,
    /// Runs once before any worker starts
    pub setup: Option<HookFn>,
    /// Runs once after every worker has finished
    pub teardown: Option<HookFn>,
    /// Whether this workload is the only writer of its collection
    pub owns_collection: bool,
    /// Errors tolerated under contention
    pub classifier: ErrorClassifier,
}

impl WorkloadConfig {
    /// Empty config: one thread, zero iterations, no states
    pub fn new(name: impl Into<String>) -> Self {
        WorkloadConfig {
            name: name.into(),
            thread_count: 1,
            iterations: 0,
            start_state: String::new(),
            states: BTreeMap::new(),
            transitions: TransitionTable::new(),
            data: Document::new(),
            setup: None,
            teardown: None,
            owns_collection: true,
            classifier: ErrorClassifier::new(),
        }
    }

    /// Set the worker count
    pub fn threads(mut self, n: usize) -> Self {
        self.thread_count = n;
        self
    }

    /// Set the iteration count
    pub fn iterations(mut self, n: usize) -> Self {
        self.iterations = n;
        self
    }

    /// Set the start state
    pub fn start_state(mut self, name: impl Into<String>) -> Self {
        self.start_state = name.into();
        self
    }

    /// Add or replace a state
    pub fn state<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut StateContext) -> HarnessResult<()> + Send + Sync + 'static,
    {
        self.states.insert(name.into(), Arc::new(f));
        self
    }

    /// Set one transition weight
    pub fn transition(mut self, from: &str, to: &str, weight: f64) -> Self {
        self.transitions.insert(from, to, weight);
        self
    }

    /// Replace the transition matrix
    pub fn transitions(mut self, table: TransitionTable) -> Self {
        self.transitions = table;
        self
    }

    /// Set one entry of the initial data
    pub fn data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// Set the setup hook
    pub fn setup<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> HarnessResult<()> + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(f));
        self
    }

    /// Set the teardown hook
    pub fn teardown<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> HarnessResult<()> + Send + Sync + 'static,
    {
        self.teardown = Some(Arc::new(f));
        self
    }

    /// Declare whether the workload owns its collection
    pub fn owns_collection(mut self, owns: bool) -> Self {
        self.owns_collection = owns;
        self
    }

    /// Tolerate additional error codes
    pub fn tolerate(mut self, codes: impl IntoIterator<Item = ErrorCode>) -> Self {
        for code in codes {
            self.classifier.add_code(code);
        }
        self
    }

    /// Replace the error classifier
    pub fn classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Run the setup hook, if any
    ///
    /// # Errors
    ///
    /// Propagates the hook's failure.
    pub fn run_setup(&self, ctx: &HookContext<'_>) -> HarnessResult<()> {
        match &self.setup {
            Some(f) => f(ctx),
            None => Ok(()),
        }
    }

    /// Run the teardown hook, if any
    ///
    /// # Errors
    ///
    /// Propagates the hook's failure.
    pub fn run_teardown(&self, ctx: &HookContext<'_>) -> HarnessResult<()> {
        match &self.teardown {
            Some(f) => f(ctx),
            None => Ok(()),
        }
    }

    /// Names of the defined states
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }
}

impl fmt::Debug for WorkloadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkloadConfig")
            .field("name", &self.name)
            .field("thread_count", &self.thread_count)
            .field("iterations", &self.iterations)
            .field("start_state", &self.start_state)
            .field("states", &self.states.keys().collect::<Vec<_>>())
            .field("transitions", &self.transitions)
            .field("data", &self.data)
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .field("owns_collection", &self.owns_collection)
            .field("classifier", &self.classifier)
            .finish()
    }
}
