//! What state functions and lifecycle hooks see
//!
//! - [`SharedData`]: the workload's `data` map, shared by every worker
//! - [`HookContext`]: borrowed view handed to `setup` / `teardown`
//! - [`StateContext`]: one worker's owned state, handed to every state
//!   function by `&mut`

use fsm_concurrency::CancellationToken;
use fsm_core::{
    Client, Cluster, Collection, CommandResult, Database, Document, HarnessResult, Tid, Value,
};
use parking_lot::RwLock;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

use crate::classify::{self, Classification, ErrorClassifier};

/// Workload data shared by every worker of one run
///
/// Created fresh from the config's `data` for each run, so runs never leak
/// changes into the config. Workloads decide their own mutation discipline;
/// the lock only keeps individual reads and writes whole.
#[derive(Debug, Clone, Default)]
pub struct SharedData {
    inner: Arc<RwLock<Document>>,
}

impl SharedData {
    /// Wrap an initial map
    pub fn new(initial: Document) -> Self {
        SharedData {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Clone of one entry
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    /// Entry as bool
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.inner.read().get(key).and_then(Value::as_bool)
    }

    /// Entry as integer
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.inner.read().get(key).and_then(Value::as_int)
    }

    /// Entry as owned string
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).and_then(Value::as_str).map(str::to_string)
    }

    /// Insert or replace an entry
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.inner.write().insert(key.to_string(), value.into());
    }

    /// Remove an entry
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().remove(key)
    }

    /// Whether an entry exists
    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Read-modify-write under one lock acquisition
    pub fn update<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Copy of the whole map
    pub fn snapshot(&self) -> Document {
        self.inner.read().clone()
    }
}

/// Context for `setup` and `teardown`
pub struct HookContext<'a> {
    /// Workload name
    pub workload: &'a str,
    /// Cluster under test
    pub cluster: &'a dyn Cluster,
    /// Connection dedicated to lifecycle hooks
    pub client: &'a Arc<dyn Client>,
    /// Workload database
    pub db: &'a Arc<dyn Database>,
    /// Workload collection name
    pub coll_name: &'a str,
    /// Shared workload data
    pub data: &'a SharedData,
    /// Worker count of this run, after scaling
    pub thread_count: usize,
    /// Iterations per worker of this run, after scaling
    pub iterations: usize,
    /// Whether no other workload touches the collection
    pub owns_collection: bool,
}

impl HookContext<'_> {
    /// Handle to the workload collection
    pub fn collection(&self) -> Arc<dyn Collection> {
        self.db.collection(self.coll_name)
    }

    /// See [`classify::assert_always`]
    pub fn assert_always(&self, cond: bool, msg: impl FnOnce() -> String) -> HarnessResult<()> {
        classify::assert_always(cond, msg)
    }

    /// See [`classify::assert_when_own_coll`]
    pub fn assert_when_own_coll(
        &self,
        cond: bool,
        msg: impl FnOnce() -> String,
    ) -> HarnessResult<()> {
        classify::assert_when_own_coll(self.owns_collection, cond, msg)
    }
}

/// One worker's view of the run
pub struct StateContext {
    /// Worker id in `[0, thread_count)`
    pub tid: Tid,
    /// Index of the current step, from 0
    pub iteration: usize,
    /// Workload name
    pub workload: String,
    /// This worker's own connection
    pub client: Arc<dyn Client>,
    /// Workload database through this worker's connection
    pub db: Arc<dyn Database>,
    /// Workload collection name
    pub coll_name: String,
    /// Data shared with every other worker
    pub data: SharedData,
    /// Data private to this worker, starts empty
    pub locals: Document,
    /// This worker's seeded random stream
    pub rng: ChaCha8Rng,
    /// Worker count of this run
    pub thread_count: usize,
    /// Whether no other workload touches the collection
    pub owns_collection: bool,
    classifier: ErrorClassifier,
    token: CancellationToken,
    tolerated: u64,
}

impl StateContext {
    /// Assemble a context; the runner does this once per worker
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tid: Tid,
        workload: &str,
        client: Arc<dyn Client>,
        db_name: &str,
        coll_name: &str,
        data: SharedData,
        rng: ChaCha8Rng,
        thread_count: usize,
        owns_collection: bool,
        classifier: ErrorClassifier,
        token: CancellationToken,
    ) -> Self {
        let db = client.database(db_name);
        StateContext {
            tid,
            iteration: 0,
            workload: workload.to_string(),
            client,
            db,
            coll_name: coll_name.to_string(),
            data,
            locals: Document::new(),
            rng,
            thread_count,
            owns_collection,
            classifier,
            token,
            tolerated: 0,
        }
    }

    /// Handle to the workload collection
    pub fn collection(&self) -> Arc<dyn Collection> {
        self.db.collection(&self.coll_name)
    }

    /// Errors this workload tolerates
    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Whether the workload has been asked to stop
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Tolerated errors seen so far by this worker
    pub fn tolerated_errors(&self) -> u64 {
        self.tolerated
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Record one tolerated error
    pub(crate) fn note_tolerated(&mut self) {
        self.tolerated += 1;
    }

    /// Pass a result through the workload's classifier
    ///
    /// Returns `Ok(None)` for a tolerated failure, which is counted.
    ///
    /// # Errors
    ///
    /// Returns unexpected failures.
    pub fn tolerate<T>(&mut self, result: CommandResult<T>) -> HarnessResult<Option<T>> {
        match result {
            Ok(v) => Ok(Some(v)),
            Err(e) => match self.classifier.classify_command(&e) {
                Classification::Tolerated(code) => {
                    self.tolerated += 1;
                    tracing::warn!(
                        workload = %self.workload,
                        tid = self.tid,
                        iteration = self.iteration,
                        code = code.0,
                        error = %e,
                        "tolerated error"
                    );
                    Ok(None)
                }
                Classification::Unexpected => Err(e.into()),
            },
        }
    }

    /// See [`classify::assert_always`]
    pub fn assert_always(&self, cond: bool, msg: impl FnOnce() -> String) -> HarnessResult<()> {
        classify::assert_always(cond, msg)
    }

    /// See [`classify::assert_when_own_coll`]
    pub fn assert_when_own_coll(
        &self,
        cond: bool,
        msg: impl FnOnce() -> String,
    ) -> HarnessResult<()> {
        classify::assert_when_own_coll(self.owns_collection, cond, msg)
    }
}
