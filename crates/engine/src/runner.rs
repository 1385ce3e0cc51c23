//! Workload runner
//!
//! Drives a workload through its lifecycle:
//!
//! ```text
//! scale → validate → allocate namespace → setup
//!       → worker pool (start barrier, state loop, shared cancellation)
//!       → teardown → drop the workload database
//! ```
//!
//! Three entry points share those phases:
//!
//! - [`Runner::run_workload`]: one workload
//! - [`Runner::run_workloads_serially`]: one after another
//! - [`Runner::run_workloads_in_parallel`]: greedy batches bounded by
//!   `max_allowed_threads`. Inside a batch every setup runs first, then every
//!   worker pool runs at once, then every teardown.
//!
//! Each workload has its own cancellation token, so a failure stops the
//! failing workload's siblings and nothing else.

use fsm_concurrency::{panic_message, CancellationToken, WorkerGroup};
use fsm_core::{Client, Cluster, ConfigError, Database, HarnessError, Namespace};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::context::{HookContext, SharedData, StateContext};
use crate::executor::run_worker;
use crate::names::NameAllocator;
use crate::report::{SuiteReport, WorkerOutcome, WorkloadReport};
use crate::workload::WorkloadConfig;

/// Default database name prefix
pub const DEFAULT_DB_PREFIX: &str = "test";

/// Default upper bound on concurrently running workers
pub const DEFAULT_MAX_ALLOWED_THREADS: usize = 100;

/// How a suite schedules its workloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Batches of workloads run at the same time
    #[default]
    Parallel,
    /// One workload at a time
    Serial,
}

impl std::str::FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parallel" => Ok(RunMode::Parallel),
            "serial" => Ok(RunMode::Serial),
            other => Err(ConfigError::InvalidSetting {
                key: "mode".to_string(),
                reason: format!("expected 'parallel' or 'serial', got '{}'", other),
            }),
        }
    }
}

/// Execution options shared by every workload of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Root of every worker's RNG seed
    pub seed: u64,
    /// Prepended to allocated database names
    pub db_name_prefix: String,
    /// All workloads use one database
    pub same_db: bool,
    /// All workloads use one collection; implies `same_db`
    pub same_collection: bool,
    /// Scales each workload's `thread_count` (result at least 1)
    pub thread_multiplier: f64,
    /// Scales each workload's `iterations`
    pub iteration_multiplier: f64,
    /// Worker budget of one parallel batch
    pub max_allowed_threads: usize,
    /// Drop each workload's database after teardown
    pub cleanup: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            seed: rand::random(),
            db_name_prefix: DEFAULT_DB_PREFIX.to_string(),
            same_db: false,
            same_collection: false,
            thread_multiplier: 1.0,
            iteration_multiplier: 1.0,
            max_allowed_threads: DEFAULT_MAX_ALLOWED_THREADS,
            cleanup: true,
        }
    }
}

impl RunOptions {
    /// Default options with a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        RunOptions {
            seed,
            ..Self::default()
        }
    }

    /// Check ranges
    ///
    /// # Errors
    ///
    /// `InvalidSetting` for a non-positive or non-finite multiplier, or a
    /// zero thread budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("thread_multiplier", self.thread_multiplier),
            ("iteration_multiplier", self.iteration_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidSetting {
                    key: key.to_string(),
                    reason: format!("must be a positive number, got {}", value),
                });
            }
        }
        if self.max_allowed_threads == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "max_allowed_threads".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Whether workloads share a database
    pub fn shares_db(&self) -> bool {
        self.same_db || self.same_collection
    }

    /// `thread_count` after scaling; zero stays zero so validation sees it
    pub fn scaled_threads(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        ((n as f64 * self.thread_multiplier).round() as usize).max(1)
    }

    /// `iterations` after scaling
    pub fn scaled_iterations(&self, n: usize) -> usize {
        (n as f64 * self.iteration_multiplier).round() as usize
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed of one worker's RNG
///
/// Pure function of its inputs, so one logged run seed replays every
/// worker's transition choices.
pub fn derive_seed(run_seed: u64, workload_index: usize, tid: usize) -> u64 {
    let workload = splitmix64(run_seed ^ splitmix64(workload_index as u64));
    splitmix64(workload ^ (tid as u64).wrapping_mul(0xD134_2543_DE82_EF95))
}

/// Group workloads into parallel batches
///
/// Greedy and order preserving: a batch takes workloads until the next one
/// would push its total over `max_threads`. A workload that alone exceeds
/// the budget gets a batch of its own.
pub fn plan_batches(thread_counts: &[usize], max_threads: usize) -> Vec<Vec<usize>> {
    let mut batches = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut total = 0;
    for (i, &n) in thread_counts.iter().enumerate() {
        if !current.is_empty() && total + n > max_threads {
            batches.push(std::mem::take(&mut current));
            total = 0;
        }
        current.push(i);
        total += n;
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// A workload whose setup succeeded and whose pool has not yet run
struct Staged {
    index: usize,
    config: WorkloadConfig,
    report: WorkloadReport,
    namespace: Namespace,
    client: Arc<dyn Client>,
    db: Arc<dyn Database>,
    data: SharedData,
    owns_collection: bool,
    token: CancellationToken,
    started: Instant,
}

/// Runs workloads against one cluster
pub struct Runner {
    cluster: Arc<dyn Cluster>,
    options: RunOptions,
    names: NameAllocator,
    shared_db: Option<String>,
    shared_coll: Option<String>,
}

impl Runner {
    /// Create a runner
    ///
    /// Shared namespaces, when requested, are allocated here once.
    pub fn new(cluster: Arc<dyn Cluster>, options: RunOptions) -> Self {
        let names = NameAllocator::new();
        let shared_db = options
            .shares_db()
            .then(|| names.unique_db_name(&options.db_name_prefix));
        let shared_coll = options.same_collection.then(|| names.unique_coll_name());
        Runner {
            cluster,
            options,
            names,
            shared_db,
            shared_coll,
        }
    }

    /// Options in effect
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// The cluster under test
    pub fn cluster(&self) -> &Arc<dyn Cluster> {
        &self.cluster
    }

    /// Run one workload
    pub fn run_workload(&self, config: &WorkloadConfig) -> WorkloadReport {
        match self.stage(0, config) {
            Ok(staged) => {
                let outcomes = self.run_pool(&staged);
                self.finish(staged, outcomes)
            }
            Err(report) => report,
        }
    }

    /// Run workloads one after another
    pub fn run_workloads_serially(&self, configs: &[WorkloadConfig]) -> SuiteReport {
        let started = Instant::now();
        info!(seed = self.options.seed, workloads = configs.len(), mode = "serial", "starting suite");
        let workloads = configs
            .iter()
            .enumerate()
            .map(|(index, config)| match self.stage(index, config) {
                Ok(staged) => {
                    let outcomes = self.run_pool(&staged);
                    self.finish(staged, outcomes)
                }
                Err(report) => report,
            })
            .collect();
        self.suite_report(workloads, started)
    }

    /// Run workloads concurrently in thread-bounded batches
    pub fn run_workloads_in_parallel(&self, configs: &[WorkloadConfig]) -> SuiteReport {
        let started = Instant::now();
        info!(
            seed = self.options.seed,
            workloads = configs.len(),
            mode = "parallel",
            max_allowed_threads = self.options.max_allowed_threads,
            "starting suite"
        );

        let counts: Vec<usize> = configs
            .iter()
            .map(|c| self.options.scaled_threads(c.thread_count))
            .collect();
        let mut reports: Vec<Option<WorkloadReport>> = configs.iter().map(|_| None).collect();

        for batch in plan_batches(&counts, self.options.max_allowed_threads) {
            debug!(workloads = ?batch, "starting batch");

            let mut staged = Vec::with_capacity(batch.len());
            for index in batch {
                match self.stage(index, &configs[index]) {
                    Ok(s) => staged.push(s),
                    Err(report) => reports[index] = Some(report),
                }
            }

            let outcomes: Vec<Vec<WorkerOutcome>> = thread::scope(|scope| {
                let handles: Vec<_> = staged
                    .iter()
                    .map(|s| scope.spawn(move || self.run_pool(s)))
                    .collect();
                handles
                    .into_iter()
                    .map(|h| {
                        h.join().unwrap_or_else(|payload| {
                            vec![WorkerOutcome::aborted(
                                0,
                                HarnessError::Panic(panic_message(payload.as_ref())),
                            )]
                        })
                    })
                    .collect()
            });

            for (s, outcomes) in staged.into_iter().zip(outcomes) {
                let index = s.index;
                reports[index] = Some(self.finish(s, outcomes));
            }
        }

        let workloads = reports.into_iter().flatten().collect();
        self.suite_report(workloads, started)
    }

    /// Run in the given mode
    pub fn run(&self, configs: &[WorkloadConfig], mode: RunMode) -> SuiteReport {
        match mode {
            RunMode::Parallel => self.run_workloads_in_parallel(configs),
            RunMode::Serial => self.run_workloads_serially(configs),
        }
    }

    fn suite_report(&self, workloads: Vec<WorkloadReport>, started: Instant) -> SuiteReport {
        let report = SuiteReport {
            seed: self.options.seed,
            elapsed: started.elapsed(),
            workloads,
        };
        if report.passed() {
            info!(seed = report.seed, elapsed_ms = report.elapsed.as_millis() as u64, "suite passed");
        } else {
            error!(
                seed = report.seed,
                failed = report.failed().count(),
                "suite failed"
            );
        }
        report
    }

    /// Scale, validate, allocate and run setup
    fn stage(&self, index: usize, config: &WorkloadConfig) -> Result<Staged, WorkloadReport> {
        let started = Instant::now();
        let mut config = config.clone();
        config.thread_count = self.options.scaled_threads(config.thread_count);
        config.iterations = self.options.scaled_iterations(config.iterations);

        let mut report = WorkloadReport::empty(config.name.clone(), self.options.seed);
        report.thread_count = config.thread_count;
        report.iterations = config.iterations;

        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!(workload = %config.name, "{}", w);
                }
                report.warnings = warnings;
            }
            Err(e) => {
                error!(workload = %config.name, error = %e, "invalid workload config");
                report.config_error = Some(e.into());
                return Err(report);
            }
        }

        let namespace = Namespace::new(
            self.shared_db
                .clone()
                .unwrap_or_else(|| self.names.unique_db_name(&self.options.db_name_prefix)),
            self.shared_coll
                .clone()
                .unwrap_or_else(|| self.names.unique_coll_name()),
        );
        report.namespace = Some(namespace.clone());
        let owns_collection = config.owns_collection && !self.options.same_collection;

        let client = match self.cluster.connect() {
            Ok(client) => client,
            Err(e) => {
                error!(workload = %config.name, error = %e, "failed to connect");
                report.setup_error = Some(e.into());
                report.duration = started.elapsed();
                return Err(report);
            }
        };
        let db = client.database(&namespace.db);
        let data = SharedData::new(config.data.clone());

        info!(
            workload = %config.name,
            ns = %namespace,
            threads = config.thread_count,
            iterations = config.iterations,
            "starting workload"
        );

        let setup = config.run_setup(&HookContext {
            workload: &config.name,
            cluster: self.cluster.as_ref(),
            client: &client,
            db: &db,
            coll_name: &namespace.coll,
            data: &data,
            thread_count: config.thread_count,
            iterations: config.iterations,
            owns_collection,
        });
        if let Err(e) = setup {
            error!(workload = %config.name, error = %e, "setup failed");
            report.setup_error = Some(e);
            self.cleanup(&config.name, client.as_ref(), &namespace);
            report.duration = started.elapsed();
            return Err(report);
        }

        Ok(Staged {
            index,
            config,
            report,
            namespace,
            client,
            db,
            data,
            owns_collection,
            token: CancellationToken::new(),
            started,
        })
    }

    /// Run every worker of one staged workload
    fn run_pool(&self, staged: &Staged) -> Vec<WorkerOutcome> {
        let config = &staged.config;
        let group = WorkerGroup::new(config.name.clone(), staged.token.clone());
        let results = group.run(
            config.thread_count,
            |tid| {
                let client = self.cluster.connect()?;
                let rng = ChaCha8Rng::seed_from_u64(derive_seed(self.options.seed, staged.index, tid));
                Ok(StateContext::new(
                    tid,
                    &config.name,
                    client,
                    &staged.namespace.db,
                    &staged.namespace.coll,
                    staged.data.clone(),
                    rng,
                    config.thread_count,
                    staged.owns_collection,
                    config.classifier.clone(),
                    staged.token.clone(),
                ))
            },
            |_, ctx| Ok(run_worker(config, ctx)),
        );

        results
            .into_iter()
            .map(|r| match r.result {
                Ok(outcome) => outcome,
                Err(e) => WorkerOutcome::aborted(r.tid, e),
            })
            .collect()
    }

    /// Run teardown, drop the database, close the report
    fn finish(&self, staged: Staged, outcomes: Vec<WorkerOutcome>) -> WorkloadReport {
        let Staged {
            config,
            mut report,
            namespace,
            client,
            db,
            data,
            owns_collection,
            token,
            started,
            ..
        } = staged;

        if let Some(reason) = token.reason() {
            warn!(workload = %config.name, reason = %reason, "workers were cancelled");
        }
        report.outcomes = outcomes;

        let teardown = config.run_teardown(&HookContext {
            workload: &config.name,
            cluster: self.cluster.as_ref(),
            client: &client,
            db: &db,
            coll_name: &namespace.coll,
            data: &data,
            thread_count: config.thread_count,
            iterations: config.iterations,
            owns_collection,
        });
        if let Err(e) = teardown {
            error!(workload = %config.name, error = %e, "teardown failed");
            report.teardown_error = Some(e);
        }

        self.cleanup(&config.name, client.as_ref(), &namespace);
        report.duration = started.elapsed();

        if report.passed() {
            info!(
                workload = %config.name,
                duration_ms = report.duration.as_millis() as u64,
                iterations = report.total_iterations(),
                tolerated = report.total_tolerated(),
                "workload passed"
            );
        } else {
            error!(
                workload = %config.name,
                seed = self.options.seed,
                status = %report.status(),
                "workload failed"
            );
        }
        report
    }

    fn cleanup(&self, workload: &str, client: &dyn Client, namespace: &Namespace) {
        if !self.options.cleanup || self.options.shares_db() {
            return;
        }
        if let Err(e) = client.drop_database(&namespace.db) {
            warn!(workload, db = %namespace.db, error = %e, "failed to drop workload database");
        }
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("topology", &self.cluster.topology())
            .field("options", &self.options)
            .field("shared_db", &self.shared_db)
            .field("shared_coll", &self.shared_coll)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_batches_greedy() {
        assert_eq!(plan_batches(&[5, 5, 5], 10), vec![vec![0, 1], vec![2]]);
        assert_eq!(plan_batches(&[3, 20, 3], 10), vec![vec![0], vec![1], vec![2]]);
        assert_eq!(plan_batches(&[], 10), Vec::<Vec<usize>>::new());
        assert_eq!(plan_batches(&[1, 1, 1, 1], 100), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_derive_seed_is_stable_and_spread() {
        assert_eq!(derive_seed(42, 0, 3), derive_seed(42, 0, 3));
        let mut seen = std::collections::HashSet::new();
        for w in 0..8 {
            for tid in 0..64 {
                assert!(seen.insert(derive_seed(42, w, tid)));
            }
        }
        assert_ne!(derive_seed(1, 0, 0), derive_seed(2, 0, 0));
    }

    #[test]
    fn test_scaling() {
        let o = RunOptions {
            thread_multiplier: 0.1,
            iteration_multiplier: 2.5,
            ..RunOptions::with_seed(1)
        };
        assert_eq!(o.scaled_threads(5), 1);
        assert_eq!(o.scaled_threads(0), 0);
        assert_eq!(o.scaled_iterations(4), 10);
    }

    #[test]
    fn test_options_validate() {
        assert!(RunOptions::with_seed(1).validate().is_ok());
        let bad = RunOptions {
            thread_multiplier: 0.0,
            ..RunOptions::with_seed(1)
        };
        assert!(matches!(bad.validate(), Err(ConfigError::InvalidSetting { .. })));
        let bad = RunOptions {
            max_allowed_threads: 0,
            ..RunOptions::with_seed(1)
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_run_mode_parse() {
        assert_eq!("serial".parse::<RunMode>().unwrap(), RunMode::Serial);
        assert!("both".parse::<RunMode>().is_err());
        assert_eq!(RunMode::default(), RunMode::Parallel);
    }
}
