//! Suite configuration via `fsm.toml`
//!
//! Lives in the suite directory next to the workload manifests. Every field
//! is optional; a missing file means defaults.

use fsm_core::{ConfigError, HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::runner::{RunMode, RunOptions, DEFAULT_DB_PREFIX, DEFAULT_MAX_ALLOWED_THREADS};

/// Config file name looked up in a suite directory
pub const CONFIG_FILE_NAME: &str = "fsm.toml";

/// Suite configuration loaded from `fsm.toml`
///
/// # Example
///
/// ```toml
/// # Fixed seed to replay a failing run
/// seed = 12345
/// mode = "serial"
/// blacklist = ["slow_workload.toml"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessConfig {
    /// Run seed; random when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Prefix of allocated database names
    #[serde(default = "default_db_name_prefix")]
    pub db_name_prefix: String,
    /// `"parallel"` or `"serial"`
    #[serde(default = "default_mode")]
    pub mode: String,
    /// All workloads share one database
    #[serde(default)]
    pub same_db: bool,
    /// All workloads share one collection
    #[serde(default)]
    pub same_collection: bool,
    /// Scales every workload's thread count
    #[serde(default = "default_multiplier")]
    pub thread_multiplier: f64,
    /// Scales every workload's iteration count
    #[serde(default = "default_multiplier")]
    pub iteration_multiplier: f64,
    /// Worker budget of one parallel batch
    #[serde(default = "default_max_allowed_threads")]
    pub max_allowed_threads: usize,
    /// Drop workload databases when done
    #[serde(default = "default_cleanup")]
    pub cleanup: bool,
    /// Manifest file names or stems to skip
    #[serde(default)]
    pub blacklist: Vec<String>,
}

fn default_db_name_prefix() -> String {
    DEFAULT_DB_PREFIX.to_string()
}

fn default_mode() -> String {
    "parallel".to_string()
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_max_allowed_threads() -> usize {
    DEFAULT_MAX_ALLOWED_THREADS
}

fn default_cleanup() -> bool {
    true
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: None,
            db_name_prefix: default_db_name_prefix(),
            mode: default_mode(),
            same_db: false,
            same_collection: false,
            thread_multiplier: default_multiplier(),
            iteration_multiplier: default_multiplier(),
            max_allowed_threads: default_max_allowed_threads(),
            cleanup: default_cleanup(),
            blacklist: Vec::new(),
        }
    }
}

impl HarnessConfig {
    /// Parse the mode string
    ///
    /// # Errors
    ///
    /// `InvalidSetting` unless the mode is `"parallel"` or `"serial"`.
    pub fn run_mode(&self) -> Result<RunMode, ConfigError> {
        self.mode.parse()
    }

    /// Runner options; a missing seed is drawn at random
    ///
    /// # Errors
    ///
    /// `InvalidSetting` for out-of-range values.
    pub fn to_run_options(&self) -> Result<RunOptions, ConfigError> {
        let options = RunOptions {
            seed: self.seed.unwrap_or_else(rand::random),
            db_name_prefix: self.db_name_prefix.clone(),
            same_db: self.same_db,
            same_collection: self.same_collection,
            thread_multiplier: self.thread_multiplier,
            iteration_multiplier: self.iteration_multiplier,
            max_allowed_threads: self.max_allowed_threads,
            cleanup: self.cleanup,
        };
        options.validate()?;
        Ok(options)
    }

    /// Default file content with comments
    pub fn default_toml() -> &'static str {
        r#"# FSM harness suite configuration
#
# Run seed. Leave unset for a random seed; every failure report prints the
# seed so the run can be replayed by setting it here.
# seed = 12345

# Prefix of allocated database names ("<prefix>fsmdb<N>")
db_name_prefix = "test"

# "parallel" (default): workloads run concurrently in batches
# "serial": one workload at a time
mode = "parallel"

# Share one database / one collection across all workloads
same_db = false
same_collection = false

# Scale every workload's thread and iteration counts
thread_multiplier = 1.0
iteration_multiplier = 1.0

# Upper bound on workers running at once in parallel mode
max_allowed_threads = 100

# Drop each workload's database after its teardown
cleanup = true

# Manifests to skip, by file name or stem
blacklist = []
"#
    }

    /// Read and validate a config file
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Parse` if it is not valid TOML for
    /// this shape, `Config` for an invalid value.
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HarnessConfig = toml::from_str(&content).map_err(|e| HarnessError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.run_mode()?;
        config.to_run_options()?;
        Ok(config)
    }

    /// `fsm.toml` from `dir`, or defaults when there is none
    ///
    /// # Errors
    ///
    /// As [`HarnessConfig::from_file`] when the file exists.
    pub fn load_or_default(dir: &Path) -> HarnessResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading suite config");
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }
}
