//! Suites: a directory of workload manifests plus an optional `fsm.toml`
//!
//! [`run_suite`] discovers manifests, builds each config through the
//! registry and hands the buildable ones to the runner. A manifest that
//! cannot be read or built fails as its own workload; the rest still run.

mod config;
mod discovery;
mod manifest;

pub use config::{HarnessConfig, CONFIG_FILE_NAME};
pub use discovery::{discover_manifests, is_blacklisted};
pub use manifest::Manifest;

use fsm_core::{HarnessError, HarnessResult};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::registry::WorkloadRegistry;
use crate::report::{SuiteReport, WorkloadReport};
use crate::runner::{RunMode, Runner};
use crate::workload::WorkloadConfig;

/// A discovered manifest and what came of building it
#[derive(Debug)]
pub struct LoadedWorkload {
    /// Manifest path
    pub path: PathBuf,
    /// Name used in reports
    pub name: String,
    /// Registry workload the manifest asked for, if it could be read
    pub workload: Option<String>,
    /// The config, or why it could not be built
    pub config: HarnessResult<WorkloadConfig>,
}

/// Discover and build every manifest in `dir`
///
/// # Errors
///
/// `Io` if the directory cannot be listed. Per-manifest failures are kept
/// in the returned entries.
pub fn load_suite(
    dir: &Path,
    registry: &WorkloadRegistry,
    blacklist: &[String],
) -> HarnessResult<Vec<LoadedWorkload>> {
    let loaded = discover_manifests(dir, blacklist)?
        .into_iter()
        .map(|path| {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let manifest = Manifest::load(&path);
            let workload = manifest.as_ref().ok().map(|m| m.workload.clone());
            let config =
                manifest.and_then(|m| m.into_config(registry).map_err(HarnessError::from));
            if let Err(e) = &config {
                tracing::error!(manifest = %path.display(), error = %e, "failed to load workload");
            }
            LoadedWorkload {
                path,
                name,
                workload,
                config,
            }
        })
        .collect();
    Ok(loaded)
}

/// Run every workload of a suite directory
///
/// Reports come back in manifest order, load failures included.
///
/// # Errors
///
/// `Io` if the directory cannot be listed.
pub fn run_suite(
    runner: &Runner,
    dir: &Path,
    registry: &WorkloadRegistry,
    blacklist: &[String],
    mode: RunMode,
) -> HarnessResult<SuiteReport> {
    let started = Instant::now();
    let loaded = load_suite(dir, registry, blacklist)?;

    let mut runnable = Vec::new();
    let mut slots = Vec::with_capacity(loaded.len());
    for entry in loaded {
        match entry.config {
            Ok(config) => {
                runnable.push(config);
                slots.push(None);
            }
            Err(e) => slots.push(Some(WorkloadReport::config_failure(
                entry.name,
                runner.options().seed,
                e,
            ))),
        }
    }

    let mut ran = runner.run(&runnable, mode).workloads.into_iter();
    let workloads = slots
        .into_iter()
        .filter_map(|slot| slot.or_else(|| ran.next()))
        .collect();

    Ok(SuiteReport {
        seed: runner.options().seed,
        elapsed: started.elapsed(),
        workloads,
    })
}
