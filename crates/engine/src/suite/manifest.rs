//! Workload manifests
//!
//! One `*.toml` file per workload in a suite directory. The file stem names
//! the workload in reports.
//!
//! ```toml
//! workload = "indexed_insert_base"
//! modifiers = ["indexed_noindex"]
//! thread_count = 10
//! iterations = 50
//! tolerated_codes = [11000]
//!
//! [data]
//! indexedField = "indexed_insert_base_x"
//! ```

use fsm_core::{ConfigError, Document, ErrorCode, HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::registry::WorkloadRegistry;
use crate::workload::WorkloadConfig;

/// Parsed manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Name shown in reports; the file stem when loaded from disk
    #[serde(skip)]
    pub name: String,
    /// Registered workload to build
    pub workload: String,
    /// Registered modifiers, applied in order
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// Overrides the workload's thread count
    #[serde(default)]
    pub thread_count: Option<usize>,
    /// Overrides the workload's iteration count
    #[serde(default)]
    pub iterations: Option<usize>,
    /// Overrides the workload's collection ownership
    #[serde(default)]
    pub owns_collection: Option<bool>,
    /// Extra tolerated error codes
    #[serde(default)]
    pub tolerated_codes: Vec<i32>,
    /// Entries merged over the workload's initial data
    #[serde(default)]
    pub data: Document,
}

impl Manifest {
    /// Parse manifest text
    ///
    /// # Errors
    ///
    /// `Parse` with `origin` as the path.
    pub fn parse(name: impl Into<String>, origin: &str, text: &str) -> HarnessResult<Self> {
        let mut manifest: Manifest = toml::from_str(text).map_err(|e| HarnessError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        manifest.name = name.into();
        Ok(manifest)
    }

    /// Read a manifest file
    ///
    /// # Errors
    ///
    /// `Io` if unreadable, `Parse` if malformed.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(name, &path.display().to_string(), &text)
    }

    /// Build the config this manifest describes
    ///
    /// # Errors
    ///
    /// `UnknownWorkload` / `UnknownModifier` for unregistered names.
    pub fn into_config(&self, registry: &WorkloadRegistry) -> Result<WorkloadConfig, ConfigError> {
        let mut config = registry.build(&self.workload)?;
        for modifier in &self.modifiers {
            config = registry.modify(modifier, &config)?;
        }

        if !self.name.is_empty() {
            config.name = self.name.clone();
        }
        if let Some(n) = self.thread_count {
            config.thread_count = n;
        }
        if let Some(n) = self.iterations {
            config.iterations = n;
        }
        if let Some(owns) = self.owns_collection {
            config.owns_collection = owns;
        }
        for &code in &self.tolerated_codes {
            config.classifier.add_code(ErrorCode(code));
        }
        for (key, value) in &self.data {
            config.data.insert(key.clone(), value.clone());
        }
        Ok(config)
    }
}
