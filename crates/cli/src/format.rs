//! Report → human/json string formatting.
//!
//! - **Human** (default): one line per workload with timing, failure detail
//!   indented below it, a summary line last
//! - **JSON** (`--json`): `serde_json::to_string_pretty`

use fsmharness::{LoadedWorkload, SuiteReport, WorkloadRegistry, WorkloadReport};
use serde_json::{json, Value as JsonValue};

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

fn pretty(value: &JsonValue) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Format a finished suite.
pub fn format_suite(report: &SuiteReport, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => report.to_string(),
        OutputMode::Json => pretty(&json!({
            "seed": report.seed,
            "elapsed_secs": report.elapsed.as_secs_f64(),
            "passed": report.passed(),
            "workloads": report.workloads.iter().map(workload_json).collect::<Vec<_>>(),
        })),
    }
}

fn workload_json(w: &WorkloadReport) -> JsonValue {
    let mut errors = Vec::new();
    if let Some(e) = &w.config_error {
        errors.push(format!("config: {}", e));
    }
    if let Some(e) = &w.setup_error {
        errors.push(format!("setup: {}", e));
    }
    errors.extend(w.failures().map(|o| o.to_string()));
    if let Some(e) = &w.teardown_error {
        errors.push(format!("teardown: {}", e));
    }

    json!({
        "name": w.name,
        "status": w.status().to_string(),
        "namespace": w.namespace.as_ref().map(|ns| ns.to_string()),
        "seed": w.seed,
        "threads": w.thread_count,
        "iterations": w.iterations,
        "iterations_run": w.total_iterations(),
        "tolerated_errors": w.total_tolerated(),
        "duration_secs": w.duration.as_secs_f64(),
        "warnings": w.warnings,
        "errors": errors,
    })
}

/// Format the built-in registry.
pub fn format_registry(registry: &WorkloadRegistry, mode: OutputMode) -> String {
    let workloads: Vec<&str> = registry.workload_names().collect();
    let modifiers: Vec<&str> = registry.modifier_names().collect();
    match mode {
        OutputMode::Json => pretty(&json!({ "workloads": workloads, "modifiers": modifiers })),
        OutputMode::Human => {
            let mut out = String::from("workloads:");
            for name in workloads {
                out.push_str("\n  ");
                out.push_str(name);
            }
            out.push_str("\nmodifiers:");
            for name in modifiers {
                out.push_str("\n  ");
                out.push_str(name);
            }
            out
        }
    }
}

/// Format the manifests of a suite directory without running them.
pub fn format_manifests(loaded: &[LoadedWorkload], mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&JsonValue::Array(
            loaded
                .iter()
                .map(|l| match &l.config {
                    Ok(c) => json!({
                        "name": l.name,
                        "path": l.path.display().to_string(),
                        "workload": l.workload,
                        "threads": c.thread_count,
                        "iterations": c.iterations,
                    }),
                    Err(e) => json!({
                        "name": l.name,
                        "path": l.path.display().to_string(),
                        "error": e.to_string(),
                    }),
                })
                .collect(),
        )),
        OutputMode::Human => loaded
            .iter()
            .map(|l| match &l.config {
                Ok(c) => format!(
                    "{:<32} {} ({} threads x {} iterations)",
                    l.name,
                    l.workload.as_deref().unwrap_or("?"),
                    c.thread_count,
                    c.iterations
                ),
                Err(e) => format!("{:<32} (error) {}", l.name, e),
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Format an error.
pub fn format_error(err: &anyhow::Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!({ "error": format!("{:#}", err) })),
        OutputMode::Human => format!("(error) {:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsmharness::builtin_registry;

    #[test]
    fn test_registry_listing() {
        let human = format_registry(&builtin_registry(), OutputMode::Human);
        assert!(human.starts_with("workloads:"));
        assert!(human.contains("\n  insert_unique"));
        assert!(human.contains("modifiers:\n  indexed_noindex"));

        let parsed: JsonValue =
            serde_json::from_str(&format_registry(&builtin_registry(), OutputMode::Json)).unwrap();
        assert_eq!(parsed["workloads"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_manifest_listing_names_registry_workload() {
        let mut config = builtin_registry().build("update_inc").unwrap();
        config.name = "nightly_counter".to_string();
        let loaded = vec![LoadedWorkload {
            path: "suite/nightly_counter.toml".into(),
            name: "nightly_counter".to_string(),
            workload: Some("update_inc".to_string()),
            config: Ok(config),
        }];

        let human = format_manifests(&loaded, OutputMode::Human);
        assert!(human.starts_with("nightly_counter"));
        assert!(human.contains(" update_inc ("));

        let parsed: JsonValue =
            serde_json::from_str(&format_manifests(&loaded, OutputMode::Json)).unwrap();
        assert_eq!(parsed[0]["name"], "nightly_counter");
        assert_eq!(parsed[0]["workload"], "update_inc");
    }

    #[test]
    fn test_error_formats() {
        let err = anyhow::anyhow!("boom").context("loading suite");
        assert_eq!(format_error(&err, OutputMode::Human), "(error) loading suite: boom");
        let parsed: JsonValue = serde_json::from_str(&format_error(&err, OutputMode::Json)).unwrap();
        assert_eq!(parsed["error"], "loading suite: boom");
    }
}
