//! Manifest discovery

use fsm_core::HarnessResult;
use std::path::{Path, PathBuf};

use super::config::CONFIG_FILE_NAME;

/// Whether `path` is named by a blacklist entry, by file name or stem
pub fn is_blacklisted(path: &Path, blacklist: &[String]) -> bool {
    let file_name = path.file_name().and_then(|s| s.to_str());
    let stem = path.file_stem().and_then(|s| s.to_str());
    blacklist
        .iter()
        .any(|entry| Some(entry.as_str()) == file_name || Some(entry.as_str()) == stem)
}

/// Workload manifests in `dir`, sorted by file name
///
/// Lists `*.toml` files (not recursing), leaving out the suite config and
/// blacklisted entries.
///
/// # Errors
///
/// `Io` if the directory cannot be read.
pub fn discover_manifests(dir: &Path, blacklist: &[String]) -> HarnessResult<Vec<PathBuf>> {
    let mut manifests = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        if path.file_name().and_then(|s| s.to_str()) == Some(CONFIG_FILE_NAME) {
            continue;
        }
        if is_blacklisted(&path, blacklist) {
            tracing::info!(manifest = %path.display(), "skipping blacklisted workload");
            continue;
        }
        manifests.push(path);
    }
    manifests.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    tracing::debug!(dir = %dir.display(), count = manifests.len(), "discovered manifests");
    Ok(manifests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "workload = \"x\"\n").unwrap();
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_sorted_toml_only() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.toml");
        touch(dir.path(), "a.toml");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), CONFIG_FILE_NAME);
        std::fs::create_dir(dir.path().join("nested.toml")).unwrap();

        let found = discover_manifests(dir.path(), &[]).unwrap();
        assert_eq!(names(&found), vec!["a.toml", "b.toml"]);
    }

    #[test]
    fn test_blacklist_by_name_or_stem() {
        let dir = TempDir::new().unwrap();
        for name in ["a.toml", "b.toml", "c.toml"] {
            touch(dir.path(), name);
        }
        let found = discover_manifests(dir.path(), &["a.toml".into(), "c".into()]).unwrap();
        assert_eq!(names(&found), vec!["b.toml"]);
    }

    #[test]
    fn test_missing_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = discover_manifests(&dir.path().join("absent"), &[]).unwrap_err();
        assert!(matches!(err, fsm_core::HarnessError::Io(_)));
    }
}
