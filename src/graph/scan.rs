//! Project file discovery.
//!
//! Walks a project root and collects the source files the assembler should
//! extract, in sorted order, together with a diagnostic for every file it
//! skipped.

use anyhow::Result;
use camino::Utf8PathBuf;
use std::path::{Path, PathBuf};

use super::filter::{is_internal_dir, skip_diagnostic, FileFilter};
use crate::config::AnalysisConfig;
use crate::diagnostics::{ExtractDiagnostic, SkipReason};
use crate::validation::canonicalize_root;

/// Files found under a root.
#[derive(Debug, Clone)]
pub struct Discovery {
    /// Canonical root directory
    pub root: Utf8PathBuf,
    /// Absolute paths of files to extract, sorted
    pub files: Vec<PathBuf>,
    /// Skipped files, sorted
    pub diagnostics: Vec<ExtractDiagnostic>,
}

/// Discover supported source files under `root`.
///
/// # Behavior
/// 1. Canonicalize the root (it must exist and be a directory)
/// 2. Walk recursively without following symlinks, never descending into
///    internal ignore directories (`.git`, `node_modules`, `target`, ...)
/// 3. Apply gitignore rules, language detection and include/exclude globs
///
/// # Guarantees
/// - Same tree and config always yield the same file list, in the same order
/// - Every regular file visited is either returned or explained by a diagnostic
pub fn discover_files(root: &Path, config: &AnalysisConfig) -> Result<Discovery> {
    let root = canonicalize_root(root)?;
    let filter = FileFilter::new(
        root.as_std_path(),
        &config.include,
        &config.exclude,
        config.gitignore_aware,
    )?;

    let mut files = Vec::new();
    let mut diagnostics = Vec::new();

    let walker = walkdir::WalkDir::new(root.as_std_path())
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !is_internal_dir(&entry.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("discovery: {}", err);
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        match filter.should_skip(path) {
            None => files.push(path.to_path_buf()),
            Some(reason) => {
                if reason != SkipReason::NotAFile || entry.file_type().is_symlink() {
                    diagnostics.push(skip_diagnostic(root.as_std_path(), path, reason));
                }
            }
        }
    }

    files.sort();
    diagnostics.sort();

    log::info!(
        "discovered {} source files under {} ({} skipped)",
        files.len(),
        root,
        diagnostics.len()
    );

    Ok(Discovery {
        root,
        files,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discovery_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        fs::write(root.join("src/b.ts"), "export const b = 1;").unwrap();
        fs::write(root.join("src/a.py"), "def a(): pass").unwrap();
        fs::write(root.join("src/nested/C.java"), "class C {}").unwrap();
        fs::write(root.join("README.md"), "# readme").unwrap();
        fs::write(root.join("node_modules/dep/index.js"), "module.exports = {}").unwrap();

        let discovery = discover_files(root, &AnalysisConfig::default()).unwrap();
        let names: Vec<String> = discovery
            .files
            .iter()
            .map(|p| p.strip_prefix(discovery.root.as_std_path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["src/a.py", "src/b.ts", "src/nested/C.java"]);

        // node_modules is pruned, not reported file by file
        assert_eq!(discovery.diagnostics.len(), 1);
        assert_eq!(discovery.diagnostics[0].path(), "README.md");
    }

    #[test]
    fn test_discovery_honors_globs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("tests")).unwrap();
        fs::write(root.join("src/lib.rs"), "fn a() {}").unwrap();
        fs::write(root.join("tests/it.rs"), "fn b() {}").unwrap();

        let config = AnalysisConfig::default().with_include(vec!["src/**".to_string()]);
        let discovery = discover_files(root, &config).unwrap();
        assert_eq!(discovery.files.len(), 1);
        assert!(discovery.files[0].ends_with("src/lib.rs"));
        assert!(discovery
            .diagnostics
            .iter()
            .any(|d| d.path() == "tests/it.rs"));
    }

    #[test]
    fn test_discovery_missing_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = discover_files(&temp_dir.path().join("missing"), &AnalysisConfig::default());
        assert!(result.is_err());
    }
}
