//! File filtering for gitignore-style rules and include/exclude globs.
//!
//! Provides deterministic file filtering with the following precedence:
//! 1. Hard internal ignores (.git/, node_modules/, target/, virtualenvs, build output)
//! 2. Gitignore-style rules (.gitignore, .ignore at the root)
//! 3. Language detection
//! 4. Include patterns (if any provided)
//! 5. Exclude patterns
//!
//! All filtering is pure function: same inputs always produce same output.

use anyhow::Result;
use ignore::gitignore::Gitignore;
use std::path::{Path, PathBuf};

use crate::diagnostics::{ExtractDiagnostic, SkipReason};
use crate::ingest::detect_language;

/// Internal directories that are always ignored (hard-coded).
pub const INTERNAL_IGNORE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "target",
    "node_modules",
    ".venv",
    "venv",
    "__pycache__",
    ".mypy_cache",
    ".tox",
    "dist",
    "build",
    ".next",
];

/// Whether a directory name is one of the hard-coded ignores.
pub fn is_internal_dir(name: &str) -> bool {
    INTERNAL_IGNORE_DIRS.contains(&name)
}

/// Filter configuration for discovery.
///
/// Contains all filtering state in one place for deterministic behavior.
pub struct FileFilter {
    /// Root directory for path normalization
    root: PathBuf,
    /// Gitignore-style matcher (compiled from .gitignore/.ignore files)
    gitignore: Option<Gitignore>,
    /// Include patterns (empty = include all)
    include_patterns: Vec<globset::GlobMatcher>,
    exclude_patterns: Vec<globset::GlobMatcher>,
}

impl FileFilter {
    /// Create a new filter for the given root directory.
    ///
    /// # Arguments
    /// * `root` - Root directory, already canonical
    /// * `include_patterns` - Include globs (empty = include all)
    /// * `exclude_patterns` - Exclude globs
    /// * `gitignore_aware` - Load `.gitignore`/`.ignore` from the root
    pub fn new(
        root: &Path,
        include_patterns: &[String],
        exclude_patterns: &[String],
        gitignore_aware: bool,
    ) -> Result<Self> {
        let gitignore = if gitignore_aware {
            Some(Self::load_gitignore(root)?)
        } else {
            None
        };

        Ok(Self {
            root: root.to_path_buf(),
            gitignore,
            include_patterns: Self::compile_globs(include_patterns)?,
            exclude_patterns: Self::compile_globs(exclude_patterns)?,
        })
    }

    /// Load gitignore-style rules from .gitignore and .ignore files.
    fn load_gitignore(root: &Path) -> Result<Gitignore> {
        let mut builder = ignore::gitignore::GitignoreBuilder::new(root);

        for name in [".gitignore", ".ignore"] {
            let path = root.join(name);
            if path.exists() {
                // A malformed ignore file shouldn't abort discovery
                if let Some(err) = builder.add(&path) {
                    log::warn!("failed to load {}: {}", path.display(), err);
                }
            }
        }

        Ok(builder.build()?)
    }

    fn compile_globs(patterns: &[String]) -> Result<Vec<globset::GlobMatcher>> {
        patterns
            .iter()
            .map(|pattern| {
                globset::Glob::new(pattern)
                    .map(|glob| glob.compile_matcher())
                    .map_err(|e| anyhow::anyhow!("Invalid glob pattern '{}': {}", pattern, e))
            })
            .collect()
    }

    /// Check if a path should be skipped, returning the reason if so.
    ///
    /// Rules are checked in precedence order; the first applicable reason wins.
    pub fn should_skip(&self, path: &Path) -> Option<SkipReason> {
        if !path.is_file() {
            return Some(SkipReason::NotAFile);
        }

        if self.is_internal_ignore(path) {
            return Some(SkipReason::IgnoredInternal);
        }

        if let Some(ref gitignore) = self.gitignore {
            let check_path = path.strip_prefix(&self.root).unwrap_or(path);

            if gitignore.matched(check_path, false).is_ignore() {
                return Some(SkipReason::IgnoredByGitignore);
            }

            // Directory patterns like "build/" match every file below them
            let mut current = check_path.parent();
            while let Some(ancestor) = current {
                if ancestor.as_os_str().is_empty() {
                    break;
                }
                if gitignore.matched(ancestor, true).is_ignore() {
                    return Some(SkipReason::IgnoredByGitignore);
                }
                current = ancestor.parent();
            }
        }

        if detect_language(path).is_none() {
            return Some(SkipReason::UnsupportedLanguage);
        }

        let rel_path = self.relative_path(path);
        if !self.include_patterns.is_empty()
            && !self.include_patterns.iter().any(|m| m.is_match(&rel_path))
        {
            return Some(SkipReason::ExcludedByGlob);
        }
        if self.exclude_patterns.iter().any(|m| m.is_match(&rel_path)) {
            return Some(SkipReason::ExcludedByGlob);
        }

        None
    }

    fn is_internal_ignore(&self, path: &Path) -> bool {
        let Ok(rel_path) = path.strip_prefix(&self.root) else {
            return false;
        };
        rel_path.components().any(|component| match component {
            std::path::Component::Normal(dir) => is_internal_dir(&dir.to_string_lossy()),
            _ => false,
        })
    }

    /// Path relative to root, with forward slashes.
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| path.to_string_lossy().into_owned())
    }
}

/// Create a diagnostic for a skipped file.
pub fn skip_diagnostic(root: &Path, path: &Path, reason: SkipReason) -> ExtractDiagnostic {
    let rel_path = path
        .strip_prefix(root)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.to_string_lossy().into_owned());

    ExtractDiagnostic::skipped(rel_path, reason)
}
