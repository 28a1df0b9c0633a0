//! Extraction diagnostics for structured skip reasons and per-file errors.
//!
//! Discovery reports files it skipped; the assembler reports files whose
//! extraction failed or timed out. Both end up in one deterministically
//! sorted list the CLI prints to stderr or embeds in JSON output.

use crate::ingest::extract::ExtractError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Reason why a file was skipped during discovery.
///
/// Each variant represents a deterministic decision point in the filtering pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// File is not a regular file (directory, symlink, etc.)
    NotAFile,
    /// No extraction rules for the file's extension
    UnsupportedLanguage,
    /// Internal hard-coded ignore rules (.git/, node_modules/, target/, etc.)
    IgnoredInternal,
    /// Matched by gitignore-style rules (.gitignore, .ignore)
    IgnoredByGitignore,
    /// Excluded by an include/exclude glob
    ExcludedByGlob,
}

impl SkipReason {
    /// Stable sort key for deterministic ordering.
    ///
    /// Lower values = higher priority in reporting.
    pub fn sort_key(&self) -> u8 {
        match self {
            SkipReason::IgnoredInternal => 0,
            SkipReason::IgnoredByGitignore => 1,
            SkipReason::ExcludedByGlob => 2,
            SkipReason::UnsupportedLanguage => 3,
            SkipReason::NotAFile => 4,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SkipReason::NotAFile => "not a regular file",
            SkipReason::UnsupportedLanguage => "language not supported",
            SkipReason::IgnoredInternal => "internal ignore rule",
            SkipReason::IgnoredByGitignore => "matched by gitignore",
            SkipReason::ExcludedByGlob => "excluded by pattern",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl PartialOrd for SkipReason {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SkipReason {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Stage of per-file extraction where a failure happened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStage {
    /// Reading the file (missing, unreadable, over the size limit)
    Read,
    /// Parsing source into a syntax tree
    Parse,
    /// Extraction exceeded the per-file timeout
    Timeout,
    /// Worker crashed or was cancelled
    Other,
}

impl DiagnosticStage {
    /// Stable sort key for deterministic ordering.
    pub fn sort_key(&self) -> u8 {
        match self {
            DiagnosticStage::Read => 0,
            DiagnosticStage::Parse => 1,
            DiagnosticStage::Timeout => 2,
            DiagnosticStage::Other => 3,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticStage::Read => "reading file",
            DiagnosticStage::Parse => "parsing source",
            DiagnosticStage::Timeout => "extraction timeout",
            DiagnosticStage::Other => "processing",
        }
    }
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl PartialOrd for DiagnosticStage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DiagnosticStage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// A diagnostic event from discovery or extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractDiagnostic {
    /// File was skipped during discovery
    Skipped {
        /// Path relative to root
        path: String,
        reason: SkipReason,
    },
    /// File was discovered but contributed nothing to the graph
    Error {
        /// Path relative to root
        path: String,
        stage: DiagnosticStage,
        message: String,
    },
}

impl ExtractDiagnostic {
    pub fn path(&self) -> &str {
        match self {
            ExtractDiagnostic::Skipped { path, .. } => path,
            ExtractDiagnostic::Error { path, .. } => path,
        }
    }

    /// Stable sort key for deterministic ordering.
    ///
    /// Primary: path string (lexicographic)
    /// Secondary: variant type (Error before Skipped)
    /// Tertiary: stage/reason sort key
    pub fn sort_key(&self) -> (&str, u8, u8) {
        match self {
            ExtractDiagnostic::Error { path, stage, .. } => (path, 0, stage.sort_key()),
            ExtractDiagnostic::Skipped { path, reason } => (path, 1, reason.sort_key()),
        }
    }

    pub fn skipped(path: String, reason: SkipReason) -> Self {
        ExtractDiagnostic::Skipped { path, reason }
    }

    pub fn error(path: String, stage: DiagnosticStage, message: String) -> Self {
        ExtractDiagnostic::Error {
            path,
            stage,
            message,
        }
    }

    /// Whether this diagnostic records a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ExtractDiagnostic::Error {
                stage: DiagnosticStage::Timeout,
                ..
            }
        )
    }

    /// Examples:
    /// - "SKIP node_modules/x.js: internal ignore rule"
    /// - "ERROR src/big.ts: reading file: src/big.ts is 2000000 bytes, over the 1048576 byte limit"
    pub fn format_stderr(&self) -> String {
        match self {
            ExtractDiagnostic::Skipped { path, reason } => {
                format!("SKIP {}: {}", path, reason)
            }
            ExtractDiagnostic::Error {
                path,
                stage,
                message,
            } => {
                format!("ERROR {}: {}: {}", path, stage, message)
            }
        }
    }
}

impl From<&ExtractError> for ExtractDiagnostic {
    fn from(error: &ExtractError) -> Self {
        let stage = match error {
            ExtractError::Unreadable { .. } | ExtractError::Oversized { .. } => {
                DiagnosticStage::Read
            }
            ExtractError::ParseFailed { .. } | ExtractError::UnsupportedLanguage { .. } => {
                DiagnosticStage::Parse
            }
            ExtractError::Timeout { .. } => DiagnosticStage::Timeout,
            ExtractError::WorkerFailed { .. } => DiagnosticStage::Other,
        };
        ExtractDiagnostic::error(error.path().to_string(), stage, error.to_string())
    }
}

impl fmt::Display for ExtractDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_stderr())
    }
}

impl PartialOrd for ExtractDiagnostic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ExtractDiagnostic {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_ord() {
        assert!(SkipReason::IgnoredInternal < SkipReason::IgnoredByGitignore);
        assert!(SkipReason::IgnoredByGitignore < SkipReason::ExcludedByGlob);
    }

    #[test]
    fn test_error_sorts_before_skip_on_same_path() {
        let error = ExtractDiagnostic::error(
            "src/a.rs".to_string(),
            DiagnosticStage::Parse,
            "error".to_string(),
        );
        let skipped = ExtractDiagnostic::skipped("src/a.rs".to_string(), SkipReason::ExcludedByGlob);
        assert!(error < skipped);
    }

    #[test]
    fn test_sorting_by_path_first() {
        let mut diagnostics = vec![
            ExtractDiagnostic::skipped("src/c.rs".to_string(), SkipReason::ExcludedByGlob),
            ExtractDiagnostic::error("src/a.rs".to_string(), DiagnosticStage::Read, "e".to_string()),
            ExtractDiagnostic::skipped("src/b.rs".to_string(), SkipReason::IgnoredInternal),
        ];
        diagnostics.sort();
        let paths: Vec<_> = diagnostics.iter().map(|d| d.path()).collect();
        assert_eq!(paths, vec!["src/a.rs", "src/b.rs", "src/c.rs"]);
    }

    #[test]
    fn test_from_timeout_error() {
        let error = ExtractError::Timeout {
            path: "src/slow.ts".to_string(),
            seconds: 60,
        };
        let diag = ExtractDiagnostic::from(&error);
        assert!(diag.is_timeout());
        assert_eq!(
            diag.format_stderr(),
            "ERROR src/slow.ts: extraction timeout: extraction of src/slow.ts timed out after 60s"
        );
    }

    #[test]
    fn test_json_shape() {
        let diag = ExtractDiagnostic::skipped("x.txt".to_string(), SkipReason::UnsupportedLanguage);
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["type"], "skipped");
        assert_eq!(json["reason"], "unsupported_language");
    }
}
