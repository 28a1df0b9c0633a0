//! End-to-end analysis runs.
//!
//! Wires discovery, assembly, enrichment, diff mapping and impact traversal
//! together the way the CLI commands use them.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::diagnostics::ExtractDiagnostic;
use crate::diff::{classify, map_diff_all, parse_unified_diff, ChangeResult, DiffError};
use crate::graph::assemble::validate_root;
use crate::graph::{discover_files, enrich, AssembleProgress, AssembleReport, Assembler, EnrichedGraph};
use crate::impact::{traverse, ImpactReport, ImpactResult, TraversalOptions};

/// One analyzed project root.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub root: String,
    pub report: AssembleReport,
    /// Files discovery left out
    pub skipped: Vec<ExtractDiagnostic>,
}

impl Analysis {
    /// Whether some discovered files failed extraction.
    pub fn is_partial(&self) -> bool {
        self.report.is_partial()
    }

    /// Skip and failure diagnostics together, sorted.
    pub fn diagnostics(&self) -> Vec<ExtractDiagnostic> {
        let mut all: Vec<ExtractDiagnostic> = self
            .skipped
            .iter()
            .chain(&self.report.diagnostics)
            .cloned()
            .collect();
        all.sort();
        all
    }

    pub fn enrich(&self) -> EnrichedGraph {
        enrich(&self.report.graph)
    }
}

/// Discover and assemble every supported file under `root`.
///
/// # Errors
/// - [`crate::graph::AssembleError`] when the root is missing, not a
///   directory, or holds no supported files
/// - Discovery errors (bad glob patterns)
pub fn analyze_root(
    root: &Path,
    config: &AnalysisConfig,
    progress: Option<Arc<AssembleProgress>>,
) -> Result<Analysis> {
    let canonical = validate_root(root)?;
    let discovery = discover_files(canonical.as_std_path(), config)
        .with_context(|| format!("discovering files under {}", canonical))?;

    let mut assembler = Assembler::new(config.clone());
    if let Some(progress) = progress {
        assembler = assembler.with_progress(progress);
    }
    let report = assembler.assemble_blocking(canonical.as_std_path(), &discovery.files)?;

    Ok(Analysis {
        root: canonical.to_string(),
        report,
        skipped: discovery.diagnostics,
    })
}

/// Functions touched by a diff between two snapshots.
#[derive(Debug, Clone, Default)]
pub struct ChangeAnalysis {
    pub changes: ChangeResult,
    /// Hunk headers the parser skipped
    pub diff_errors: Vec<DiffError>,
    /// Whether the diff held at least one well-formed hunk
    pub has_hunks: bool,
}

/// Map `diff_text` onto `head` and `base`.
///
/// With `file_path`, only that file's functions are classified; otherwise
/// every file named in the diff is.
pub fn analyze_changes(
    head: &Analysis,
    base: &Analysis,
    diff_text: &str,
    file_path: Option<&str>,
) -> ChangeAnalysis {
    let parsed = parse_unified_diff(diff_text);
    let has_hunks = parsed.files.iter().any(|f| !f.hunks.is_empty());
    let changes = match file_path {
        Some(file_path) => {
            let hunks = parsed.hunks_for(file_path);
            classify(&hunks, &head.report.graph, &base.report.graph, file_path)
        }
        None => map_diff_all(diff_text, &head.report.graph, &base.report.graph),
    };
    log::info!(
        "diff maps to {} added, {} modified, {} deleted functions",
        changes.added.len(),
        changes.modified.len(),
        changes.deleted.len()
    );
    ChangeAnalysis {
        changes,
        diff_errors: parsed.errors,
        has_hunks,
    }
}

/// Per-seed results plus their merged report.
#[derive(Debug, Clone)]
pub struct ImpactAnalysis {
    pub results: Vec<ImpactResult>,
    pub report: ImpactReport,
}

/// Impact of `changes`.
///
/// Added and modified functions are seeded on the head graph, deleted ones
/// on the base graph, since only that snapshot still holds them.
pub fn analyze_impact(
    head_graph: &EnrichedGraph,
    base_graph: &EnrichedGraph,
    changes: &ChangeResult,
    options: &TraversalOptions,
) -> ImpactAnalysis {
    let mut results = traverse(head_graph, &changes.head_ids(), options);
    results.extend(traverse(base_graph, &changes.base_ids(), options));
    let report = ImpactReport::from_results(&results);
    ImpactAnalysis { results, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AssembleError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_root_is_assemble_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        let err = analyze_root(&missing, &AnalysisConfig::default(), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AssembleError>(),
            Some(AssembleError::MissingRoot(_))
        ));
    }

    #[test]
    fn test_root_without_sources_is_no_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "hi").unwrap();
        let err = analyze_root(temp_dir.path(), &AnalysisConfig::default(), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AssembleError>(),
            Some(AssembleError::NoFiles(_))
        ));
    }

    #[test]
    fn test_skipped_files_do_not_make_analysis_partial() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.py"), "def f():\n    return 1\n").unwrap();
        fs::write(temp_dir.path().join("README.md"), "# x").unwrap();
        let analysis = analyze_root(temp_dir.path(), &AnalysisConfig::default(), None).unwrap();
        assert!(!analysis.is_partial());
        assert_eq!(analysis.skipped.len(), 1);
        assert_eq!(analysis.report.files_analyzed, 1);
        assert_eq!(analysis.diagnostics().len(), 1);
    }
}
