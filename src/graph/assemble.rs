//! Code graph assembly.
//!
//! Extracts every file of a project in parallel and merges the per-file
//! results into one [`CodeGraph`]. Workers own their extraction context and
//! return plain values; only the coordinating task touches the graph maps.
//!
//! Files are dispatched in batches of [`AnalysisConfig::batch_size`], at most
//! [`AnalysisConfig::workers`] in flight. Each extraction runs on tokio's
//! blocking pool, raced against [`AnalysisConfig::file_timeout`]. A failed or
//! timed-out file contributes nothing and is reported as a diagnostic; the
//! rest of the batch carries on.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use camino::Utf8PathBuf;
use tokio::task::JoinSet;

use super::module_resolver::{FsModuleResolver, ModuleResolver};
use super::schema::{append_unique, CodeGraph, TypeAnalysis};
use crate::config::AnalysisConfig;
use crate::diagnostics::{DiagnosticStage, ExtractDiagnostic};
use crate::ingest::context::AnalysisNode;
use crate::ingest::extract::{extract_file, ExtractError, FileExtraction};
use crate::ingest::scope::split_composite;
use crate::validation::{absolutize, canonicalize_root, relative_to_root, PathValidationError};

/// Structural failures; nothing is extracted when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("project root does not exist: {0}")]
    MissingRoot(String),

    #[error("project root is not a directory: {0}")]
    NotADirectory(String),

    #[error("no files to analyze under {0}")]
    NoFiles(String),

    #[error(transparent)]
    Path(#[from] PathValidationError),

    #[error("failed to start extraction runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Progress callback: `(files_done, files_total)`.
pub type AssembleProgress = dyn Fn(usize, usize) + Send + Sync;

/// Result of one assembly run.
#[derive(Debug, Clone, Default)]
pub struct AssembleReport {
    pub graph: CodeGraph,
    /// Per-file failures, sorted
    pub diagnostics: Vec<ExtractDiagnostic>,
    /// Cross-reference records of every extracted construct, by synthetic id
    pub nodes: BTreeMap<String, AnalysisNode>,
    /// Files that contributed to the graph
    pub files_analyzed: usize,
}

impl AssembleReport {
    /// Whether some files were dropped from the graph.
    pub fn is_partial(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// One file queued for extraction.
#[derive(Debug, Clone)]
struct Job {
    index: usize,
    relative: String,
    absolute: String,
}

/// Builds code graphs with a fixed configuration.
pub struct Assembler {
    config: AnalysisConfig,
    resolver: Option<Arc<dyn ModuleResolver>>,
    progress: Option<Arc<AssembleProgress>>,
}

impl Assembler {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            resolver: None,
            progress: None,
        }
    }

    /// Use `resolver` instead of a [`FsModuleResolver`] over the input files.
    pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_progress(mut self, progress: Arc<AssembleProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Extract `paths` (absolute, or relative to `root`) and assemble the graph.
    pub async fn assemble(
        &self,
        root: &Path,
        paths: &[PathBuf],
    ) -> Result<AssembleReport, AssembleError> {
        let started = Instant::now();
        let root = validate_root(root)?;
        if paths.is_empty() {
            return Err(AssembleError::NoFiles(root.to_string()));
        }

        let mut diagnostics = Vec::new();
        let jobs = plan_jobs(&root, paths, &mut diagnostics);
        if jobs.is_empty() {
            return Err(AssembleError::NoFiles(root.to_string()));
        }

        let resolver = match &self.resolver {
            Some(resolver) => Arc::clone(resolver),
            None => {
                let files: Vec<PathBuf> = jobs.iter().map(|j| PathBuf::from(&j.absolute)).collect();
                Arc::new(FsModuleResolver::new(root.as_std_path(), &files)) as Arc<dyn ModuleResolver>
            }
        };

        let total = jobs.len();
        let mut merger = Merger::default();
        let mut done = 0usize;

        for (batch_index, batch) in jobs.chunks(self.config.batch_size.max(1)).enumerate() {
            log::debug!("batch {}: {} files", batch_index, batch.len());
            let mut outcomes = self.run_batch(batch, &resolver).await;
            // merge in input order so repeated runs produce identical graphs
            outcomes.sort_by_key(|(index, _)| *index);

            for (_, outcome) in outcomes {
                done += 1;
                match outcome {
                    Ok(extraction) => merger.merge(extraction),
                    Err(err) => {
                        if matches!(err, ExtractError::Timeout { .. }) {
                            log::warn!("{}", err);
                        } else {
                            log::warn!("skipping file: {}", err);
                        }
                        diagnostics.push(ExtractDiagnostic::from(&err));
                    }
                }
                if let Some(progress) = &self.progress {
                    progress(done, total);
                }
            }
        }

        let Merger {
            mut graph,
            nodes,
            files_analyzed,
            ..
        } = merger;
        finalize_relations(&mut graph);
        diagnostics.sort();

        log::info!(
            "assembled {} files ({} functions, {} types, {} failed) in {:.2?}",
            files_analyzed,
            graph.function_count(),
            graph.type_count(),
            diagnostics.len(),
            started.elapsed()
        );

        Ok(AssembleReport {
            graph,
            diagnostics,
            nodes,
            files_analyzed,
        })
    }

    /// [`Assembler::assemble`] on a runtime built for the call.
    pub fn assemble_blocking(
        &self,
        root: &Path,
        paths: &[PathBuf],
    ) -> Result<AssembleReport, AssembleError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .max_blocking_threads(self.config.workers.max(1) * 2)
            .enable_time()
            .build()
            .map_err(AssembleError::Runtime)?;
        runtime.block_on(self.assemble(root, paths))
    }

    /// Run one batch to completion, never more than `workers` files at once.
    async fn run_batch(
        &self,
        batch: &[Job],
        resolver: &Arc<dyn ModuleResolver>,
    ) -> Vec<(usize, Result<FileExtraction, ExtractError>)> {
        let workers = self.config.workers.max(1);
        let mut set = JoinSet::new();
        let mut outcomes = Vec::with_capacity(batch.len());

        for job in batch {
            while set.len() >= workers {
                collect_next(&mut set, &mut outcomes).await;
            }
            set.spawn(extract_with_timeout(
                job.clone(),
                Arc::clone(resolver),
                self.config.max_file_size,
                self.config.file_timeout,
            ));
        }
        while !set.is_empty() {
            collect_next(&mut set, &mut outcomes).await;
        }
        outcomes
    }
}

async fn collect_next(
    set: &mut JoinSet<(usize, Result<FileExtraction, ExtractError>)>,
    outcomes: &mut Vec<(usize, Result<FileExtraction, ExtractError>)>,
) {
    match set.join_next().await {
        Some(Ok(outcome)) => outcomes.push(outcome),
        // the wrapper task only awaits; it fails solely on runtime shutdown
        Some(Err(err)) => log::warn!("extraction task lost: {}", err),
        None => {}
    }
}

/// Extract one file on the blocking pool, racing the timeout.
///
/// A timed-out extraction keeps its blocking thread until it finishes;
/// its result is discarded.
async fn extract_with_timeout(
    job: Job,
    resolver: Arc<dyn ModuleResolver>,
    max_file_size: u64,
    timeout: std::time::Duration,
) -> (usize, Result<FileExtraction, ExtractError>) {
    let Job {
        index,
        relative,
        absolute,
    } = job;
    let path = relative.clone();
    let handle = tokio::task::spawn_blocking(move || {
        extract_file(&relative, &absolute, max_file_size, resolver.as_ref())
    });

    let outcome = match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ExtractError::WorkerFailed {
            path,
            reason: join_err.to_string(),
        }),
        Err(_) => Err(ExtractError::Timeout {
            path,
            seconds: timeout.as_secs(),
        }),
    };
    (index, outcome)
}

pub(crate) fn validate_root(root: &Path) -> Result<Utf8PathBuf, AssembleError> {
    if !root.exists() {
        return Err(AssembleError::MissingRoot(root.display().to_string()));
    }
    if !root.is_dir() {
        return Err(AssembleError::NotADirectory(root.display().to_string()));
    }
    Ok(canonicalize_root(root)?)
}

/// Normalize, deduplicate and order the input paths.
fn plan_jobs(
    root: &Utf8PathBuf,
    paths: &[PathBuf],
    diagnostics: &mut Vec<ExtractDiagnostic>,
) -> Vec<Job> {
    let mut seen = HashSet::new();
    let mut planned = Vec::new();
    for path in paths {
        let absolute = match absolutize(path, root) {
            Ok(absolute) => absolute,
            Err(err) => {
                diagnostics.push(ExtractDiagnostic::error(
                    path.display().to_string(),
                    DiagnosticStage::Read,
                    err.to_string(),
                ));
                continue;
            }
        };
        if !seen.insert(absolute.clone()) {
            continue;
        }
        // files outside the root keep their absolute path as display path
        let relative = relative_to_root(&absolute, root)
            .map(|r| r.to_string())
            .unwrap_or_else(|_| absolute.to_string());
        planned.push((relative, absolute.to_string()));
    }
    planned.sort();
    planned
        .into_iter()
        .enumerate()
        .map(|(index, (relative, absolute))| Job {
            index,
            relative,
            absolute,
        })
        .collect()
}

/// Coordinator-side merge state.
#[derive(Default)]
struct Merger {
    graph: CodeGraph,
    nodes: BTreeMap<String, AnalysisNode>,
    /// Type keys currently held by a provisional declaration
    provisional: HashSet<String>,
    files_analyzed: usize,
}

impl Merger {
    fn merge(&mut self, extraction: FileExtraction) {
        let FileExtraction {
            file,
            types,
            functions,
            nodes,
            ..
        } = extraction;

        for extracted in types {
            let key = extracted.analysis.key();
            match self.graph.types.get_mut(&key) {
                None => {
                    if extracted.provisional {
                        self.provisional.insert(key.clone());
                    }
                    self.graph.types.insert(key, extracted.analysis);
                }
                Some(existing) => {
                    if !extracted.provisional && self.provisional.remove(&key) {
                        adopt_declaration(existing, &extracted.analysis);
                    }
                    existing.merge_from(extracted.analysis);
                }
            }
        }

        for function in functions {
            self.graph.functions.insert(function.key(), function);
        }

        self.nodes.extend(nodes);
        self.graph.files.insert(file.absolute_path.clone(), file);
        self.files_analyzed += 1;
    }
}

/// A definitive declaration replaces what an impl block guessed.
fn adopt_declaration(existing: &mut TypeAnalysis, declared: &TypeAnalysis) {
    existing.kind = declared.kind;
    existing.position = declared.position;
    existing.node_id = declared.node_id.clone();
}

/// Derive `extended_by`/`implemented_by` from every type's `extends`/`implements`.
///
/// Appends are duplicate-checked, so running this again is a no-op.
pub fn finalize_relations(graph: &mut CodeGraph) {
    let mut by_reference: HashMap<String, Vec<String>> = HashMap::new();
    for (key, analysis) in &graph.types {
        by_reference
            .entry(analysis.reference())
            .or_default()
            .push(key.clone());
    }

    let mut extended_by: Vec<(String, String)> = Vec::new();
    let mut implemented_by: Vec<(String, String)> = Vec::new();
    for analysis in graph.types.values() {
        let derived = analysis.reference();
        for (references, reverse) in [
            (&analysis.extends, &mut extended_by),
            (&analysis.implements, &mut implemented_by),
        ] {
            for reference in references {
                match by_reference.get(reference) {
                    Some(keys) => {
                        reverse.extend(keys.iter().map(|k| (k.clone(), derived.clone())));
                    }
                    None => report_unresolved(graph, &analysis.key(), reference),
                }
            }
        }
    }

    for (target, derived) in extended_by {
        if let Some(analysis) = graph.types.get_mut(&target) {
            append_unique(&mut analysis.extended_by, vec![derived]);
        }
    }
    for (target, derived) in implemented_by {
        if let Some(analysis) = graph.types.get_mut(&target) {
            append_unique(&mut analysis.implemented_by, vec![derived]);
        }
    }
}

fn report_unresolved(graph: &CodeGraph, from: &str, reference: &str) {
    // supertypes from external packages are expected; a miss inside an
    // analyzed file points at an extraction gap
    let in_project = split_composite(reference)
        .map(|(file, _)| graph.files.contains_key(file))
        .unwrap_or(false);
    if in_project {
        log::warn!("{}: supertype {} not found in graph", from, reference);
    } else {
        log::debug!("{}: external supertype {}", from, reference);
    }
}

/// Assemble with a default [`Assembler`].
pub async fn assemble(
    root: &Path,
    paths: &[PathBuf],
    config: &AnalysisConfig,
) -> Result<AssembleReport, AssembleError> {
    Assembler::new(config.clone()).assemble(root, paths).await
}

/// Blocking form of [`assemble`] for synchronous callers.
pub fn assemble_blocking(
    root: &Path,
    paths: &[PathBuf],
    config: &AnalysisConfig,
) -> Result<AssembleReport, AssembleError> {
    Assembler::new(config.clone()).assemble_blocking(root, paths)
}
