//! Blastmap: semantic code graphs, diff-to-function mapping and change impact
//!
//! Blastmap parses a project with tree-sitter, assembles a code graph of
//! types, functions, calls and imports, derives an enriched node/edge graph
//! from it, and answers "which functions does this diff touch, and what do
//! they affect?".
//!
//! # Pipeline
//!
//! 1. [`graph::discover_files`] walks a root and picks supported sources
//! 2. [`graph::Assembler`] extracts every file concurrently and merges the
//!    per-file results into a [`CodeGraph`]
//! 3. [`graph::enrich`] turns the code graph into an [`EnrichedGraph`]
//! 4. [`diff::map_diff`] classifies functions as added, modified or deleted
//! 5. [`impact::traverse`] walks the enriched graph from changed functions
//!
//! # Position Conventions
//!
//! - **Line positions**: 1-indexed
//! - **Column positions**: 0-indexed
//!
//! Supported languages: Rust, Python, Java, JavaScript, TypeScript (and TSX).

pub mod config;
pub mod diagnostics;
pub mod diff;
pub mod error_codes;
pub mod graph;
pub mod impact;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod validation;
pub mod version;

pub use config::AnalysisConfig;
pub use diagnostics::{DiagnosticStage, ExtractDiagnostic, SkipReason};
pub use diff::{map_diff, map_diff_all, parse_unified_diff, ChangeResult, FunctionDescriptor};
pub use graph::{
    assemble, assemble_blocking, discover_files, enrich, AssembleError, AssembleReport, Assembler,
    CodeGraph, EnrichedGraph, EnrichedGraphEdge, EnrichedGraphNode, ExportConfig, ExportFormat,
    NodeKind, RelationshipKind,
};
pub use impact::{
    impact_of, traverse, Direction, ImpactReport, ImpactResult, ImpactedNode, Severity,
    TraversalOptions,
};
pub use ingest::extract::{extract_file, ExtractError, FileExtraction};
pub use output::OutputFormat;
pub use pipeline::{analyze_changes, analyze_impact, analyze_root, Analysis};
