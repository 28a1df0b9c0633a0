//! The code graph: data model, assembly, enrichment, and export.
//!
//! [`assemble`] turns a project's files into a [`CodeGraph`];
//! [`enrich`] derives the canonical node/edge [`EnrichedGraph`] from it.

pub mod assemble;
pub mod enrich;
pub mod export;
pub mod filter;
pub mod module_resolver;
pub mod scan;
pub mod schema;

pub use assemble::{
    assemble, assemble_blocking, finalize_relations, AssembleError, AssembleProgress,
    AssembleReport, Assembler,
};
pub use enrich::{
    enrich, EnrichedGraph, EnrichedGraphEdge, EnrichedGraphNode, NodeKind, RelationshipKind,
};
pub use export::{export_enriched, ExportConfig, ExportFormat};
pub use filter::FileFilter;
pub use module_resolver::{ExternalOnly, FsModuleResolver, ModuleResolver, ResolvedImport};
pub use scan::{discover_files, Discovery};
pub use schema::{
    path_matches, Call, CodeGraph, FileAnalysis, FunctionAnalysis, ImportAnalysis, TypeAnalysis,
};
