//! Per-file syntax extraction.
//!
//! Language detection, the thread-local parser pool, per-language rules
//! (scopes and call chains), and the extraction engine that turns one parsed
//! file into imports, types, functions, and resolved calls.

pub mod chain;
pub mod context;
pub mod detect;
pub mod extract;
pub mod java;
pub mod javascript;
pub mod pool;
pub mod python;
pub mod rules;
pub mod rust;
pub mod scope;
pub mod typescript;

pub use chain::{chain_for, split_chain, ChainLink, LinkRole};
pub use context::{AnalysisNode, ExtractionContext, Position};
pub use detect::{detect_language, Language};
pub use extract::{extract, extract_file, extract_source, ExtractError, ExtractedType, FileExtraction};
pub use rules::{rules_for, LanguageRules, TypeKind};
pub use scope::{Scope, ScopeFrame, ScopeKind};
