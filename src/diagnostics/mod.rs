//! Structured diagnostics for discovery and extraction.
//!
//! Deterministic, sortable types for skip reasons and per-file errors.

pub mod extract_diagnostics;

pub use extract_diagnostics::{DiagnosticStage, ExtractDiagnostic, SkipReason};
