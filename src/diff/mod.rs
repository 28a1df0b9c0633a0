//! Unified diff parsing and diff-to-function mapping.

pub mod mapper;
pub mod parse;

pub use mapper::{classify, map_diff, map_diff_all, ChangeResult, FunctionDescriptor};
pub use parse::{parse_unified_diff, DiffError, FileDiff, Hunk, ParsedDiff};
