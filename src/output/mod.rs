//! JSON output module for CLI commands
//!
//! Provides schema-versioned response types for all commands.

pub mod command;

pub use command::{
    diff_error_messages, generate_execution_id, output_json, render_json, ChangesResponse,
    EnrichedCounts, ErrorResponse, GraphResponse, ImpactResponse, JsonResponse, OutputFormat,
};
