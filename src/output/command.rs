//! JSON output types for CLI commands
//!
//! Every JSON response is wrapped in a [`JsonResponse`] envelope carrying the
//! schema version, a per-run execution id and a timestamp, so consumers can
//! parse output from different blastmap versions and correlate runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::diagnostics::ExtractDiagnostic;
use crate::diff::{ChangeResult, DiffError};
use crate::impact::{Direction, ImpactReport, ImpactResult};

/// Current JSON output schema version
pub const BLASTMAP_JSON_SCHEMA_VERSION: &str = "1.0.0";

/// Wrapper for all JSON responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    /// Schema version for parsing stability
    pub schema_version: String,
    /// Unique execution ID for this run
    pub execution_id: String,
    pub tool: String,
    /// RFC 3339, second precision, UTC
    pub timestamp: String,
    pub data: T,
    /// Set when some files could not be analyzed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
}

impl<T> JsonResponse<T> {
    pub fn new(data: T, execution_id: &str) -> Self {
        JsonResponse {
            schema_version: BLASTMAP_JSON_SCHEMA_VERSION.to_string(),
            execution_id: execution_id.to_string(),
            tool: "blastmap".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            data,
            partial: None,
        }
    }

    /// Mark the response as partial; `false` leaves the field out
    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial.then_some(true);
        self
    }
}

/// Node and edge counts of an assembled graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphResponse {
    pub root: String,
    pub files_analyzed: usize,
    pub types: usize,
    pub functions: usize,
    pub calls: usize,
    /// Present when the graph was enriched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enriched: Option<EnrichedCounts>,
    pub diagnostics: Vec<ExtractDiagnostic>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichedCounts {
    pub nodes: usize,
    pub edges: usize,
    /// Edge count per relationship kind wire name
    pub edges_by_kind: BTreeMap<String, usize>,
}

/// Functions touched by a diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangesResponse {
    pub head: String,
    pub base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub changes: ChangeResult,
    /// Hunk headers the diff parser skipped
    pub diff_errors: Vec<String>,
    pub diagnostics: Vec<ExtractDiagnostic>,
}

/// Impact of the functions touched by a diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactResponse {
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    /// Followed relationship kinds; empty means every kind
    pub kinds: Vec<String>,
    pub changes: ChangeResult,
    /// One result per seed, head seeds first
    pub results: Vec<ImpactResult>,
    pub report: ImpactReport,
    pub diagnostics: Vec<ExtractDiagnostic>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable `BLM-*` code
    pub code: String,
    /// Error category/type
    pub error: String,
    /// Human-readable error message
    pub message: String,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Human,
    /// Compact JSON output with schema versioning
    Json,
    /// Indented JSON output
    Pretty,
}

impl OutputFormat {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Some(OutputFormat::Human),
            "json" => Some(OutputFormat::Json),
            "pretty" => Some(OutputFormat::Pretty),
            _ => None,
        }
    }

    pub fn is_json(&self) -> bool {
        !matches!(self, OutputFormat::Human)
    }
}

/// Generate a unique execution ID for this run
pub fn generate_execution_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Render `data` as JSON in the given format.
pub fn render_json<T: Serialize>(data: &T, format: OutputFormat) -> anyhow::Result<String> {
    let json = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(data)?,
        _ => serde_json::to_string(data)?,
    };
    Ok(json)
}

/// Output JSON to stdout
pub fn output_json<T: Serialize>(data: &T, format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render_json(data, format)?);
    Ok(())
}

/// Messages of skipped hunk headers, for JSON output.
pub fn diff_error_messages(errors: &[DiffError]) -> Vec<String> {
    errors.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_response_envelope() {
        let response = JsonResponse::new(GraphResponse::default(), "exec-1").with_partial(true);
        let json = serde_json::to_string(&response).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["schema_version"], BLASTMAP_JSON_SCHEMA_VERSION);
        assert_eq!(parsed["execution_id"], "exec-1");
        assert_eq!(parsed["tool"], "blastmap");
        assert_eq!(parsed["partial"], true);
        assert!(parsed["data"]["enriched"].is_null());
        assert!(chrono::DateTime::parse_from_rfc3339(parsed["timestamp"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_complete_response_omits_partial() {
        let response = JsonResponse::new(1u32, "x").with_partial(false);
        let parsed: serde_json::Value = serde_json::to_value(&response).unwrap();
        assert!(parsed.get("partial").is_none());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("pretty"), Some(OutputFormat::Pretty));
        assert_eq!(OutputFormat::from_str("text"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::from_str("yaml"), None);
        assert!(OutputFormat::Pretty.is_json());
    }

    #[test]
    fn test_execution_ids_are_unique_uuids() {
        let a = generate_execution_id();
        let b = generate_execution_id();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_pretty_rendering_is_indented() {
        let compact = render_json(&vec![1, 2], OutputFormat::Json).unwrap();
        let pretty = render_json(&vec![1, 2], OutputFormat::Pretty).unwrap();
        assert_eq!(compact, "[1,2]");
        assert!(pretty.contains('\n'));
    }
}
