//! Enriched graph export.
//!
//! Serializes an [`EnrichedGraph`] as JSON, JSON Lines, a CSV edge list, or a
//! Graphviz digraph. Output order follows the graph's own node and edge
//! order, which enrichment keeps deterministic.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

use super::enrich::{EnrichedGraph, EnrichedGraphEdge, EnrichedGraphNode, NodeKind};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Single JSON document with `nodes` and `edges`
    Json,
    /// JSON Lines format (one tagged record per line)
    JsonL,
    /// Graphviz DOT format
    Dot,
    /// CSV edge list
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "jsonl" => Ok(ExportFormat::JsonL),
            "dot" => Ok(ExportFormat::Dot),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(format!("unknown export format: {} (expected json, jsonl, csv or dot)", s)),
        }
    }
}

/// Configuration for graph export
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// Use minified JSON (no pretty-printing)
    pub minify: bool,
    /// Group DOT nodes by file in subgraphs
    pub cluster: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            format: ExportFormat::Json,
            minify: false,
            cluster: false,
        }
    }
}

impl ExportConfig {
    pub fn new(format: ExportFormat) -> Self {
        ExportConfig {
            format,
            ..Default::default()
        }
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn with_cluster(mut self, cluster: bool) -> Self {
        self.cluster = cluster;
        self
    }
}

/// Tagged JSONL record.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonlRecord<'a> {
    Node(&'a EnrichedGraphNode),
    Edge(&'a EnrichedGraphEdge),
}

/// Export `graph` according to `config`.
pub fn export_enriched(graph: &EnrichedGraph, config: &ExportConfig) -> Result<String> {
    match config.format {
        ExportFormat::Json => export_json(graph, config.minify),
        ExportFormat::JsonL => export_jsonl(graph),
        ExportFormat::Csv => export_csv(graph),
        ExportFormat::Dot => Ok(export_dot(graph, config.cluster)),
    }
}

pub fn export_json(graph: &EnrichedGraph, minify: bool) -> Result<String> {
    if minify {
        serde_json::to_string(graph).map_err(Into::into)
    } else {
        serde_json::to_string_pretty(graph).map_err(Into::into)
    }
}

/// Nodes first, then edges; one compact JSON record per line.
pub fn export_jsonl(graph: &EnrichedGraph) -> Result<String> {
    let records = graph
        .nodes
        .iter()
        .map(JsonlRecord::Node)
        .chain(graph.edges.iter().map(JsonlRecord::Edge));

    let lines: Result<Vec<String>, _> = records.map(|r| serde_json::to_string(&r)).collect();
    Ok(lines?.join("\n"))
}

/// Edge list: `from,from_name,kind,to,to_name,from_path,to_path`.
pub fn export_csv(graph: &EnrichedGraph) -> Result<String> {
    let index = graph.index();
    let name_of = |id: &str| index.get(id).map(|n| n.name.clone()).unwrap_or_default();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["from", "from_name", "kind", "to", "to_name", "from_path", "to_path"])?;
    for edge in &graph.edges {
        writer.write_record([
            edge.from.as_str(),
            name_of(&edge.from).as_str(),
            edge.kind.as_str(),
            edge.to.as_str(),
            name_of(&edge.to).as_str(),
            edge.from_path.as_str(),
            edge.to_path.as_str(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("csv flush failed: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}

/// Graphviz digraph; with `cluster`, nodes are grouped per file.
pub fn export_dot(graph: &EnrichedGraph, cluster: bool) -> String {
    let mut out = String::from("digraph blastmap {\n");
    out.push_str("  rankdir=LR;\n");
    out.push_str("  node [fontname=\"Helvetica\"];\n");

    if cluster {
        let mut by_file: BTreeMap<&str, Vec<&EnrichedGraphNode>> = BTreeMap::new();
        for node in &graph.nodes {
            by_file.entry(node.file.as_str()).or_default().push(node);
        }
        for (index, (file, nodes)) in by_file.into_iter().enumerate() {
            let _ = writeln!(out, "  subgraph cluster_{} {{", index);
            let _ = writeln!(out, "    label=\"{}\";", escape_dot(file));
            for node in nodes {
                let _ = writeln!(out, "    {}", dot_node(node));
            }
            out.push_str("  }\n");
        }
    } else {
        for node in &graph.nodes {
            let _ = writeln!(out, "  {}", dot_node(node));
        }
    }

    for edge in &graph.edges {
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{}\"];",
            escape_dot(&edge.from),
            escape_dot(&edge.to),
            edge.kind
        );
    }
    out.push_str("}\n");
    out
}

fn dot_node(node: &EnrichedGraphNode) -> String {
    let shape = match node.kind {
        NodeKind::File => "folder",
        NodeKind::Class => "box",
        NodeKind::Interface => "component",
        NodeKind::Function => "ellipse",
    };
    format!(
        "\"{}\" [label=\"{}\", shape={}];",
        escape_dot(&node.id),
        escape_dot(&node.name),
        shape
    )
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
