//! Graph command implementation
//!
//! Assembles the code graph of a project and reports its size.

use anyhow::Result;
use blastmap::output::{
    generate_execution_id, output_json, EnrichedCounts, GraphResponse, JsonResponse, OutputFormat,
};
use blastmap::pipeline::analyze_root;
use blastmap::AnalysisConfig;
use std::path::PathBuf;

use crate::progress::extraction_progress;

pub fn run_graph(
    root: PathBuf,
    enrich: bool,
    config: AnalysisConfig,
    output_format: OutputFormat,
) -> Result<()> {
    let progress = extraction_progress("extracting", output_format.is_json());
    let analysis = analyze_root(&root, &config, progress)?;
    let graph = &analysis.report.graph;

    let enriched = if enrich {
        let enriched = analysis.enrich();
        Some(EnrichedCounts {
            nodes: enriched.nodes.len(),
            edges: enriched.edges.len(),
            edges_by_kind: enriched
                .edge_counts()
                .into_iter()
                .map(|(kind, count)| (kind.as_str().to_string(), count))
                .collect(),
        })
    } else {
        None
    };

    let response = GraphResponse {
        root: analysis.root.clone(),
        files_analyzed: analysis.report.files_analyzed,
        types: graph.type_count(),
        functions: graph.function_count(),
        calls: graph.call_count(),
        enriched,
        diagnostics: analysis.diagnostics(),
    };

    if output_format.is_json() {
        let json = JsonResponse::new(response, &generate_execution_id())
            .with_partial(analysis.is_partial());
        return output_json(&json, output_format);
    }

    for diagnostic in &response.diagnostics {
        eprintln!("{}", diagnostic.format_stderr());
    }
    println!("Root: {}", response.root);
    println!("Files analyzed: {}", response.files_analyzed);
    println!("Types: {}", response.types);
    println!("Functions: {}", response.functions);
    println!("Calls: {}", response.calls);
    if let Some(enriched) = &response.enriched {
        println!("Enriched nodes: {}", enriched.nodes);
        println!("Enriched edges: {}", enriched.edges);
        for (kind, count) in &enriched.edges_by_kind {
            println!("  {:<22} {}", kind, count);
        }
    }
    if analysis.is_partial() {
        println!("Partial: {} files failed", analysis.report.diagnostics.len());
    }
    Ok(())
}
