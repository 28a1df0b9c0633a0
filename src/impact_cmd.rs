//! Impact command implementation
//!
//! Maps a diff to changed functions, then walks the enriched graphs from
//! them and reports every affected function by level.

use anyhow::Result;
use blastmap::impact::{Direction, ImpactLevel, TraversalOptions};
use blastmap::output::{generate_execution_id, output_json, ImpactResponse, JsonResponse, OutputFormat};
use blastmap::pipeline::analyze_impact;
use blastmap::{AnalysisConfig, RelationshipKind};

use crate::changes_cmd::load_change;
use crate::cli::DiffArgs;

fn print_levels(levels: &[ImpactLevel]) {
    for level in levels {
        println!("Level {}:", level.level);
        for node in &level.nodes {
            println!("  [{}] {}  ({})", node.severity, node.name, node.file_path);
        }
    }
}

pub fn run_impact(
    args: DiffArgs,
    direction: Direction,
    kinds: Option<Vec<RelationshipKind>>,
    max_depth: Option<usize>,
    config: AnalysisConfig,
    output_format: OutputFormat,
) -> Result<()> {
    let (head, base, change) = load_change(&args, &config, output_format.is_json())?;

    let mut options = TraversalOptions::new(direction).with_max_depth(max_depth);
    if let Some(kinds) = &kinds {
        options = options.with_kinds(kinds.iter().copied());
    }

    let head_graph = head.enrich();
    let base_graph = base.enrich();
    let impact = analyze_impact(&head_graph, &base_graph, &change.changes, &options);

    let mut diagnostics = head.diagnostics();
    diagnostics.extend(base.diagnostics());
    let partial = head.is_partial() || base.is_partial();

    if output_format.is_json() {
        let response = ImpactResponse {
            direction,
            max_depth,
            kinds: kinds
                .unwrap_or_default()
                .iter()
                .map(|k| k.as_str().to_string())
                .collect(),
            changes: change.changes,
            results: impact.results,
            report: impact.report,
            diagnostics,
        };
        let json = JsonResponse::new(response, &generate_execution_id()).with_partial(partial);
        return output_json(&json, output_format);
    }

    for diagnostic in &diagnostics {
        eprintln!("{}", diagnostic.format_stderr());
    }
    println!(
        "Changed: {} added, {} modified, {} deleted",
        change.changes.added.len(),
        change.changes.modified.len(),
        change.changes.deleted.len()
    );
    for result in &impact.results {
        println!();
        println!("{} ({} impacted)", result.seed, result.summary.total);
        print_levels(&result.levels);
    }

    let summary = &impact.report.summary;
    println!();
    println!(
        "Total: {} impacted functions across {} levels ({})",
        summary.total, summary.max_level, direction
    );
    for (severity, count) in summary.by_severity.iter().rev() {
        println!("  {:<8} {}", severity, count);
    }
    Ok(())
}
