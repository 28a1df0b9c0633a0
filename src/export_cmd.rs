//! Export command implementation
//!
//! Exports the enriched graph to JSON/JSONL/CSV/DOT.

use anyhow::{Context, Result};
use blastmap::graph::{export_enriched, ExportConfig, ExportFormat};
use blastmap::pipeline::analyze_root;
use blastmap::AnalysisConfig;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::progress::extraction_progress;

/// Run the export command
///
/// Output goes to stdout by default, or to `out` when given. Skipped and
/// failed files are reported on stderr so stdout stays machine-readable.
pub fn run_export(
    root: PathBuf,
    format: ExportFormat,
    minify: bool,
    cluster: bool,
    out: Option<PathBuf>,
    config: AnalysisConfig,
) -> Result<()> {
    let progress = extraction_progress("extracting", out.is_none());
    let analysis = analyze_root(&root, &config, progress)?;
    for diagnostic in &analysis.report.diagnostics {
        eprintln!("{}", diagnostic.format_stderr());
    }

    let graph = analysis.enrich();
    let export_config = ExportConfig::new(format)
        .with_minify(minify)
        .with_cluster(cluster);
    let rendered = export_enriched(&graph, &export_config)?;

    match out {
        Some(path) => {
            let mut file = File::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            file.write_all(rendered.as_bytes())
                .with_context(|| format!("writing {}", path.display()))?;
            log::info!(
                "exported {} nodes, {} edges to {}",
                graph.nodes.len(),
                graph.edges.len(),
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            if !rendered.ends_with('\n') {
                writeln!(stdout)?;
            }
        }
    }
    Ok(())
}
