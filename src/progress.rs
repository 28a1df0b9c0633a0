//! Extraction progress bars for the CLI.

use blastmap::graph::AssembleProgress;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Progress callback drawing a bar on stderr, or `None` when quiet.
///
/// indicatif hides the bar by itself when stderr is not a terminal.
pub fn extraction_progress(label: &str, quiet: bool) -> Option<Arc<AssembleProgress>> {
    if quiet {
        return None;
    }
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos}/{len} files")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_prefix(label.to_string());

    let callback: Arc<AssembleProgress> = Arc::new(move |done: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
        if done == total {
            bar.finish_and_clear();
        }
    });
    Some(callback)
}
