//! Changes command implementation
//!
//! Maps a unified diff onto the functions of two project snapshots.

use anyhow::Result;
use blastmap::diff::FunctionDescriptor;
use blastmap::error_codes::{BLM_DIF_001_UNREADABLE, BLM_DIF_002_NO_HUNKS};
use blastmap::output::{
    diff_error_messages, generate_execution_id, output_json, ChangesResponse, JsonResponse,
    OutputFormat,
};
use blastmap::pipeline::{analyze_changes, analyze_root, Analysis, ChangeAnalysis};
use blastmap::AnalysisConfig;

use crate::cli::DiffArgs;
use crate::progress::extraction_progress;

/// Diff input error carrying its stable code.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct DiffInputError {
    pub code: &'static str,
    pub message: String,
}

/// Read the diff, analyze both snapshots and map the diff onto them.
pub fn load_change(
    args: &DiffArgs,
    config: &AnalysisConfig,
    quiet: bool,
) -> Result<(Analysis, Analysis, ChangeAnalysis)> {
    let diff_text = std::fs::read_to_string(&args.diff)
        .map_err(|err| DiffInputError {
            code: BLM_DIF_001_UNREADABLE,
            message: format!("cannot read diff {}: {}", args.diff.display(), err),
        })?;

    let head = analyze_root(&args.head, config, extraction_progress("head", quiet))?;
    let base = analyze_root(&args.base, config, extraction_progress("base", quiet))?;
    let change = analyze_changes(&head, &base, &diff_text, args.file.as_deref());

    for err in &change.diff_errors {
        log::warn!("{}", err);
    }
    // an empty diff is a valid "no changes"; only garbage is rejected
    if !change.has_hunks && !change.diff_errors.is_empty() {
        return Err(DiffInputError {
            code: BLM_DIF_002_NO_HUNKS,
            message: format!("{} contains no valid hunk", args.diff.display()),
        }
        .into());
    }
    Ok((head, base, change))
}

fn print_bucket(label: &str, functions: &[FunctionDescriptor]) {
    println!("{} ({}):", label, functions.len());
    for function in functions {
        println!("  {}  {}", function.full_name, function.id);
    }
}

pub fn run_changes(args: DiffArgs, config: AnalysisConfig, output_format: OutputFormat) -> Result<()> {
    let (head, base, change) = load_change(&args, &config, output_format.is_json())?;

    let mut diagnostics = head.diagnostics();
    diagnostics.extend(base.diagnostics());
    let partial = head.is_partial() || base.is_partial();

    if output_format.is_json() {
        let response = ChangesResponse {
            head: head.root.clone(),
            base: base.root.clone(),
            file: args.file.clone(),
            changes: change.changes,
            diff_errors: diff_error_messages(&change.diff_errors),
            diagnostics,
        };
        let json = JsonResponse::new(response, &generate_execution_id()).with_partial(partial);
        return output_json(&json, output_format);
    }

    for diagnostic in &diagnostics {
        eprintln!("{}", diagnostic.format_stderr());
    }
    print_bucket("Added", &change.changes.added);
    print_bucket("Modified", &change.changes.modified);
    print_bucket("Deleted", &change.changes.deleted);
    Ok(())
}
