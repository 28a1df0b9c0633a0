//! blastmap CLI - code graphs, diff-to-function mapping and change impact
//!
//! Usage: blastmap <command> [arguments]

mod changes_cmd;
mod cli;
mod export_cmd;
mod graph_cmd;
mod impact_cmd;
mod progress;

use blastmap::error_codes::{code_for, BLM_ARG_001_INVALID, BLM_IO_001_INVALID_PATH, BLM_IO_002_WRITE_FAILED};
use blastmap::graph::AssembleError;
use blastmap::output::{generate_execution_id, render_json, ErrorResponse, JsonResponse};
use blastmap::validation::PathValidationError;
use blastmap::OutputFormat;
use std::process::ExitCode;

use changes_cmd::DiffInputError;
use cli::{parse_args, print_usage, Command};

/// Structural failure (bad root, unreadable diff, I/O).
const EXIT_FAILURE: u8 = 1;
/// Bad command line.
const EXIT_USAGE: u8 = 2;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .try_init();
}

/// Stable code and category for a command failure.
fn classify_error(err: &anyhow::Error) -> (&'static str, &'static str) {
    if let Some(assemble) = err.downcast_ref::<AssembleError>() {
        return (code_for(assemble), "analysis_failed");
    }
    if let Some(diff) = err.downcast_ref::<DiffInputError>() {
        return (diff.code, "invalid_diff");
    }
    if err.downcast_ref::<PathValidationError>().is_some() {
        return (BLM_IO_001_INVALID_PATH, "invalid_path");
    }
    (BLM_IO_002_WRITE_FAILED, "io_error")
}

fn report_error(err: &anyhow::Error, output_format: OutputFormat) -> ExitCode {
    let (code, category) = classify_error(err);
    if output_format.is_json() {
        let response = ErrorResponse {
            code: code.to_string(),
            error: category.to_string(),
            message: format!("{:#}", err),
        };
        let json = JsonResponse::new(response, &generate_execution_id());
        match render_json(&json, output_format) {
            Ok(rendered) => println!("{}", rendered),
            Err(render_err) => eprintln!("Error: {:#}", render_err),
        }
    } else {
        eprintln!("Error [{}]: {:#}", code, err);
    }
    ExitCode::from(EXIT_FAILURE)
}

fn output_format_of(command: &Command) -> OutputFormat {
    match command {
        Command::Graph { output_format, .. }
        | Command::Changes { output_format, .. }
        | Command::Impact { output_format, .. } => *output_format,
        _ => OutputFormat::Human,
    }
}

fn main() -> ExitCode {
    let invocation = match parse_args() {
        Ok(invocation) => invocation,
        Err(err) => {
            init_logging(false);
            eprintln!("Error [{}]: {}", BLM_ARG_001_INVALID, err);
            eprintln!();
            print_usage();
            return ExitCode::from(EXIT_USAGE);
        }
    };
    init_logging(invocation.verbose);

    let output_format = output_format_of(&invocation.command);
    let result = match invocation.command {
        Command::Help => {
            print_usage();
            Ok(())
        }
        Command::Version => {
            println!("{}", blastmap::version::version());
            Ok(())
        }
        Command::Graph {
            root,
            enrich,
            config,
            output_format,
        } => graph_cmd::run_graph(root, enrich, config, output_format),
        Command::Export {
            root,
            format,
            minify,
            cluster,
            out,
            config,
        } => export_cmd::run_export(root, format, minify, cluster, out, config),
        Command::Changes {
            diff,
            config,
            output_format,
        } => changes_cmd::run_changes(diff, config, output_format),
        Command::Impact {
            diff,
            direction,
            kinds,
            max_depth,
            config,
            output_format,
        } => impact_cmd::run_impact(diff, direction, kinds, max_depth, config, output_format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err, output_format),
    }
}
