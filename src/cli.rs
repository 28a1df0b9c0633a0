//! CLI argument parsing for blastmap
//!
//! Defines the Command enum and parse_args() for all CLI commands.

use anyhow::Result;
use blastmap::graph::ExportFormat;
use blastmap::impact::Direction;
use blastmap::{AnalysisConfig, OutputFormat, RelationshipKind};
use std::path::PathBuf;
use std::time::Duration;

pub fn print_usage() {
    eprintln!("blastmap - semantic code graph and change impact analysis");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  blastmap <command> [arguments]");
    eprintln!("  blastmap --help");
    eprintln!();
    eprintln!("  blastmap graph --root <DIR> [--enrich] [ANALYSIS] [--output <FORMAT>]");
    eprintln!("  blastmap export --root <DIR> [--format <FORMAT>] [--minify] [--cluster] [--out <PATH>] [ANALYSIS]");
    eprintln!("  blastmap changes --head <DIR> --base <DIR> --diff <FILE> [--file <PATH>] [ANALYSIS] [--output <FORMAT>]");
    eprintln!("  blastmap impact --head <DIR> --base <DIR> --diff <FILE> [--file <PATH>] [--direction <DIR>]");
    eprintln!("                  [--kinds <K1,K2>] [--max-depth <N>] [ANALYSIS] [--output <FORMAT>]");
    eprintln!("  blastmap version");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  graph     Assemble the code graph and print its size");
    eprintln!("  export    Export the enriched graph (json, jsonl, csv, dot)");
    eprintln!("  changes   Map a unified diff to added, modified and deleted functions");
    eprintln!("  impact    Show functions affected by the changes in a diff");
    eprintln!("  version   Print version information");
    eprintln!();
    eprintln!("Analysis arguments:");
    eprintln!("  --include <GLOB>        Only analyze matching files (repeatable)");
    eprintln!("  --exclude <GLOB>        Skip matching files (repeatable)");
    eprintln!("  --no-gitignore          Do not honor .gitignore/.ignore");
    eprintln!("  --timeout-secs <N>      Per-file extraction timeout (default: 60)");
    eprintln!("  --max-file-size <N>     Skip files larger than N bytes (default: 1048576)");
    eprintln!("  --workers <N>           Concurrent extraction workers (default: CPU count)");
    eprintln!("  --verbose, -v           Log progress to stderr");
    eprintln!();
    eprintln!("Impact arguments:");
    eprintln!("  --direction <DIR>       forward, backward (default) or both");
    eprintln!("  --kinds <LIST>          Relationship kinds to follow, comma separated (default: all)");
    eprintln!("  --max-depth <N>         Deepest level to report");
    eprintln!();
    eprintln!("Global arguments:");
    eprintln!("  --output <FORMAT>       human (default), json or pretty");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  BLASTMAP_FILE_TIMEOUT_SECS, BLASTMAP_MAX_FILE_SIZE   Override defaults; flags win");
    eprintln!("  RUST_LOG                                            Log filter (default: warn)");
}

/// Diff inputs shared by `changes` and `impact`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffArgs {
    pub head: PathBuf,
    pub base: PathBuf,
    pub diff: PathBuf,
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Graph {
        root: PathBuf,
        enrich: bool,
        config: AnalysisConfig,
        output_format: OutputFormat,
    },
    Export {
        root: PathBuf,
        format: ExportFormat,
        minify: bool,
        cluster: bool,
        out: Option<PathBuf>,
        config: AnalysisConfig,
    },
    Changes {
        diff: DiffArgs,
        config: AnalysisConfig,
        output_format: OutputFormat,
    },
    Impact {
        diff: DiffArgs,
        direction: Direction,
        kinds: Option<Vec<RelationshipKind>>,
        max_depth: Option<usize>,
        config: AnalysisConfig,
        output_format: OutputFormat,
    },
    Version,
    Help,
}

/// Parsed command plus global flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub verbose: bool,
}

/// Walks the argument list; every flag handler consumes its own value.
struct Args<'a> {
    args: &'a [String],
    i: usize,
}

impl<'a> Args<'a> {
    fn next_flag(&mut self) -> Option<&'a str> {
        let flag = self.args.get(self.i)?;
        self.i += 1;
        Some(flag.as_str())
    }

    fn value(&mut self, flag: &str) -> Result<&'a str> {
        let value = self
            .args
            .get(self.i)
            .ok_or_else(|| anyhow::anyhow!("{} requires an argument", flag))?;
        self.i += 1;
        Ok(value.as_str())
    }

    fn number<T: std::str::FromStr>(&mut self, flag: &str) -> Result<T> {
        let raw = self.value(flag)?;
        raw.parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} expects a number, got {}", flag, raw))
    }
}

/// Flags every analyzing command accepts.
#[derive(Default)]
struct AnalysisFlags {
    include: Vec<String>,
    exclude: Vec<String>,
    no_gitignore: bool,
    timeout_secs: Option<u64>,
    max_file_size: Option<u64>,
    workers: Option<usize>,
}

impl AnalysisFlags {
    /// Handle `flag` if it is an analysis flag; `Ok(false)` otherwise.
    fn accept(&mut self, flag: &str, args: &mut Args<'_>) -> Result<bool> {
        match flag {
            "--include" => self.include.push(args.value(flag)?.to_string()),
            "--exclude" => self.exclude.push(args.value(flag)?.to_string()),
            "--no-gitignore" => self.no_gitignore = true,
            "--timeout-secs" => {
                let secs: u64 = args.number(flag)?;
                if secs == 0 {
                    return Err(anyhow::anyhow!("--timeout-secs must be positive"));
                }
                self.timeout_secs = Some(secs);
            }
            "--max-file-size" => self.max_file_size = Some(args.number(flag)?),
            "--workers" => {
                let workers: usize = args.number(flag)?;
                if workers == 0 {
                    return Err(anyhow::anyhow!("--workers must be positive"));
                }
                self.workers = Some(workers);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Flags applied over `base` (defaults plus environment).
    fn into_config(self, base: AnalysisConfig) -> AnalysisConfig {
        let mut config = base
            .with_include(self.include)
            .with_exclude(self.exclude)
            .with_gitignore(!self.no_gitignore);
        if let Some(secs) = self.timeout_secs {
            config = config.with_file_timeout(Duration::from_secs(secs));
        }
        if let Some(bytes) = self.max_file_size {
            config = config.with_max_file_size(bytes);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        config
    }
}

fn parse_output(raw: &str) -> Result<OutputFormat> {
    OutputFormat::from_str(raw).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid output format: {}. Must be human, json, or pretty",
            raw
        )
    })
}

fn parse_kinds(raw: &str) -> Result<Vec<RelationshipKind>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<RelationshipKind>().map_err(|e| anyhow::anyhow!(e)))
        .collect()
}

/// Parse arguments (without the program name) into an [`Invocation`].
///
/// `base` is the configuration flags are applied over, normally
/// [`AnalysisConfig::from_env`].
pub fn parse_args_from(args: &[String], base: AnalysisConfig) -> Result<Invocation> {
    let Some(command) = args.first() else {
        return Err(anyhow::anyhow!("Missing command"));
    };

    let mut verbose = false;
    let mut output_format = OutputFormat::Human;
    let mut analysis = AnalysisFlags::default();
    let mut root: Option<PathBuf> = None;
    let mut head: Option<PathBuf> = None;
    let mut base_dir: Option<PathBuf> = None;
    let mut diff: Option<PathBuf> = None;
    let mut file: Option<String> = None;
    let mut enrich = false;
    let mut format = ExportFormat::Json;
    let mut minify = false;
    let mut cluster = false;
    let mut out: Option<PathBuf> = None;
    let mut direction = Direction::Backward;
    let mut kinds: Option<Vec<RelationshipKind>> = None;
    let mut max_depth: Option<usize> = None;

    match command.as_str() {
        "--help" | "-h" | "help" => {
            return Ok(Invocation {
                command: Command::Help,
                verbose,
            })
        }
        "--version" | "-V" | "version" => {
            return Ok(Invocation {
                command: Command::Version,
                verbose,
            })
        }
        "graph" | "export" | "changes" | "impact" => {}
        other => return Err(anyhow::anyhow!("Unknown command: {}", other)),
    }

    let mut cursor = Args { args, i: 1 };
    while let Some(flag) = cursor.next_flag() {
        if analysis.accept(flag, &mut cursor)? {
            continue;
        }
        let command = command.as_str();
        match (command, flag) {
            (_, "--verbose" | "-v") => verbose = true,
            (_, "--output") => output_format = parse_output(cursor.value(flag)?)?,
            ("graph" | "export", "--root") => root = Some(PathBuf::from(cursor.value(flag)?)),
            ("graph", "--enrich") => enrich = true,
            ("export", "--format") => {
                let raw = cursor.value(flag)?;
                format = raw.parse::<ExportFormat>().map_err(|e| anyhow::anyhow!(e))?;
            }
            ("export", "--minify") => minify = true,
            ("export", "--cluster") => cluster = true,
            ("export", "--out") => out = Some(PathBuf::from(cursor.value(flag)?)),
            ("changes" | "impact", "--head") => head = Some(PathBuf::from(cursor.value(flag)?)),
            ("changes" | "impact", "--base") => base_dir = Some(PathBuf::from(cursor.value(flag)?)),
            ("changes" | "impact", "--diff") => diff = Some(PathBuf::from(cursor.value(flag)?)),
            ("changes" | "impact", "--file") => file = Some(cursor.value(flag)?.to_string()),
            ("impact", "--direction") => {
                let raw = cursor.value(flag)?;
                direction = raw.parse::<Direction>().map_err(|e| anyhow::anyhow!(e))?;
            }
            ("impact", "--kinds") => kinds = Some(parse_kinds(cursor.value(flag)?)?),
            ("impact", "--max-depth") => max_depth = Some(cursor.number(flag)?),
            _ => return Err(anyhow::anyhow!("Unknown argument: {}", flag)),
        }
    }

    let config = analysis.into_config(base);
    let diff_args = |head: Option<PathBuf>, base: Option<PathBuf>, diff: Option<PathBuf>, file| -> Result<DiffArgs> {
        Ok(DiffArgs {
            head: head.ok_or_else(|| anyhow::anyhow!("--head is required"))?,
            base: base.ok_or_else(|| anyhow::anyhow!("--base is required"))?,
            diff: diff.ok_or_else(|| anyhow::anyhow!("--diff is required"))?,
            file,
        })
    };

    let command = match command.as_str() {
        "graph" => Command::Graph {
            root: root.ok_or_else(|| anyhow::anyhow!("--root is required"))?,
            enrich,
            config,
            output_format,
        },
        "export" => Command::Export {
            root: root.ok_or_else(|| anyhow::anyhow!("--root is required"))?,
            format,
            minify,
            cluster,
            out,
            config,
        },
        "changes" => Command::Changes {
            diff: diff_args(head, base_dir, diff, file)?,
            config,
            output_format,
        },
        _ => Command::Impact {
            diff: diff_args(head, base_dir, diff, file)?,
            direction,
            kinds,
            max_depth,
            config,
            output_format,
        },
    };

    Ok(Invocation { command, verbose })
}

/// Parse the process arguments.
pub fn parse_args() -> Result<Invocation> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    parse_args_from(&args, AnalysisConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_graph_with_analysis_flags() {
        let invocation = parse_args_from(
            &args(&[
                "graph", "--root", "/p", "--enrich", "--exclude", "gen/**", "--timeout-secs", "5",
                "--workers", "3", "--output", "json", "-v",
            ]),
            AnalysisConfig::default(),
        )
        .unwrap();
        assert!(invocation.verbose);
        match invocation.command {
            Command::Graph {
                root,
                enrich,
                config,
                output_format,
            } => {
                assert_eq!(root, PathBuf::from("/p"));
                assert!(enrich);
                assert_eq!(config.exclude, vec!["gen/**".to_string()]);
                assert_eq!(config.file_timeout, Duration::from_secs(5));
                assert_eq!(config.workers, 3);
                assert_eq!(output_format, OutputFormat::Json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_impact() {
        let invocation = parse_args_from(
            &args(&[
                "impact", "--head", "h", "--base", "b", "--diff", "d.patch", "--direction", "both",
                "--kinds", "calls,IMPORTS", "--max-depth", "2",
            ]),
            AnalysisConfig::default(),
        )
        .unwrap();
        match invocation.command {
            Command::Impact {
                diff,
                direction,
                kinds,
                max_depth,
                ..
            } => {
                assert_eq!(diff.diff, PathBuf::from("d.patch"));
                assert_eq!(diff.file, None);
                assert_eq!(direction, Direction::Both);
                assert_eq!(
                    kinds,
                    Some(vec![RelationshipKind::Calls, RelationshipKind::Imports])
                );
                assert_eq!(max_depth, Some(2));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_flags_win_over_base_config() {
        let base = AnalysisConfig::default().with_max_file_size(10);
        let invocation = parse_args_from(
            &args(&["export", "--root", "r", "--max-file-size", "99", "--format", "dot"]),
            base,
        )
        .unwrap();
        match invocation.command {
            Command::Export { config, format, .. } => {
                assert_eq!(config.max_file_size, 99);
                assert_eq!(format, ExportFormat::Dot);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_usage_errors() {
        let base = AnalysisConfig::default;
        assert!(parse_args_from(&[], base()).is_err());
        assert!(parse_args_from(&args(&["frobnicate"]), base()).is_err());
        assert!(parse_args_from(&args(&["graph"]), base()).is_err());
        assert!(parse_args_from(&args(&["graph", "--root"]), base()).is_err());
        assert!(parse_args_from(&args(&["graph", "--root", "r", "--direction", "in"]), base()).is_err());
        assert!(parse_args_from(&args(&["changes", "--head", "h", "--base", "b"]), base()).is_err());
        assert!(parse_args_from(&args(&["impact", "--kinds", "SOMETIMES"]), base()).is_err());
        assert!(parse_args_from(&args(&["graph", "--root", "r", "--workers", "0"]), base()).is_err());
    }

    #[test]
    fn test_help_and_version() {
        let base = AnalysisConfig::default;
        assert_eq!(
            parse_args_from(&args(&["--help"]), base()).unwrap().command,
            Command::Help
        );
        assert_eq!(
            parse_args_from(&args(&["version"]), base()).unwrap().command,
            Command::Version
        );
    }
}
