//! `glink run`, `glink compare`, `glink validate`, `glink algorithms`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use serde::Serialize;

use guestlink_matcher::embedding::Capabilities;
use guestlink_matcher::hooks::{run_post_match_hooks, HookContext, PostMatchHook, RunHooks};
use guestlink_matcher::model::MatchSummary;
use guestlink_matcher::scorer::build_scorer;
use guestlink_matcher::{compare_algorithms, run, Algorithm, MatchConfig, MatchError, MatchInput, MatchOutput};

use crate::exit_codes::{
    match_exit_code, EXIT_MATCH_CANCELLED, EXIT_MATCH_INVALID_CONFIG, EXIT_MATCH_RUNTIME, EXIT_MATCH_UNMATCHED,
};
use crate::export::MergedCsvExport;
use crate::load::load_table;
use crate::CliError;

#[derive(Args)]
pub struct RunArgs {
    /// Path to the .match.toml config file
    pub config: PathBuf,

    /// Output JSON to stdout instead of human summary
    #[arg(long)]
    pub json: bool,

    /// Write JSON output to file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write merged T1_/T2_ rows with scores to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Override the config's algorithm
    #[arg(long)]
    pub algorithm: Option<String>,

    /// Override the config's threshold (0-100)
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Exit 62 when any survey or PMS row is left unmatched
    #[arg(long)]
    pub strict: bool,

    /// Print percent progress to stderr
    #[arg(long)]
    pub progress: bool,

    /// Stop after this many seconds and keep the partial results (exit 64)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Args)]
pub struct CompareArgs {
    /// Path to the .match.toml config file
    pub config: PathBuf,

    /// Algorithms to run (default: every algorithm this build supports)
    #[arg(long, value_delimiter = ',')]
    pub algorithms: Vec<String>,

    /// Output JSON to stdout instead of human summary
    #[arg(long)]
    pub json: bool,

    /// Write JSON output to file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

fn match_err(err: MatchError) -> CliError {
    let code = match_exit_code(&err);
    let hint = match &err {
        MatchError::Unavailable { algorithm, .. } if algorithm == "semantic" => {
            Some("glink ships no embedding model; pick a string algorithm".to_string())
        }
        MatchError::Unavailable { .. } => Some("rebuild with the default `phonetic` feature".to_string()),
        MatchError::MissingColumn { .. } => Some("check the [*.columns] mapping against the file header".to_string()),
        _ => None,
    };
    CliError {
        code,
        message: err.to_string(),
        hint,
    }
}

fn runtime_err(msg: impl Into<String>) -> CliError {
    CliError {
        code: EXIT_MATCH_RUNTIME,
        message: msg.into(),
        hint: None,
    }
}

fn load_config(path: &Path) -> Result<MatchConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| runtime_err(format!("cannot read config: {e}")))?;
    MatchConfig::from_toml(&text).map_err(match_err)
}

/// Load both tables. File paths resolve relative to the config file's directory.
fn load_input(config: &MatchConfig, config_path: &Path) -> Result<MatchInput, CliError> {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let mut tables = Vec::with_capacity(2);
    for (table, t) in [("gss", &config.gss), ("opera", &config.opera)] {
        let Some(file) = t.file.as_deref() else {
            return Err(CliError {
                code: EXIT_MATCH_INVALID_CONFIG,
                message: format!("{table}: no file given"),
                hint: Some(format!("add `file = \"...\"` under [{table}]")),
            });
        };
        let rows = load_table(table, &base_dir.join(file), &t.columns).map_err(match_err)?;
        tables.push(rows);
    }

    let opera = tables.pop().unwrap_or_default();
    let gss = tables.pop().unwrap_or_default();
    Ok(MatchInput { gss, opera })
}

fn write_json<T: Serialize>(value: &T, json_output: bool, output_file: Option<&Path>) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| runtime_err(format!("JSON serialization error: {e}")))?;

    if let Some(path) = output_file {
        std::fs::write(path, &json_str).map_err(|e| runtime_err(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }
    if json_output {
        println!("{json_str}");
    }
    Ok(())
}

fn unmatched(s: &MatchSummary) -> usize {
    s.unmatched_gss + s.unmatched_opera
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let mut config = load_config(&args.config)?;
    if let Some(name) = &args.algorithm {
        config.algorithm = name.parse().map_err(match_err)?;
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
        config.validate().map_err(match_err)?;
    }

    let input = load_input(&config, &args.config)?;

    let deadline = args.timeout.map(|secs| Instant::now() + Duration::from_secs(secs));
    let cancel = move || deadline.is_some_and(|d| Instant::now() >= d);
    let show_progress = args.progress;
    let progress = move |percent: u8| {
        if show_progress {
            eprintln!("progress: {percent}%");
        }
    };

    let output = run(&config, &input, &Capabilities::none(), &RunHooks::new(&progress, &cancel)).map_err(match_err)?;

    let export = args.csv.as_ref().map(MergedCsvExport::new);
    let hooks: Vec<&dyn PostMatchHook> = export.iter().map(|e| e as &dyn PostMatchHook).collect();
    let reports = run_post_match_hooks(
        &hooks,
        &HookContext {
            config: &config,
            input: &input,
            output: &output,
        },
    );

    write_json(&output, args.json, args.output.as_deref())?;
    if let Some(path) = &args.csv {
        if !reports.iter().any(|r| r.failed()) {
            eprintln!("wrote {}", path.display());
        }
    }

    print_summary(&config, &output);

    for report in reports {
        report.into_result().map_err(match_err)?;
    }

    if output.is_cancelled() {
        return Err(CliError {
            code: EXIT_MATCH_CANCELLED,
            message: format!("run cancelled after {} result(s)", output.results.len()),
            hint: Some("raise --timeout to let the run finish".to_string()),
        });
    }
    if args.strict && unmatched(&output.summary) > 0 {
        return Err(CliError {
            code: EXIT_MATCH_UNMATCHED,
            message: format!("{} unmatched row(s) (--strict)", unmatched(&output.summary)),
            hint: None,
        });
    }

    Ok(())
}

fn print_summary(config: &MatchConfig, output: &MatchOutput) {
    let s = &output.summary;
    eprintln!(
        "{} ({}): {} survey rows, {} PMS rows: {} matched, {} unmatched survey, {} unmatched PMS",
        config.name,
        output.meta.algorithm.label(),
        s.total_gss,
        s.total_opera,
        s.matched,
        s.unmatched_gss,
        s.unmatched_opera,
    );

    // ladder order, not map order
    let by_pass: Vec<String> = output
        .meta
        .passes
        .iter()
        .filter_map(|p| s.by_pass.get(&p.label).map(|n| format!("{} {n}", p.label)))
        .collect();
    if !by_pass.is_empty() {
        eprintln!("  passes: {}", by_pass.join(", "));
    }

    let by_confidence: Vec<String> = s.by_confidence.iter().map(|(band, n)| format!("{band} {n}")).collect();
    if !by_confidence.is_empty() {
        eprintln!("  confidence: {}", by_confidence.join(", "));
    }
}

// ============================================================================
// compare
// ============================================================================

#[derive(Serialize)]
struct Comparison {
    algorithm: Algorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<MatchOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn supported_algorithms() -> Vec<Algorithm> {
    Algorithm::ALL
        .into_iter()
        .filter(|a| availability(*a).is_ok())
        .collect()
}

pub fn cmd_compare(args: CompareArgs) -> Result<(), CliError> {
    let config = load_config(&args.config)?;
    let algorithms = if args.algorithms.is_empty() {
        supported_algorithms()
    } else {
        args.algorithms
            .iter()
            .map(|name| name.parse::<Algorithm>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(match_err)?
    };

    let input = load_input(&config, &args.config)?;
    let never = || false;
    let results = compare_algorithms(&config, &input, &Capabilities::none(), &algorithms, &never);

    let mut first_error = None;
    let mut comparisons = Vec::with_capacity(results.len());
    eprintln!("{}: {} survey rows, {} PMS rows", config.name, input.gss.len(), input.opera.len());
    for (algorithm, result) in results {
        match result {
            Ok(output) => {
                let s = &output.summary;
                eprintln!(
                    "  {:<20} {:>5} matched {:>5} unmatched survey {:>5} unmatched PMS",
                    algorithm.label(),
                    s.matched,
                    s.unmatched_gss,
                    s.unmatched_opera,
                );
                comparisons.push(Comparison {
                    algorithm,
                    output: Some(output),
                    error: None,
                });
            }
            Err(e) => {
                eprintln!("  {:<20} error: {e}", algorithm.label());
                comparisons.push(Comparison {
                    algorithm,
                    output: None,
                    error: Some(e.to_string()),
                });
                first_error.get_or_insert(e);
            }
        }
    }

    write_json(&comparisons, args.json, args.output.as_deref())?;

    match first_error {
        Some(e) => Err(match_err(e)),
        None => Ok(()),
    }
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let ladder: Vec<String> = config
        .pass_ladder()
        .iter()
        .map(|p| {
            let dateless = if p.allow_dateless { ", dateless" } else { "" };
            format!("{} {}/{}d{dateless}", p.label, p.threshold, p.date_tolerance_days)
        })
        .collect();
    eprintln!(
        "valid: '{}' using {}, {} pass(es): {}",
        config.name,
        config.algorithm.label(),
        ladder.len(),
        ladder.join(", "),
    );
    if let Err(e) = availability(config.algorithm) {
        eprintln!("warning: {e}");
    }
    Ok(())
}

// ============================================================================
// algorithms
// ============================================================================

#[derive(Serialize)]
struct AlgorithmInfo {
    key: &'static str,
    label: &'static str,
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Whether `algorithm` can run in this binary.
fn availability(algorithm: Algorithm) -> Result<(), MatchError> {
    let mut config = MatchConfig::default();
    config.algorithm = algorithm;
    build_scorer(&config, &Capabilities::none()).map(|_| ())
}

pub fn cmd_algorithms(json: bool) -> Result<(), CliError> {
    let infos: Vec<AlgorithmInfo> = Algorithm::ALL
        .into_iter()
        .map(|a| {
            let reason = availability(a).err().map(|e| e.to_string());
            AlgorithmInfo {
                key: a.key(),
                label: a.label(),
                available: reason.is_none(),
                reason,
            }
        })
        .collect();

    if json {
        return write_json(&infos, true, None);
    }
    for info in &infos {
        match &info.reason {
            None => println!("{:<18} {}", info.key, info.label),
            Some(reason) => println!("{:<18} {} (unavailable: {reason})", info.key, info.label),
        }
    }
    Ok(())
}
