// glink - match guest survey responses to Opera PMS stays

mod exit_codes;
mod export;
mod load;
mod matching;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use matching::{CompareArgs, RunArgs};

#[derive(Parser)]
#[command(name = "glink")]
#[command(about = "Approximate matching of guest survey rows to Opera PMS records")]
#[command(version)]
struct Cli {
    /// Log engine activity (info level; RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Match the two tables named in a config file
    #[command(after_help = "\
Examples:
  glink run january.match.toml
  glink run january.match.toml --json
  glink run january.match.toml --output result.json --csv merged.csv
  glink run january.match.toml --algorithm jaro_winkler --threshold 80 --strict")]
    Run(RunArgs),

    /// Run several algorithms on the same input and compare the outcomes
    #[command(after_help = "\
Examples:
  glink compare january.match.toml
  glink compare january.match.toml --algorithms ensemble,jaro_winkler,record_linkage --json")]
    Compare(CompareArgs),

    /// Validate a match config without running
    #[command(after_help = "\
Examples:
  glink validate january.match.toml")]
    Validate {
        /// Path to the .match.toml config file
        config: PathBuf,
    },

    /// List matching algorithms and whether this build supports them
    Algorithms {
        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            eprintln!("Usage: glink <command> [options]");
            eprintln!("       glink --help for more information");
            Err(CliError {
                code: EXIT_USAGE,
                message: String::new(),
                hint: None,
            })
        }
        Some(Commands::Run(args)) => matching::cmd_run(args),
        Some(Commands::Compare(args)) => matching::cmd_compare(args),
        Some(Commands::Validate { config }) => matching::cmd_validate(config),
        Some(Commands::Algorithms { json }) => matching::cmd_algorithms(json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
