// gridcheck: reconcile spreadsheet ranges against API records.

mod exit_codes;
mod logging;
mod runner;
mod scenario;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;
use runner::RunOptions;

#[derive(Parser)]
#[command(name = "gridcheck")]
#[command(about = "Check spreadsheet ranges against live API records")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log level when GRIDCHECK_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run reconciliation scenarios
    #[command(after_help = "\
Examples:
  gridcheck run scenarios/
  gridcheck run scenarios/ --name 'View holdings'
  gridcheck run scenarios/ --fixtures recorded/ --json
  gridcheck run holdings.scenario.toml --output report.json

Exit codes:
  0  all scenarios passed or were skipped
  2  usage error (no scenarios found, unknown --name)
  3  a scenario config is invalid
  4  discrepancies found, or a range had no records
  5  runtime failure (workbook, API, credentials)")]
    Run {
        /// Scenario files or directories (searched for *.scenario.toml)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Only run the scenario with this name
        #[arg(long)]
        name: Option<String>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Write the run report as JSON to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Directory of recorded API responses (<call>.json) to use instead of HTTP
        #[arg(long, env = "GRIDCHECK_FIXTURES")]
        fixtures: Option<PathBuf>,

        /// Secrets file with api_url and token
        #[arg(long)]
        secrets: Option<PathBuf>,
    },

    /// Parse and validate scenario files without running them
    Validate {
        /// Scenario files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List discovered scenarios
    List {
        /// Scenario files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
            "\nreport_version(run): 1",
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
            "\nreport_version(run): 1",
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Run { paths, name, json, output, fixtures, secrets } => {
            runner::cmd_run(paths, RunOptions { name, fixtures, secrets }, json, output)
        }
        Commands::Validate { paths } => scenario::cmd_validate(paths),
        Commands::List { paths, json } => scenario::cmd_list(paths, json),
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

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
