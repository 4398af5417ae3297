// FairMine - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Config discovery and validation
// 3. Logging initialisation (debug mode support)
// 4. Running the experiment and reporting the outcome
//
// Exit codes: 0 success, 1 a log or an artifact failed, 2 unusable
// configuration or no logs to analyse.

use clap::{Parser, Subcommand};
use fairmine::app::experiment::{self, Mode};
use fairmine::platform::config::{self, PlatformPaths};
use fairmine::util::{self, error::FairMineError};
use std::path::PathBuf;
use std::process::ExitCode;

/// Compare process-discovery algorithms on event logs and measure how
/// protected cases are represented among conformance outliers.
#[derive(Parser, Debug)]
#[command(name = "fairmine", version, about)]
struct Cli {
    /// Config file (default: ./fairmine.toml, then the platform config dir).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Directory charts and result tables are written to.
    #[arg(short = 'o', long = "output-dir", global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Per-log UpSet chart of protected outliers per algorithm.
    Overlap(LogArgs),
    /// Grouped bar chart of protected-outlier percentages across logs.
    Compare(LogArgs),
    /// Both charts.
    Run(LogArgs),
}

#[derive(clap::Args, Debug)]
struct LogArgs {
    /// Event logs: files, directories or glob patterns. Overrides the config.
    logs: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config is read before logging is initialised because it may set the
    // level. Warnings are replayed once the subscriber exists.
    let paths = PlatformPaths::resolve();
    let (mut cfg, warnings) = match config::resolve_config(cli.config.as_deref(), &paths) {
        Ok(loaded) => loaded,
        Err(e) => {
            util::logging::init(cli.debug, None);
            tracing::error!(error = %e, "Configuration unusable");
            eprintln!("Error: {e}");
            return exit_code(&e);
        }
    };

    util::logging::init(cli.debug, cfg.log_level.as_deref());
    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        "FairMine starting"
    );
    for warning in &warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    if let Some(dir) = cli.output_dir {
        cfg.output_dir = dir;
    }
    let (mode, args) = match cli.command {
        Command::Overlap(args) => (Mode::Overlap, args),
        Command::Compare(args) => (Mode::Compare, args),
        Command::Run(args) => (Mode::Run, args),
    };

    match experiment::run(&cfg, &args.logs, mode, None) {
        Ok(outcome) => {
            for path in &outcome.artifacts {
                println!("{}", path.display());
            }
            for failure in &outcome.summary.failures {
                eprintln!("Skipped {}: {}", failure.log_path.display(), failure.error);
            }
            if outcome.summary.has_failures() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Experiment failed");
            eprintln!("Error: {e}");
            exit_code(&e)
        }
    }
}

/// 2 when the experiment could not start, 1 for anything that failed later.
fn exit_code(error: &FairMineError) -> ExitCode {
    match error {
        FairMineError::Locate(_) | FairMineError::Config(_) => ExitCode::from(2),
        _ => ExitCode::from(1),
    }
}
