//! Headless harvester sandbox.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in demo scenario
//! cargo run -p harvest_headless -- demo
//!
//! # Run a scenario file for at most 600 ticks, JSON on stdout
//! cargo run -p harvest_headless -- run --scenario outpost.ron --ticks 600 --json
//! ```
//!
//! Summaries go to stdout, logs to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use harvest_headless::{HeadlessRunner, RunSummary, Scenario, ScenarioError};

#[derive(Parser)]
#[command(name = "harvest_headless")]
#[command(about = "Headless harvester sandbox")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Tick limit (defaults to the scenario's)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the built-in demo scenario
    Demo {
        /// Tick limit (defaults to the scenario's)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            scenario,
            ticks,
            json,
        }) => cmd_run(&scenario, ticks, json),
        Some(Commands::Demo { ticks, json }) => run_scenario(&Scenario::demo(), ticks, json),
        None => run_scenario(&Scenario::demo(), None, false),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Run a scenario file
fn cmd_run(path: &Path, ticks: Option<u64>, json: bool) -> Result<(), ScenarioError> {
    tracing::info!(path = %path.display(), "Loading scenario");
    let scenario = Scenario::load(path)?;
    run_scenario(&scenario, ticks, json)
}

fn run_scenario(scenario: &Scenario, ticks: Option<u64>, json: bool) -> Result<(), ScenarioError> {
    let mut runner = HeadlessRunner::from_scenario(scenario)?;
    let summary = runner.run(ticks);
    print_summary(&summary, json)
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<(), ScenarioError> {
    if json {
        let text = summary.to_json().map_err(std::io::Error::other)?;
        println!("{text}");
    } else {
        print!("{summary}");
    }
    Ok(())
}
