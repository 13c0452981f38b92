//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Builds CliArgs and discovers Config
//! - Creates the tokio runtime
//! - Dispatches to command handlers
//! - Handles all error output

use clap::Parser;
use tracing::debug;

use assessor_config::Config;
use assessor_utils::error::{AssessError, ConfigError};
use assessor_utils::exit_codes::ExitCode;
use assessor_utils::logging::init_tracing;
use assessor_utils::redaction::redact_error_message;

use super::args::{Cli, Commands};
use super::commands;

/// Main CLI execution function.
///
/// Prints all output, including errors, and returns the exit code to use on
/// failure. `main` only calls `std::process::exit`.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let config = match Config::discover(&cli.to_cli_args()) {
        Ok(config) => config,
        Err(err) => {
            let config_err = err
                .downcast_ref::<ConfigError>()
                .cloned()
                .unwrap_or_else(|| ConfigError::InvalidFile(format!("{err:#}")));
            let err = AssessError::Config(config_err);
            eprintln!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    if let Err(e) = init_tracing(config.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let operation = match &cli.command {
        Commands::Config { .. } => "config",
        Commands::Personas => "personas",
        Commands::Run { .. } => "run",
        Commands::Auto { .. } => "auto",
    };
    debug!(operation, config_sources = config.source_attribution.len(), "Dispatching command");

    let result = match cli.command {
        Commands::Config { json } => commands::show_config(&config, json),
        Commands::Personas => commands::list_personas(),
        Commands::Run { out, history_json } => {
            with_runtime(commands::run_interactive(config, out, history_json))
        }
        Commands::Auto {
            persona,
            out,
            history_json,
        } => with_runtime(commands::run_auto(config, persona, out, history_json)),
    };

    match result {
        Ok(code) if code.is_success() => Ok(()),
        Ok(code) => Err(code),
        Err(err) => Err(report_failure(&err)),
    }
}

fn with_runtime<F>(future: F) -> anyhow::Result<ExitCode>
where
    F: std::future::Future<Output = anyhow::Result<ExitCode>>,
{
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| anyhow::anyhow!("Failed to create async runtime: {e}"))?;
    rt.block_on(future)
}

/// Print a failure and pick its exit code.
fn report_failure(err: &anyhow::Error) -> ExitCode {
    if let Some(assess) = err.downcast_ref::<AssessError>() {
        eprintln!("{}", assess.display_for_user());
        return assess.to_exit_code();
    }
    eprintln!("✗ {}", redact_error_message(&format!("{err:#}")));
    ExitCode::INTERNAL
}
