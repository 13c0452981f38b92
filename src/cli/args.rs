//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and the subcommand enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use assessor_config::CliArgs;
use assessor_engine::Persona;

/// assessor - guided AI assessment orchestrator
#[derive(Parser)]
#[command(name = "assessor")]
#[command(about = "Run AI-guided maturity assessments phase by phase and hand the transcript to a report service")]
#[command(long_about = r#"
assessor walks a respondent through AI-generated questions grouped into ordered
phases, records every answer, and requests a markdown report once the
assessment completes. Answers can be typed or simulated by a persona.

EXAMPLES:
  # Answer questions interactively on stdin
  assessor run --industry retail

  # Let the Enabler persona answer everything and save the report
  assessor auto --persona enabler --out report.md

  # Keep the full transcript as JSON
  assessor auto --persona leader --history-json history.json

  # Show the effective configuration and where each value came from
  assessor config

  # List the persona tiers
  assessor personas

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is $ASSESSOR_HOME/config.toml, or the nearest .assessor/config.toml
  found searching upward from CWD
  Use --config to specify an explicit config file path

PHASES:
  Strategy → Data → Technology → People → Governance (default)
  The assessment ends when the service says so, the question cap is hit,
  or the last phase is complete
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Industry context passed to the report service and the simulator
    #[arg(long, global = true)]
    pub industry: Option<String>,

    /// Maximum number of answered questions before the assessment completes
    #[arg(long, global = true)]
    pub max_questions: Option<usize>,

    /// Absolute cap on auto-complete steps per run
    #[arg(long, global = true)]
    pub max_auto_steps: Option<u32>,

    /// Comma-separated ordered phase list
    #[arg(long, global = true, value_delimiter = ',')]
    pub phases: Option<Vec<String>>,

    /// Question service endpoint
    #[arg(long, global = true)]
    pub question_url: Option<String>,

    /// Report service endpoint
    #[arg(long, global = true)]
    pub report_url: Option<String>,

    /// Timeout in seconds for question and report service calls
    #[arg(long, global = true)]
    pub service_timeout: Option<u64>,

    /// Primary answer-simulator provider (anthropic, openai-compatible)
    #[arg(long, global = true)]
    pub primary_provider: Option<String>,

    /// Fallback answer-simulator provider (anthropic, openai-compatible)
    #[arg(long, global = true)]
    pub fallback_provider: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Overrides for configuration discovery.
    #[must_use]
    pub fn to_cli_args(&self) -> CliArgs {
        CliArgs {
            config_path: self.config.clone(),
            industry: self.industry.clone(),
            max_questions: self.max_questions,
            max_auto_steps: self.max_auto_steps,
            phases: self.phases.clone(),
            question_url: self.question_url.clone(),
            report_url: self.report_url.clone(),
            service_timeout: self.service_timeout,
            primary_provider: self.primary_provider.clone(),
            fallback_provider: self.fallback_provider.clone(),
            verbose: self.verbose.then_some(true),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer the assessment interactively on stdin
    ///
    /// Each question is printed with its options. Type the answer and press
    /// Enter; for multiple choice separate selections with commas. When a
    /// question cannot be loaded you are offered a retry.
    ///
    /// EXAMPLES:
    ///   assessor run
    ///   assessor run --industry healthcare --out report.md
    Run {
        /// Write the report markdown to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write the answered transcript as JSON to this file
        #[arg(long)]
        history_json: Option<PathBuf>,
    },

    /// Let a persona answer every question automatically
    ///
    /// Press Ctrl-C to stop after the current step; answers already given
    /// are kept.
    ///
    /// EXAMPLES:
    ///   assessor auto --persona explorer
    ///   assessor auto --persona leader --out report.md --history-json run.json
    Auto {
        /// Persona tier: explorer, enabler or leader
        #[arg(long, value_parser = parse_persona)]
        persona: Persona,

        /// Write the report markdown to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write the answered transcript as JSON to this file
        #[arg(long)]
        history_json: Option<PathBuf>,
    },

    /// Show the effective configuration with source attribution
    Config {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List persona tiers and their answering ranges
    Personas,
}

fn parse_persona(value: &str) -> Result<Persona, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_map_to_cli_args() {
        let cli = Cli::try_parse_from([
            "assessor",
            "--industry",
            "retail",
            "--phases",
            "Strategy,Data",
            "--max-questions",
            "5",
            "auto",
            "--persona",
            "leader",
        ])
        .unwrap();

        let args = cli.to_cli_args();
        assert_eq!(args.industry.as_deref(), Some("retail"));
        assert_eq!(
            args.phases,
            Some(vec!["Strategy".to_string(), "Data".to_string()])
        );
        assert_eq!(args.max_questions, Some(5));
        assert_eq!(args.verbose, None);
        assert!(matches!(
            cli.command,
            Commands::Auto {
                persona: Persona::Leader,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_persona_is_rejected() {
        let result = Cli::try_parse_from(["assessor", "auto", "--persona", "wizard"]);
        assert!(result.is_err());
    }
}
