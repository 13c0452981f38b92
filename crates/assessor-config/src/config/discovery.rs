use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{CliArgs, Config, ConfigSource, ProviderConfig};

/// Environment variable pointing at a directory holding `config.toml`.
pub const ASSESSOR_HOME_ENV: &str = "ASSESSOR_HOME";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    assessment: Option<AssessmentFile>,
    services: Option<ServicesFile>,
    simulator: Option<SimulatorFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AssessmentFile {
    phases: Option<Vec<String>>,
    max_questions: Option<usize>,
    max_auto_steps: Option<u32>,
    industry: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServicesFile {
    question_url: Option<String>,
    report_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SimulatorFile {
    primary: Option<ProviderFile>,
    fallback: Option<ProviderFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderFile {
    provider: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    api_key_env: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

impl ProviderFile {
    /// Overlay file values on top of `target`, recording what changed.
    fn apply(
        self,
        target: &mut ProviderConfig,
        prefix: &str,
        source: &ConfigSource,
        attribution: &mut HashMap<String, ConfigSource>,
    ) {
        let mut mark = |key: &str| {
            attribution.insert(format!("{prefix}.{key}"), source.clone());
        };
        if let Some(provider) = self.provider {
            target.provider = provider;
            mark("provider");
        }
        if self.base_url.is_some() {
            target.base_url = self.base_url;
            mark("base_url");
        }
        if self.model.is_some() {
            target.model = self.model;
            mark("model");
        }
        if self.api_key_env.is_some() {
            target.api_key_env = self.api_key_env;
            mark("api_key_env");
        }
        if self.max_tokens.is_some() {
            target.max_tokens = self.max_tokens;
            mark("max_tokens");
        }
        if self.temperature.is_some() {
            target.temperature = self.temperature;
            mark("temperature");
        }
        if self.timeout_secs.is_some() {
            target.timeout_secs = self.timeout_secs;
            mark("timeout_secs");
        }
    }
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut config = Self::defaults();
        let attribution = &mut config.source_attribution;

        for key in [
            "phases",
            "max_questions",
            "max_auto_steps",
            "industry",
            "question_url",
            "report_url",
            "service_timeout",
            "primary.provider",
            "fallback.provider",
        ] {
            attribution.insert(key.to_string(), ConfigSource::Defaults);
        }

        let config_path = if let Some(explicit_path) = &cli_args.config_path {
            Some(explicit_path.clone())
        } else {
            Self::discover_config_file_from(start_dir)?
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            let source = ConfigSource::ConfigFile(path.clone());

            if let Some(file_assessment) = file_config.assessment {
                if let Some(phases) = file_assessment.phases {
                    config.assessment.phases = phases;
                    attribution.insert("phases".to_string(), source.clone());
                }
                if let Some(max_questions) = file_assessment.max_questions {
                    config.assessment.max_questions = max_questions;
                    attribution.insert("max_questions".to_string(), source.clone());
                }
                if let Some(max_auto_steps) = file_assessment.max_auto_steps {
                    config.assessment.max_auto_steps = max_auto_steps;
                    attribution.insert("max_auto_steps".to_string(), source.clone());
                }
                if let Some(industry) = file_assessment.industry {
                    config.assessment.industry = industry;
                    attribution.insert("industry".to_string(), source.clone());
                }
            }

            if let Some(file_services) = file_config.services {
                if let Some(url) = file_services.question_url {
                    config.services.question_url = url;
                    attribution.insert("question_url".to_string(), source.clone());
                }
                if let Some(url) = file_services.report_url {
                    config.services.report_url = url;
                    attribution.insert("report_url".to_string(), source.clone());
                }
                if let Some(timeout) = file_services.timeout_secs {
                    config.services.timeout_secs = timeout;
                    attribution.insert("service_timeout".to_string(), source.clone());
                }
            }

            if let Some(file_simulator) = file_config.simulator {
                if let Some(primary) = file_simulator.primary {
                    primary.apply(&mut config.simulator.primary, "primary", &source, attribution);
                }
                if let Some(fallback) = file_simulator.fallback {
                    fallback.apply(
                        &mut config.simulator.fallback,
                        "fallback",
                        &source,
                        attribution,
                    );
                }
            }
        }

        // Apply CLI overrides (highest priority)
        if let Some(phases) = &cli_args.phases {
            config.assessment.phases = phases.clone();
            attribution.insert("phases".to_string(), ConfigSource::Cli);
        }
        if let Some(max_questions) = cli_args.max_questions {
            config.assessment.max_questions = max_questions;
            attribution.insert("max_questions".to_string(), ConfigSource::Cli);
        }
        if let Some(max_auto_steps) = cli_args.max_auto_steps {
            config.assessment.max_auto_steps = max_auto_steps;
            attribution.insert("max_auto_steps".to_string(), ConfigSource::Cli);
        }
        if let Some(industry) = &cli_args.industry {
            config.assessment.industry = industry.clone();
            attribution.insert("industry".to_string(), ConfigSource::Cli);
        }
        if let Some(url) = &cli_args.question_url {
            config.services.question_url = url.clone();
            attribution.insert("question_url".to_string(), ConfigSource::Cli);
        }
        if let Some(url) = &cli_args.report_url {
            config.services.report_url = url.clone();
            attribution.insert("report_url".to_string(), ConfigSource::Cli);
        }
        if let Some(timeout) = cli_args.service_timeout {
            config.services.timeout_secs = timeout;
            attribution.insert("service_timeout".to_string(), ConfigSource::Cli);
        }
        if let Some(provider) = &cli_args.primary_provider {
            config.simulator.primary.provider = provider.clone();
            attribution.insert("primary.provider".to_string(), ConfigSource::Cli);
        }
        if let Some(provider) = &cli_args.fallback_provider {
            config.simulator.fallback.provider = provider.clone();
            attribution.insert("fallback.provider".to_string(), ConfigSource::Cli);
        }
        if let Some(verbose) = cli_args.verbose {
            config.verbose = verbose;
            attribution.insert("verbose".to_string(), ConfigSource::Cli);
        }

        config.validate()?;

        tracing::debug!(
            config_file = ?config_path,
            phases = config.assessment.phases.len(),
            max_questions = config.assessment.max_questions,
            "Configuration resolved"
        );

        Ok(config)
    }

    /// Locate a config file: `ASSESSOR_HOME/config.toml` first, then an upward
    /// search for `.assessor/config.toml`.
    fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        if let Some(home) = std::env::var_os(ASSESSOR_HOME_ENV) {
            let candidate = PathBuf::from(home).join("config.toml");
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }

        for dir in start_dir.ancestors() {
            let candidate = dir.join(".assessor").join("config.toml");
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
            // Stop at repository roots so configs from unrelated parents never leak in.
            if dir.join(".git").exists() {
                break;
            }
        }

        Ok(None)
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let parsed: TomlConfig =
            toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))?;
        Ok(parsed)
    }
}
