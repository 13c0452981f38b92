use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

mod builder;
mod discovery;
mod sources;
mod validation;

pub use builder::ConfigBuilder;

/// Phases used when neither the config file nor the CLI names any.
pub const DEFAULT_PHASES: [&str; 5] = ["Strategy", "Data", "Technology", "People", "Governance"];

/// Hard cap on recorded answers per session.
pub const DEFAULT_MAX_QUESTIONS: usize = 20;

/// Absolute step cap for the auto-complete loop, independent of `max_questions`.
pub const DEFAULT_MAX_AUTO_STEPS: u32 = 30;

/// Industry used for reports when none is given.
pub const DEFAULT_INDUSTRY: &str = "general";

pub const DEFAULT_QUESTION_URL: &str = "http://127.0.0.1:3000/api/assessment/next-question";
pub const DEFAULT_REPORT_URL: &str = "http://127.0.0.1:3000/api/assessment/report";
pub const DEFAULT_SERVICE_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_PRIMARY_PROVIDER: &str = "anthropic";
pub const DEFAULT_FALLBACK_PROVIDER: &str = "openai-compatible";
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 45;

/// Provider names accepted in `[simulator.*] provider`.
pub const SUPPORTED_PROVIDERS: &[&str] = &["anthropic", "openai-compatible"];

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    ConfigFile(PathBuf),
    Programmatic,
    Defaults,
}

/// Configuration for assessor operations.
///
/// Use [`Config::discover()`] for CLI-like behavior, or [`Config::builder()`]
/// for deterministic programmatic construction.
///
/// # Configuration File Format
///
/// ```toml
/// [assessment]
/// phases = ["Strategy", "Data", "Technology", "People", "Governance"]
/// max_questions = 20
/// max_auto_steps = 30
/// industry = "retail"
///
/// [services]
/// question_url = "https://assess.example.com/api/next-question"
/// report_url = "https://assess.example.com/api/report"
/// timeout_secs = 60
///
/// [simulator.primary]
/// provider = "anthropic"
/// model = "claude-3-5-haiku-latest"
///
/// [simulator.fallback]
/// provider = "openai-compatible"
/// base_url = "https://openrouter.ai/api/v1/chat/completions"
/// model = "openai/gpt-4o-mini"
/// api_key_env = "OPENROUTER_API_KEY"
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Phase list and caps. Read-only once a session has been created.
    pub assessment: AssessmentConfig,
    /// Question and Report service endpoints.
    pub services: ServicesConfig,
    /// Primary and fallback answer-simulator providers.
    pub simulator: SimulatorConfig,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Source attribution for each setting (for `assessor config`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentConfig {
    pub phases: Vec<String>,
    pub max_questions: usize,
    pub max_auto_steps: u32,
    pub industry: String,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            phases: DEFAULT_PHASES.iter().map(|p| (*p).to_string()).collect(),
            max_questions: DEFAULT_MAX_QUESTIONS,
            max_auto_steps: DEFAULT_MAX_AUTO_STEPS,
            industry: DEFAULT_INDUSTRY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicesConfig {
    pub question_url: String,
    pub report_url: String,
    pub timeout_secs: u64,
}

impl ServicesConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            question_url: DEFAULT_QUESTION_URL.to_string(),
            report_url: DEFAULT_REPORT_URL.to_string(),
            timeout_secs: DEFAULT_SERVICE_TIMEOUT_SECS,
        }
    }
}

/// Settings for one text-generation provider.
///
/// Unset values fall back to provider-specific defaults inside the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    #[must_use]
    pub fn named(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            base_url: None,
            model: None,
            api_key_env: None,
            max_tokens: None,
            temperature: None,
            timeout_secs: None,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub primary: ProviderConfig,
    pub fallback: ProviderConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            primary: ProviderConfig::named(DEFAULT_PRIMARY_PROVIDER),
            fallback: ProviderConfig::named(DEFAULT_FALLBACK_PROVIDER),
        }
    }
}

/// CLI arguments that participate in configuration precedence.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub industry: Option<String>,
    pub max_questions: Option<usize>,
    pub max_auto_steps: Option<u32>,
    pub phases: Option<Vec<String>>,
    pub question_url: Option<String>,
    pub report_url: Option<String>,
    pub service_timeout: Option<u64>,
    pub primary_provider: Option<String>,
    pub fallback_provider: Option<String>,
    pub verbose: Option<bool>,
}

impl Config {
    /// Built-in defaults with no discovery and no validation side effects.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            assessment: AssessmentConfig::default(),
            services: ServicesConfig::default(),
            simulator: SimulatorConfig::default(),
            verbose: false,
            source_attribution: HashMap::new(),
        }
    }

    /// Small, fast configuration for unit and integration tests.
    #[must_use]
    pub fn minimal_for_testing() -> Self {
        let mut config = Self::defaults();
        config.services.timeout_secs = 5;
        config
    }
}
