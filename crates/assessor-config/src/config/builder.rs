use assessor_utils::error::ConfigError;

use super::{Config, ConfigSource, ProviderConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use assessor_config::Config;
    ///
    /// let config = Config::builder()
    ///     .phases(["Strategy", "Data"])
    ///     .max_questions(6)
    ///     .industry("logistics")
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.assessment.max_questions, 6);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration.
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    phases: Option<Vec<String>>,
    max_questions: Option<usize>,
    max_auto_steps: Option<u32>,
    industry: Option<String>,
    question_url: Option<String>,
    report_url: Option<String>,
    service_timeout_secs: Option<u64>,
    primary: Option<ProviderConfig>,
    fallback: Option<ProviderConfig>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phases<I, S>(mut self, phases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phases = Some(phases.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn max_questions(mut self, max: usize) -> Self {
        self.max_questions = Some(max);
        self
    }

    #[must_use]
    pub fn max_auto_steps(mut self, max: u32) -> Self {
        self.max_auto_steps = Some(max);
        self
    }

    #[must_use]
    pub fn industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    #[must_use]
    pub fn question_url(mut self, url: impl Into<String>) -> Self {
        self.question_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn report_url(mut self, url: impl Into<String>) -> Self {
        self.report_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn service_timeout_secs(mut self, secs: u64) -> Self {
        self.service_timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn primary_provider(mut self, provider: ProviderConfig) -> Self {
        self.primary = Some(provider);
        self
    }

    #[must_use]
    pub fn fallback_provider(mut self, provider: ProviderConfig) -> Self {
        self.fallback = Some(provider);
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any value fails validation.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = Config::defaults();
        let attribution = &mut config.source_attribution;
        let mut mark = |key: &str| {
            attribution.insert(key.to_string(), ConfigSource::Programmatic);
        };

        if let Some(phases) = self.phases {
            config.assessment.phases = phases;
            mark("phases");
        }
        if let Some(max) = self.max_questions {
            config.assessment.max_questions = max;
            mark("max_questions");
        }
        if let Some(max) = self.max_auto_steps {
            config.assessment.max_auto_steps = max;
            mark("max_auto_steps");
        }
        if let Some(industry) = self.industry {
            config.assessment.industry = industry;
            mark("industry");
        }
        if let Some(url) = self.question_url {
            config.services.question_url = url;
            mark("question_url");
        }
        if let Some(url) = self.report_url {
            config.services.report_url = url;
            mark("report_url");
        }
        if let Some(secs) = self.service_timeout_secs {
            config.services.timeout_secs = secs;
            mark("service_timeout");
        }
        if let Some(primary) = self.primary {
            config.simulator.primary = primary;
            mark("primary.provider");
        }
        if let Some(fallback) = self.fallback {
            config.simulator.fallback = fallback;
            mark("fallback.provider");
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
            mark("verbose");
        }

        config.validate()?;
        Ok(config)
    }
}
