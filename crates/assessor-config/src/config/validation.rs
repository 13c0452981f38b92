use std::collections::HashSet;

use assessor_utils::error::ConfigError;

use super::{Config, ProviderConfig, SUPPORTED_PROVIDERS};

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let assessment = &self.assessment;

        if assessment.phases.is_empty() {
            return Err(ConfigError::MissingRequired(
                "assessment.phases must name at least one phase".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for phase in &assessment.phases {
            if phase.trim().is_empty() {
                return Err(invalid("phases", "phase names must not be blank"));
            }
            if !seen.insert(phase.as_str()) {
                return Err(invalid("phases", format!("duplicate phase '{phase}'")));
            }
        }

        if assessment.max_questions == 0 {
            return Err(invalid("max_questions", "must be greater than 0"));
        }
        if assessment.max_auto_steps == 0 {
            return Err(invalid("max_auto_steps", "must be greater than 0"));
        }
        if assessment.industry.trim().is_empty() {
            return Err(invalid("industry", "must not be blank"));
        }

        if self.services.timeout_secs == 0 {
            return Err(invalid("service_timeout", "must be at least 1 second"));
        }
        for (key, url) in [
            ("question_url", &self.services.question_url),
            ("report_url", &self.services.report_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(key, format!("'{url}' is not an http(s) URL")));
            }
        }

        validate_provider("primary", &self.simulator.primary)?;
        validate_provider("fallback", &self.simulator.fallback)?;

        Ok(())
    }
}

fn validate_provider(prefix: &str, provider: &ProviderConfig) -> Result<(), ConfigError> {
    if !SUPPORTED_PROVIDERS.contains(&provider.provider.as_str()) {
        return Err(invalid(
            &format!("{prefix}.provider"),
            format!(
                "unknown provider '{}'; supported providers: {}",
                provider.provider,
                SUPPORTED_PROVIDERS.join(", ")
            ),
        ));
    }
    if provider.timeout_secs == Some(0) {
        return Err(invalid(
            &format!("{prefix}.timeout_secs"),
            "must be at least 1 second",
        ));
    }
    if let Some(temperature) = provider.temperature
        && !(0.0..=2.0).contains(&temperature)
    {
        return Err(invalid(
            &format!("{prefix}.temperature"),
            "must be between 0.0 and 2.0",
        ));
    }
    if provider.max_tokens == Some(0) {
        return Err(invalid(
            &format!("{prefix}.max_tokens"),
            "must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::defaults().validate().is_ok());
    }

    #[test]
    fn test_empty_phase_list_rejected() {
        let mut config = Config::defaults();
        config.assessment.phases.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_duplicate_phase_rejected() {
        let mut config = Config::defaults();
        config.assessment.phases = vec!["Data".to_string(), "Data".to_string()];
        match config.validate() {
            Err(ConfigError::InvalidValue { key, value }) => {
                assert_eq!(key, "phases");
                assert!(value.contains("duplicate"));
            }
            other => panic!("expected duplicate phase error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = Config::defaults();
        config.simulator.fallback.provider = "carrier-pigeon".to_string();
        match config.validate() {
            Err(ConfigError::InvalidValue { key, value }) => {
                assert_eq!(key, "fallback.provider");
                assert!(value.contains("carrier-pigeon"));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn test_temperature_range_enforced() {
        let mut config = Config::defaults();
        config.simulator.primary.temperature = Some(3.5);
        assert!(config.validate().is_err());

        config.simulator.primary.temperature = Some(0.7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_http_service_url_rejected() {
        let mut config = Config::defaults();
        config.services.report_url = "ftp://example.com/report".to_string();
        assert!(config.validate().is_err());
    }
}
