use std::collections::BTreeMap;

use super::{Config, ConfigSource};

fn source_label(source: Option<&ConfigSource>) -> String {
    match source {
        Some(ConfigSource::Cli) => "cli".to_string(),
        Some(ConfigSource::ConfigFile(path)) => format!("config ({})", path.display()),
        Some(ConfigSource::Programmatic) => "programmatic".to_string(),
        Some(ConfigSource::Defaults) | None => "default".to_string(),
    }
}

impl Config {
    /// Get effective configuration as key-value pairs with source attribution
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key));
            config.insert(key.to_string(), (value, source));
        };

        add("phases", self.assessment.phases.join(", "));
        add("max_questions", self.assessment.max_questions.to_string());
        add("max_auto_steps", self.assessment.max_auto_steps.to_string());
        add("industry", self.assessment.industry.clone());
        add("question_url", self.services.question_url.clone());
        add("report_url", self.services.report_url.clone());
        add("service_timeout", self.services.timeout_secs.to_string());

        for (prefix, provider) in [
            ("primary", &self.simulator.primary),
            ("fallback", &self.simulator.fallback),
        ] {
            add(&format!("{prefix}.provider"), provider.provider.clone());
            if let Some(model) = &provider.model {
                add(&format!("{prefix}.model"), model.clone());
            }
            if let Some(base_url) = &provider.base_url {
                add(&format!("{prefix}.base_url"), base_url.clone());
            }
            if let Some(env) = &provider.api_key_env {
                add(&format!("{prefix}.api_key_env"), env.clone());
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_config_labels_sources() {
        let mut config = Config::defaults();
        config
            .source_attribution
            .insert("industry".to_string(), ConfigSource::Cli);

        let effective = config.effective_config();

        assert_eq!(
            effective.get("industry"),
            Some(&("general".to_string(), "cli".to_string()))
        );
        assert_eq!(
            effective.get("max_questions").map(|(_, src)| src.as_str()),
            Some("default")
        );
        assert!(effective.contains_key("fallback.provider"));
    }
}
