//! Plumbing shared by the HTTP providers
//!
//! Each backend owns one [`ProviderClient`] and one [`ProviderDefaults`].
//! A call is a single POST: there is no retry at this layer, since the
//! simulator recovers by switching from the primary to the fallback provider.

use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::debug;

use assessor_config::ProviderConfig;
use assessor_utils::redaction::redact_error_message;

use crate::LlmError;
use crate::envelope::NormalizedContent;
use crate::types::{LlmInvocation, LlmResult, TokenUsage};

/// Hard ceiling on any provider call, whatever the configuration says.
const CALL_CEILING: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const FALLBACK_MAX_TOKENS: u32 = 512;
const FALLBACK_TEMPERATURE: f32 = 0.7;

#[derive(Clone)]
pub(crate) struct ProviderClient {
    inner: Client,
    provider: &'static str,
}

impl ProviderClient {
    pub(crate) fn new(provider: &'static str) -> Result<Self, LlmError> {
        let inner = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                LlmError::Misconfiguration(format!("{provider}: cannot build HTTP client: {e}"))
            })?;
        Ok(Self { inner, provider })
    }

    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.inner.post(url)
    }

    /// Send `request` and return the body of a 2xx response.
    ///
    /// Status classes map onto `LlmError`: 401/403 to `ProviderAuth`, 429 to
    /// `ProviderQuota`, 5xx to `ProviderOutage`, anything else to `Transport`.
    pub(crate) async fn send(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        let timeout = timeout.min(CALL_CEILING);
        debug!(
            provider = self.provider,
            timeout_ms = timeout.as_millis() as u64,
            "Sending provider request"
        );

        let response = request.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout { duration: timeout }
            } else {
                LlmError::Transport(format!(
                    "{}: request failed: {}",
                    self.provider,
                    redact_error_message(&e.to_string())
                ))
            }
        })?;

        if let Some(err) = status_error(response.status(), self.provider) {
            return Err(err);
        }

        response.text().await.map_err(|e| {
            LlmError::Transport(format!(
                "{}: unreadable response body: {}",
                self.provider,
                redact_error_message(&e.to_string())
            ))
        })
    }
}

/// `None` for success statuses.
pub(crate) fn status_error(status: StatusCode, provider: &str) -> Option<LlmError> {
    if status.is_success() {
        return None;
    }
    let detail = format!("{provider} answered {status}");
    Some(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::ProviderAuth(detail),
        StatusCode::TOO_MANY_REQUESTS => LlmError::ProviderQuota(detail),
        s if s.is_server_error() => LlmError::ProviderOutage(detail),
        _ => LlmError::Transport(detail),
    })
}

/// Values a backend applies when the invocation does not say otherwise.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProviderDefaults {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ProviderDefaults {
    pub(crate) fn from_config(config: &ProviderConfig, builtin_model: &str) -> Self {
        Self {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| builtin_model.to_string()),
            max_tokens: config.max_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
            temperature: config.temperature.unwrap_or(FALLBACK_TEMPERATURE),
            timeout: config.timeout(),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            max_tokens: FALLBACK_MAX_TOKENS,
            temperature: FALLBACK_TEMPERATURE,
            timeout: Duration::from_secs(assessor_config::DEFAULT_PROVIDER_TIMEOUT_SECS),
        }
    }

    /// Settings for one call. A non-empty invocation model wins, and the
    /// tighter of the two timeouts applies.
    pub(crate) fn settle(&self, inv: &LlmInvocation) -> CallSettings {
        CallSettings {
            model: if inv.model.is_empty() {
                self.model.clone()
            } else {
                inv.model.clone()
            },
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: inv.timeout.min(self.timeout),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CallSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl CallSettings {
    /// Turn a normalized body into the caller-facing result.
    pub(crate) fn into_result(self, provider: &str, body: NormalizedContent) -> LlmResult {
        let usage = body
            .tokens
            .map(|(input, output)| TokenUsage { input, output });
        LlmResult::new(body.content, provider, body.model.unwrap_or(self.model)).with_usage(usage)
    }
}

/// Read the key from `api_key_env`, or from `builtin_env` when unset.
pub(crate) fn api_key(config: &ProviderConfig, builtin_env: &str) -> Result<String, LlmError> {
    let var = config.api_key_env.as_deref().unwrap_or(builtin_env);
    std::env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            LlmError::Misconfiguration(format!(
                "no API key for {} (environment variable '{var}' is empty or unset)",
                config.provider
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert!(status_error(StatusCode::OK, "p").is_none());
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "p"),
            Some(LlmError::ProviderAuth(_))
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "p"),
            Some(LlmError::ProviderQuota(_))
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "p"),
            Some(LlmError::ProviderOutage(_))
        ));
        match status_error(StatusCode::BAD_REQUEST, "anthropic") {
            Some(LlmError::Transport(msg)) => assert!(msg.contains("400")),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_from_config() {
        let mut config = ProviderConfig::named("anthropic");
        config.max_tokens = Some(300);
        config.timeout_secs = Some(9);

        let defaults = ProviderDefaults::from_config(&config, "builtin");

        assert_eq!(defaults.model, "builtin");
        assert_eq!(defaults.max_tokens, 300);
        assert_eq!(defaults.temperature, FALLBACK_TEMPERATURE);
        assert_eq!(defaults.timeout, Duration::from_secs(9));
    }

    #[test]
    fn test_settle_prefers_invocation_model_and_tighter_timeout() {
        let defaults = ProviderDefaults::for_model("configured");

        let plain = LlmInvocation::new("s", "", Duration::from_secs(600), vec![]);
        let settings = defaults.settle(&plain);
        assert_eq!(settings.model, "configured");
        assert_eq!(settings.timeout, defaults.timeout);

        let custom = LlmInvocation::new("s", "custom", Duration::from_secs(3), vec![]);
        let settings = defaults.settle(&custom);
        assert_eq!(settings.model, "custom");
        assert_eq!(settings.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_into_result_falls_back_to_requested_model() {
        let settings = ProviderDefaults::for_model("m-1")
            .settle(&LlmInvocation::new("s", "", Duration::from_secs(1), vec![]));
        let result = settings.into_result(
            "anthropic",
            NormalizedContent {
                content: "hi".to_string(),
                model: None,
                tokens: Some((4, 1)),
            },
        );

        assert_eq!(result.model_used, "m-1");
        assert_eq!(result.usage, Some(TokenUsage { input: 4, output: 1 }));
    }

    #[test]
    fn test_missing_key_names_the_variable() {
        let mut config = ProviderConfig::named("anthropic");
        config.api_key_env = Some("ASSESSOR_TEST_KEY_NEVER_SET".to_string());

        match api_key(&config, "UNUSED") {
            Err(LlmError::Misconfiguration(msg)) => {
                assert!(msg.contains("ASSESSOR_TEST_KEY_NEVER_SET"));
            }
            other => panic!("expected misconfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_client_builds() {
        assert!(ProviderClient::new("anthropic").is_ok());
    }
}
