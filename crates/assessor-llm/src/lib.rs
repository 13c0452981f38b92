//! Text-generation backends for the persona answer simulator
//!
//! All providers implement [`LlmBackend`], so the simulator can run a
//! primary → fallback chain without knowing how either provider is reached.

mod anthropic_backend;
mod envelope;
mod provider_http;
mod openai_backend;
mod types;

pub use envelope::{NormalizedContent, ProviderEnvelope};
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role, TokenUsage};
pub use assessor_utils::error::LlmError;

pub(crate) use anthropic_backend::AnthropicBackend;
pub(crate) use openai_backend::OpenAiCompatibleBackend;

use assessor_config::ProviderConfig;
use async_trait::async_trait;
use tracing::warn;

/// Construct a backend for one `[simulator.*]` provider entry.
///
/// # Errors
///
/// Returns `LlmError::Unsupported` if the provider is unknown.
/// Returns `LlmError::Misconfiguration` if provider-specific configuration is invalid.
pub fn backend_for(config: &ProviderConfig) -> Result<Box<dyn LlmBackend>, LlmError> {
    match config.provider.as_str() {
        anthropic_backend::PROVIDER_NAME => {
            Ok(Box::new(AnthropicBackend::new_from_config(config)?))
        }
        openai_backend::PROVIDER_NAME => {
            Ok(Box::new(OpenAiCompatibleBackend::new_from_config(config)?))
        }
        other => Err(LlmError::Unsupported(format!(
            "Unknown provider '{}'. Supported providers: {}",
            other,
            assessor_config::SUPPORTED_PROVIDERS.join(", ")
        ))),
    }
}

/// Like [`backend_for`], but a construction failure becomes a backend that
/// fails every call with the same error.
///
/// The answer simulator needs both chain positions filled even when one
/// provider is misconfigured: a missing key on the primary must still lead to
/// the fallback being tried.
#[must_use]
pub fn backend_or_unavailable(config: &ProviderConfig) -> Box<dyn LlmBackend> {
    match backend_for(config) {
        Ok(backend) => backend,
        Err(err) => {
            warn!(
                provider = %config.provider,
                error = %assessor_utils::redaction::redact_error_message(&err.to_string()),
                "Provider unavailable; calls to it will fail"
            );
            Box::new(UnavailableBackend::new(config.provider.clone(), err))
        }
    }
}

/// A backend that could not be constructed.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    name: String,
    error: LlmError,
}

impl UnavailableBackend {
    #[must_use]
    pub fn new(name: impl Into<String>, error: LlmError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

#[async_trait]
impl LlmBackend for UnavailableBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, _inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        Err(self.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unknown_provider_is_unsupported() {
        let result = backend_for(&ProviderConfig::named("carrier-pigeon"));
        match result {
            Err(LlmError::Unsupported(msg)) => {
                assert!(msg.contains("carrier-pigeon"));
                assert!(msg.contains("anthropic"));
            }
            Err(other) => panic!("expected unsupported, got {other:?}"),
            Ok(_) => panic!("expected unsupported, got a backend"),
        }
    }

    #[test]
    fn test_backend_for_constructs_with_key_present() {
        // PATH is always set, so it stands in for a key variable here.
        let mut config = ProviderConfig::named("openai-compatible");
        config.api_key_env = Some("PATH".to_string());

        let backend = backend_for(&config).unwrap();
        assert_eq!(backend.name(), "openai-compatible");
    }

    #[tokio::test]
    async fn test_unavailable_backend_always_fails() {
        let mut config = ProviderConfig::named("anthropic");
        config.api_key_env = Some("ASSESSOR_TEST_KEY_NEVER_SET".to_string());

        let backend = backend_or_unavailable(&config);
        assert_eq!(backend.name(), "anthropic");

        let inv = LlmInvocation::from_prompts("s", Duration::from_secs(1), "sys", "user");
        let err = backend.invoke(inv).await.unwrap_err();
        assert!(matches!(err, LlmError::Misconfiguration(_)));
    }
}
