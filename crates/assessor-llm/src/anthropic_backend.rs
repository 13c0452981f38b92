//! Messages-API provider
//!
//! The reply's `content` may be a plain string or a list of typed blocks;
//! [`ProviderEnvelope::parse_messages`] accepts both.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use assessor_config::ProviderConfig;

use crate::LlmError;
use crate::envelope::ProviderEnvelope;
use crate::provider_http::{CallSettings, ProviderClient, ProviderDefaults, api_key};
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

pub(crate) const PROVIDER_NAME: &str = "anthropic";

const ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const BUILTIN_MODEL: &str = "claude-3-5-haiku-latest";
const KEY_ENV: &str = "ANTHROPIC_API_KEY";

pub(crate) struct AnthropicBackend {
    client: ProviderClient,
    endpoint: String,
    api_key: String,
    defaults: ProviderDefaults,
}

impl AnthropicBackend {
    /// # Errors
    ///
    /// `LlmError::Misconfiguration` when the key variable is unset or the
    /// HTTP client cannot be built.
    pub fn new_from_config(config: &ProviderConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: ProviderClient::new(PROVIDER_NAME)?,
            endpoint: config.base_url.clone().unwrap_or_else(|| ENDPOINT.to_string()),
            api_key: api_key(config, KEY_ENV)?,
            defaults: ProviderDefaults::from_config(config, BUILTIN_MODEL),
        })
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let settings = self.defaults.settle(&inv);
        let body = MessagesRequest::build(&settings, &inv.messages);
        debug!(
            session_id = %inv.session_id,
            model = %settings.model,
            turns = body.messages.len(),
            has_system = body.system.is_some(),
            "Calling Messages API"
        );

        let request = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let raw = self.client.send(request, settings.timeout).await?;

        let normalized = ProviderEnvelope::parse_messages(&raw)?.normalize()?;
        let result = settings.into_result(PROVIDER_NAME, normalized);
        debug!(
            model = %result.model_used,
            usage = ?result.usage,
            "Messages API answered"
        );
        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Turn<'a>>,
}

impl<'a> MessagesRequest<'a> {
    /// System messages are lifted into the top-level `system` field, joined
    /// by blank lines; the rest keep their order.
    fn build(settings: &'a CallSettings, messages: &'a [Message]) -> Self {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let turns = messages
            .iter()
            .filter_map(|m| match m.role {
                Role::System => None,
                Role::User => Some(Turn {
                    role: "user",
                    content: &m.content,
                }),
                Role::Assistant => Some(Turn {
                    role: "assistant",
                    content: &m.content,
                }),
            })
            .collect();

        Self {
            model: &settings.model,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: turns,
        }
    }
}
