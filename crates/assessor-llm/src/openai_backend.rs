//! Chat-completions provider
//!
//! Works with any OpenAI-compatible endpoint: OpenRouter by default, or a
//! local gateway through `base_url`. The answer is read from
//! `choices[0].message.content`.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use assessor_config::ProviderConfig;

use crate::LlmError;
use crate::envelope::ProviderEnvelope;
use crate::provider_http::{CallSettings, ProviderClient, ProviderDefaults, api_key};
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

pub(crate) const PROVIDER_NAME: &str = "openai-compatible";

const ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
const BUILTIN_MODEL: &str = "openai/gpt-4o-mini";
const KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Sent as `X-Title` so gateways can attribute traffic.
const APP_TITLE: &str = "assessor";

pub(crate) struct OpenAiCompatibleBackend {
    client: ProviderClient,
    endpoint: String,
    api_key: String,
    defaults: ProviderDefaults,
}

impl OpenAiCompatibleBackend {
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
impl LlmBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let settings = self.defaults.settle(&inv);
        let body = ChatRequest::build(&settings, &inv.messages);
        debug!(
            session_id = %inv.session_id,
            model = %settings.model,
            endpoint = %self.endpoint,
            "Calling chat completions"
        );

        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("X-Title", APP_TITLE)
            .json(&body);
        let raw = self.client.send(request, settings.timeout).await?;

        let normalized = ProviderEnvelope::parse_chat_completions(&raw)?.normalize()?;
        Ok(settings.into_result(PROVIDER_NAME, normalized))
    }
}

#[derive(Debug, Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

impl<'a> ChatRequest<'a> {
    fn build(settings: &'a CallSettings, messages: &'a [Message]) -> Self {
        Self {
            model: &settings.model,
            messages: messages
                .iter()
                .map(|m| ChatTurn {
                    role: role_name(m.role),
                    content: &m.content,
                })
                .collect(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            stream: false,
        }
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}
