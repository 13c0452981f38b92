//! Response envelope normalization
//!
//! The two provider families answer with differently-shaped JSON bodies. Each
//! shape gets its own variant here and both resolve to one trimmed `content`
//! string before any fallback decision is made.

use serde::Deserialize;

use crate::LlmError;

/// A provider response body, parsed according to the provider that sent it.
#[derive(Debug, Clone)]
pub enum ProviderEnvelope {
    /// `{ "content": "..." }` or Messages-API style content blocks
    Messages(MessagesResponse),
    /// `{ "choices": [ { "message": { "content": "..." } } ] }`
    ChatCompletions(ChatCompletionsResponse),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    pub content: MessagesContent,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<MessagesUsage>,
}

/// Content is either a bare string or a list of typed blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessagesContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionsResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// The normalized view both envelopes resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContent {
    pub content: String,
    pub model: Option<String>,
    pub tokens: Option<(u64, u64)>,
}

impl ProviderEnvelope {
    /// Parse a Messages-style body.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Transport` if the body does not match the shape.
    pub fn parse_messages(body: &str) -> Result<Self, LlmError> {
        serde_json::from_str(body)
            .map(Self::Messages)
            .map_err(|e| LlmError::Transport(format!("Malformed messages response: {}", e)))
    }

    /// Parse a chat-completions body.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Transport` if the body does not match the shape.
    pub fn parse_chat_completions(body: &str) -> Result<Self, LlmError> {
        serde_json::from_str(body)
            .map(Self::ChatCompletions)
            .map_err(|e| LlmError::Transport(format!("Malformed chat completions response: {}", e)))
    }

    /// Resolve to the shared `{content}` view.
    ///
    /// Whitespace-only content is treated as a malformed body so that the
    /// caller falls back instead of submitting an empty answer.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Transport` when no usable text is present.
    pub fn normalize(self) -> Result<NormalizedContent, LlmError> {
        let (raw, model, tokens) = match self {
            Self::Messages(resp) => {
                let text = match resp.content {
                    MessagesContent::Text(text) => text,
                    MessagesContent::Blocks(blocks) => blocks
                        .into_iter()
                        .filter(|b| b.content_type == "text")
                        .filter_map(|b| b.text)
                        .collect::<Vec<_>>()
                        .join(""),
                };
                let tokens = resp.usage.map(|u| (u.input_tokens, u.output_tokens));
                (text, resp.model, tokens)
            }
            Self::ChatCompletions(resp) => {
                let text = resp
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| {
                        LlmError::Transport("Response contained no choices".to_string())
                    })?;
                let tokens = resp.usage.map(|u| (u.prompt_tokens, u.completion_tokens));
                (text, resp.model, tokens)
            }
        };

        let content = raw.trim().to_string();
        if content.is_empty() {
            return Err(LlmError::Transport(
                "Response contained empty content".to_string(),
            ));
        }

        Ok(NormalizedContent {
            content,
            model,
            tokens,
        })
    }
}
