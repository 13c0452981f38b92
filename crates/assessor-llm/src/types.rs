//! Provider-neutral request and response types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// What a backend is asked to do for one simulated answer.
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    /// Only used to correlate log lines.
    pub session_id: String,
    /// Empty selects the provider's configured model.
    pub model: String,
    pub timeout: Duration,
    pub messages: Vec<Message>,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            model: model.into(),
            timeout,
            messages,
        }
    }

    /// A persona prompt followed by the question prompt.
    #[must_use]
    pub fn from_prompts(
        session_id: impl Into<String>,
        timeout: Duration,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self::new(
            session_id,
            "",
            timeout,
            vec![Message::system(system_prompt), Message::user(user_prompt)],
        )
    }
}

/// Token counts, when the provider reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}

/// Generated text plus the metadata recorded alongside a simulated answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmResult {
    /// Trimmed text taken out of the provider envelope.
    pub content: String,
    pub provider: String,
    /// As reported by the provider when it says, else as requested.
    pub model_used: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl LlmResult {
    #[must_use]
    pub fn new(
        content: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            usage: None,
        }
    }

    #[must_use]
    pub fn with_usage(self, usage: Option<TokenUsage>) -> Self {
        Self { usage, ..self }
    }
}

/// A text-generation provider.
///
/// Any non-2xx status, timeout, or body without usable text is an `Err`; the
/// simulator switches to its fallback on exactly those.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Transport, auth, quota, outage, timeout and envelope failures.
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;
}
