//! Persona-conditioned answer simulator with a single primary → fallback chain.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use assessor_config::Config;
use assessor_llm::{LlmBackend, LlmError, LlmInvocation, backend_or_unavailable};
use assessor_utils::redaction::redact_error_message;

use crate::persona::Persona;
use crate::question::{Answer, QuestionSpec};
use crate::source::{AnswerSource, ChainPosition};

/// Outer bound on one provider call, on top of the provider's own timeout.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of one `generate` call. `text` is `None` exactly when the source
/// is `SimulatorFailed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedAnswer {
    pub text: Option<String>,
    pub source: AnswerSource,
}

impl SimulatedAnswer {
    fn produced(text: String, position: ChainPosition) -> Self {
        Self {
            text: Some(text),
            source: AnswerSource::from_chain(Some(position)),
        }
    }

    fn failed() -> Self {
        Self {
            text: None,
            source: AnswerSource::from_chain(None),
        }
    }

    /// Shape the text for `question`; `None` if the simulator failed or
    /// produced nothing usable.
    #[must_use]
    pub fn to_answer(&self, question: &QuestionSpec) -> Option<Answer> {
        self.text
            .as_deref()
            .and_then(|text| Answer::from_text(text, question))
    }
}

pub struct PersonaAutoAnswerer {
    primary: Arc<dyn LlmBackend>,
    fallback: Arc<dyn LlmBackend>,
    industry: String,
    call_timeout: Duration,
}

impl PersonaAutoAnswerer {
    #[must_use]
    pub fn new(
        primary: Arc<dyn LlmBackend>,
        fallback: Arc<dyn LlmBackend>,
        industry: impl Into<String>,
    ) -> Self {
        Self {
            primary,
            fallback,
            industry: industry.into(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Build both providers from `[simulator.*]`. A provider that cannot be
    /// constructed still occupies its slot and fails every call.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::from(backend_or_unavailable(&config.simulator.primary)),
            Arc::from(backend_or_unavailable(&config.simulator.fallback)),
            config.assessment.industry.clone(),
        )
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Produce an answer for `question` in the voice of `persona`.
    ///
    /// Calls the primary provider once; on any failure calls the fallback
    /// once. Never loops and never invents an answer locally.
    pub async fn generate(
        &self,
        session_id: &str,
        question: &QuestionSpec,
        persona: Persona,
    ) -> SimulatedAnswer {
        let profile = persona.profile();
        let system_prompt = profile.system_prompt(&self.industry);
        let user_prompt = profile.user_prompt(question);

        for (position, backend) in [
            (ChainPosition::Primary, &self.primary),
            (ChainPosition::Fallback, &self.fallback),
        ] {
            let invocation = LlmInvocation::from_prompts(
                session_id,
                self.call_timeout,
                system_prompt.clone(),
                user_prompt.clone(),
            );

            match self.call(backend.as_ref(), invocation).await {
                Ok(text) => {
                    debug!(
                        session_id,
                        provider = backend.name(),
                        persona = %persona,
                        ?position,
                        "Simulated answer produced"
                    );
                    return SimulatedAnswer::produced(text, position);
                }
                Err(err) => {
                    warn!(
                        session_id,
                        provider = backend.name(),
                        ?position,
                        error = %redact_error_message(&err.to_string()),
                        "Answer simulator call failed"
                    );
                }
            }
        }

        SimulatedAnswer::failed()
    }

    async fn call(&self, backend: &dyn LlmBackend, inv: LlmInvocation) -> Result<String, LlmError> {
        let result = tokio::time::timeout(self.call_timeout, backend.invoke(inv))
            .await
            .map_err(|_| LlmError::Timeout {
                duration: self.call_timeout,
            })??;

        let text = result.content.trim();
        if text.is_empty() {
            return Err(LlmError::Transport("provider returned empty content".to_string()));
        }
        Ok(text.to_string())
    }
}
