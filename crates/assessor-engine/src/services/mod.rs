//! Question and Report service boundary
//!
//! Both services are opaque text generators reached over HTTP+JSON. The
//! session talks to them only through these traits, so tests can swap in
//! in-process stubs.

mod http;

pub use http::{HttpQuestionService, HttpReportService};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use assessor_utils::error::{ServiceError, ServiceKind};

use crate::ledger::HistoryEntry;
use crate::question::{AnswerType, QuestionSpec};

#[async_trait]
pub trait QuestionService: Send + Sync {
    /// Ask for the next question in `phase` given everything answered so far.
    ///
    /// # Errors
    ///
    /// Any `ServiceError`; the session keeps its state and allows a retry.
    async fn next_question(
        &self,
        phase: &str,
        history: &[HistoryEntry],
    ) -> Result<QuestionResponse, ServiceError>;
}

#[async_trait]
pub trait ReportService: Send + Sync {
    /// Produce report markdown for a finished transcript.
    ///
    /// # Errors
    ///
    /// Any `ServiceError`; completion is kept and the report may be retried.
    async fn generate_report(
        &self,
        history: &[HistoryEntry],
        industry: &str,
    ) -> Result<String, ServiceError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    #[default]
    Asking,
    Complete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    #[default]
    Asking,
    Completed,
}

/// Wire shape of a Question Service reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub answer_type: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub phase_status: PhaseStatus,
    #[serde(default)]
    pub overall_status: OverallStatus,
    #[serde(default)]
    pub reasoning_text: Option<String>,
}

/// What the session should do with a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionDirective {
    Ask(QuestionSpec),
    PhaseComplete,
    Completed,
}

impl QuestionResponse {
    /// An `asking` reply carrying a free-text question.
    #[must_use]
    pub fn asking(text: impl Into<String>) -> Self {
        Self {
            question_text: Some(text.into()),
            answer_type: Some(AnswerType::Text.as_str().to_string()),
            ..Self::default()
        }
    }

    /// An `asking` reply carrying a question with options.
    #[must_use]
    pub fn asking_with_options<I, S>(text: impl Into<String>, answer_type: AnswerType, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            question_text: Some(text.into()),
            answer_type: Some(answer_type.as_str().to_string()),
            options: Some(options.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn phase_complete() -> Self {
        Self {
            phase_status: PhaseStatus::Complete,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn completed() -> Self {
        Self {
            overall_status: OverallStatus::Completed,
            ..Self::default()
        }
    }

    /// Classify the reply.
    ///
    /// Explicit overall completion wins over everything else, including a
    /// question that arrived alongside it. Only an explicit `complete` phase
    /// status exhausts the current phase.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Malformed` for an `asking` reply without
    /// question text, an unknown answer type, or a choice/scale question
    /// without options.
    pub fn interpret(self) -> Result<QuestionDirective, ServiceError> {
        if self.overall_status == OverallStatus::Completed {
            return Ok(QuestionDirective::Completed);
        }
        if self.phase_status == PhaseStatus::Complete {
            return Ok(QuestionDirective::PhaseComplete);
        }

        let Some(text) = self.question_text.filter(|t| !t.trim().is_empty()) else {
            return Err(ServiceError::malformed(
                ServiceKind::Question,
                "missing questionText",
            ));
        };

        let answer_type = match self.answer_type.as_deref() {
            None => AnswerType::Text,
            Some(name) => AnswerType::from_wire(name).ok_or_else(|| {
                ServiceError::malformed(
                    ServiceKind::Question,
                    format!("unknown answerType '{name}'"),
                )
            })?,
        };

        QuestionSpec::new(text, answer_type, self.options, self.reasoning_text)
            .map(QuestionDirective::Ask)
            .map_err(|e| ServiceError::malformed(ServiceKind::Question, e.to_string()))
    }
}

/// Request body sent to the Question Service.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionRequest<'a> {
    pub phase: &'a str,
    pub history: &'a [HistoryEntry],
}

/// Request body sent to the Report Service.
#[derive(Debug, Serialize)]
pub(crate) struct ReportRequest<'a> {
    pub history: &'a [HistoryEntry],
    pub industry: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportResponse {
    #[serde(default)]
    pub report_markdown: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_completion_beats_question_text() {
        let mut response = QuestionResponse::asking("One more?");
        response.overall_status = OverallStatus::Completed;
        assert_eq!(response.interpret().unwrap(), QuestionDirective::Completed);
    }

    #[test]
    fn test_null_question_with_completed_status_is_completion() {
        let response: QuestionResponse =
            serde_json::from_str(r#"{"questionText": null, "overallStatus": "completed"}"#).unwrap();
        assert_eq!(response.interpret().unwrap(), QuestionDirective::Completed);
    }

    #[test]
    fn test_only_explicit_phase_status_completes_a_phase() {
        assert_eq!(
            QuestionResponse::phase_complete().interpret().unwrap(),
            QuestionDirective::PhaseComplete
        );
    }

    #[test]
    fn test_asking_reply_without_question_is_malformed() {
        for body in [
            r#"{"phaseStatus": "asking"}"#,
            r#"{}"#,
            r#"{"error": "upstream overloaded"}"#,
            r#"{"questionText": "   ", "overallStatus": "asking"}"#,
        ] {
            let response: QuestionResponse = serde_json::from_str(body).unwrap();
            assert!(
                matches!(
                    response.interpret(),
                    Err(ServiceError::Malformed { service: ServiceKind::Question, .. })
                ),
                "{body} should be malformed"
            );
        }
    }

    #[test]
    fn test_full_wire_shape_parses() {
        let body = r#"{
            "questionText": "How mature is your data governance?",
            "answerType": "scale",
            "options": ["1", "2", "3", "4", "5"],
            "phaseStatus": "asking",
            "overallStatus": "asking",
            "reasoningText": "Governance baseline"
        }"#;
        let response: QuestionResponse = serde_json::from_str(body).unwrap();
        match response.interpret().unwrap() {
            QuestionDirective::Ask(q) => {
                assert_eq!(q.answer_type, AnswerType::Scale);
                assert_eq!(q.options().len(), 5);
                assert_eq!(q.reasoning.as_deref(), Some("Governance baseline"));
            }
            other => panic!("expected a question, got {other:?}"),
        }
    }

    #[test]
    fn test_choice_without_options_is_malformed() {
        let mut response = QuestionResponse::asking("Pick one");
        response.answer_type = Some("singleChoice".to_string());
        assert!(matches!(
            response.interpret(),
            Err(ServiceError::Malformed { service: ServiceKind::Question, .. })
        ));
    }

    #[test]
    fn test_unknown_answer_type_is_malformed() {
        let mut response = QuestionResponse::asking("Draw it");
        response.answer_type = Some("drawing".to_string());
        assert!(matches!(response.interpret(), Err(ServiceError::Malformed { .. })));
    }

    #[test]
    fn test_request_body_shape() {
        let body = ReportRequest {
            history: &[],
            industry: "retail",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"history": [], "industry": "retail"}));
    }
}
