//! The assessment state machine
//!
//! `AssessmentSession` owns the phase sequencer and the history ledger and is
//! the only thing that mutates them. Every transition goes through
//! [`AssessmentSession::submit_answer`] or one of the retry entry points.
//!
//! Completion precedence, highest first:
//!
//! 1. an explicit `overallStatus: completed` from the Question Service
//! 2. the local question cap (checked right after each append, before the
//!    service is even called)
//! 3. phase exhaustion on the last phase
//! 4. a repeated question, handled exactly like phase exhaustion
//!
//! A question-fetch failure never advances the phase or completes the
//! session: the answer already recorded stays recorded, the last question is
//! kept for display, and further answers are refused until
//! [`AssessmentSession::retry_fetch`] succeeds.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use assessor_config::AssessmentConfig;
use assessor_utils::error::{ConfigError, ServiceError, SessionError};
use assessor_utils::logging::{log_completion, log_phase_advance, log_service_failure};

use crate::ledger::{HistoryEntry, HistoryLedger};
use crate::phase::PhaseSequencer;
use crate::question::{Answer, QuestionSpec};
use crate::report::ReportArtifact;
use crate::services::{QuestionDirective, QuestionResponse, QuestionService, ReportService};
use crate::source::AnswerSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// Why a session completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionReason {
    QuestionCap,
    ServiceSignaled,
    PhasesExhausted,
}

impl fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuestionCap => write!(f, "question cap reached"),
            Self::ServiceSignaled => write!(f, "question service signaled completion"),
            Self::PhasesExhausted => write!(f, "all phases exhausted"),
        }
    }
}

/// What a successful transition leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    NextQuestion(QuestionSpec),
    Completed { report: Option<ReportArtifact> },
}

pub struct AssessmentSession {
    id: String,
    industry: String,
    max_questions: usize,
    sequencer: PhaseSequencer,
    ledger: HistoryLedger,
    current_question: Option<QuestionSpec>,
    status: SessionStatus,
    completion: Option<CompletionReason>,
    error: Option<String>,
    pending_fetch: bool,
    report: Option<ReportArtifact>,
    questions: Arc<dyn QuestionService>,
    reports: Arc<dyn ReportService>,
}

impl fmt::Debug for AssessmentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssessmentSession")
            .field("id", &self.id)
            .field("phase", &self.sequencer.current_phase())
            .field("history_len", &self.ledger.len())
            .field("status", &self.status)
            .field("pending_fetch", &self.pending_fetch)
            .finish_non_exhaustive()
    }
}

impl AssessmentSession {
    /// Create a session positioned at the first phase with no question yet.
    ///
    /// Call [`start`](Self::start) to fetch the first question.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the phase list is empty or the cap is zero.
    pub fn new(
        id: impl Into<String>,
        industry: impl Into<String>,
        assessment: &AssessmentConfig,
        questions: Arc<dyn QuestionService>,
        reports: Arc<dyn ReportService>,
    ) -> Result<Self, ConfigError> {
        let phases: Arc<[String]> = assessment.phases.clone().into();
        let sequencer = PhaseSequencer::new(phases)
            .ok_or_else(|| ConfigError::MissingRequired("assessment.phases".to_string()))?;
        if assessment.max_questions == 0 {
            return Err(ConfigError::InvalidValue {
                key: "assessment.max_questions".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(Self {
            id: id.into(),
            industry: industry.into(),
            max_questions: assessment.max_questions,
            sequencer,
            ledger: HistoryLedger::new(),
            current_question: None,
            status: SessionStatus::InProgress,
            completion: None,
            error: None,
            // No question has been fetched yet.
            pending_fetch: true,
            report: None,
            questions,
            reports,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn industry(&self) -> &str {
        &self.industry
    }

    #[must_use]
    pub fn current_phase(&self) -> &str {
        self.sequencer.current_phase()
    }

    #[must_use]
    pub fn phase_index(&self) -> usize {
        self.sequencer.index()
    }

    #[must_use]
    pub fn phases(&self) -> &[String] {
        self.sequencer.phases()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuestionSpec> {
        self.current_question.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn completion_reason(&self) -> Option<CompletionReason> {
        self.completion
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True while the next question still has to be fetched.
    #[must_use]
    pub fn is_fetch_pending(&self) -> bool {
        self.pending_fetch && self.status == SessionStatus::InProgress
    }

    #[must_use]
    pub fn max_questions(&self) -> usize {
        self.max_questions
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.ledger.len()
    }

    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.ledger.snapshot()
    }

    #[must_use]
    pub fn report(&self) -> Option<&ReportArtifact> {
        self.report.as_ref()
    }

    /// Fetch the first question.
    ///
    /// # Errors
    ///
    /// `AlreadyCompleted` if the session already finished, otherwise the
    /// same errors as [`retry_fetch`](Self::retry_fetch).
    pub async fn start(&mut self) -> Result<SubmitOutcome, SessionError> {
        if self.status == SessionStatus::Completed {
            return Err(SessionError::AlreadyCompleted);
        }
        info!(
            session_id = %self.id,
            phase = self.current_phase(),
            max_questions = self.max_questions,
            "Starting assessment"
        );
        self.fetch_next().await
    }

    /// Record `answer` for the current question and move the session on.
    ///
    /// # Errors
    ///
    /// - `AlreadyCompleted`, `FetchPending`, `NoCurrentQuestion`,
    ///   `EmptyAnswer`, `AnswerShapeMismatch`: rejected before anything is
    ///   recorded
    /// - `QuestionService`: the answer was recorded but the next question
    ///   could not be fetched; call [`retry_fetch`](Self::retry_fetch)
    /// - `Report`: the session completed but the report failed; call
    ///   [`retry_report`](Self::retry_report)
    pub async fn submit_answer(
        &mut self,
        answer: Answer,
        source: AnswerSource,
    ) -> Result<SubmitOutcome, SessionError> {
        if self.status == SessionStatus::Completed {
            return Err(SessionError::AlreadyCompleted);
        }
        if self.pending_fetch && self.current_question.is_some() {
            return Err(SessionError::FetchPending);
        }
        let Some(question) = self.current_question.as_ref() else {
            return Err(SessionError::NoCurrentQuestion);
        };
        if answer.is_empty() || !source.is_recordable() {
            return Err(SessionError::EmptyAnswer);
        }
        if !answer.fits(question.answer_type) {
            return Err(SessionError::AnswerShapeMismatch {
                answer_type: question.answer_type.as_str().to_string(),
            });
        }

        let entry = HistoryEntry::record(question, answer, self.current_phase(), source);
        let history_len = self.ledger.append(entry);
        self.pending_fetch = true;

        debug!(
            session_id = %self.id,
            phase = self.current_phase(),
            history_len,
            %source,
            "Answer recorded"
        );

        if history_len >= self.max_questions {
            return self.complete(CompletionReason::QuestionCap).await;
        }

        self.fetch_next().await
    }

    /// Re-request the next question after a failed fetch. Nothing is
    /// appended to the history.
    ///
    /// When no fetch is pending this is a no-op that returns the current
    /// question.
    ///
    /// # Errors
    ///
    /// `AlreadyCompleted` after completion, `QuestionService` if the fetch
    /// fails again, `Report` if the fetch completed the session and the
    /// report failed.
    pub async fn retry_fetch(&mut self) -> Result<SubmitOutcome, SessionError> {
        if self.status == SessionStatus::Completed {
            return Err(SessionError::AlreadyCompleted);
        }
        if !self.pending_fetch {
            return self
                .current_question
                .clone()
                .map(SubmitOutcome::NextQuestion)
                .ok_or(SessionError::NoCurrentQuestion);
        }
        self.fetch_next().await
    }

    /// Produce the report if completion was reached without one.
    ///
    /// An existing report is returned as-is; the Report Service is never
    /// called twice for a session that already has one.
    ///
    /// # Errors
    ///
    /// `NotCompleted` before completion, `Report` if the service fails.
    pub async fn retry_report(&mut self) -> Result<ReportArtifact, SessionError> {
        if self.status != SessionStatus::Completed {
            return Err(SessionError::NotCompleted);
        }
        if let Some(report) = &self.report {
            return Ok(report.clone());
        }
        self.generate_report().await
    }

    /// Ask the Question Service for the next question, walking forward
    /// through exhausted phases.
    ///
    /// Works on a copy of the sequencer and commits the phase only when the
    /// outcome is known, so a failure part-way leaves the phase untouched.
    /// Each loop iteration either returns or advances one phase, which bounds
    /// it by the number of phases.
    async fn fetch_next(&mut self) -> Result<SubmitOutcome, SessionError> {
        let mut sequencer = self.sequencer.clone();

        for _ in 0..sequencer.len() {
            let phase = sequencer.current_phase().to_string();
            let reply = self
                .questions
                .next_question(&phase, self.ledger.as_slice())
                .await;
            let directive = match reply.and_then(QuestionResponse::interpret) {
                Ok(directive) => directive,
                Err(err) => return Err(self.fetch_failed(err)),
            };

            match directive {
                QuestionDirective::Completed => {
                    self.sequencer = sequencer;
                    return self.complete(CompletionReason::ServiceSignaled).await;
                }
                QuestionDirective::Ask(question) if self.ledger.contains_question(&question.text) => {
                    debug!(
                        session_id = %self.id,
                        phase = %phase,
                        question = %question.text,
                        "Repeated question; treating phase as complete"
                    );
                }
                QuestionDirective::Ask(question) => {
                    self.sequencer = sequencer;
                    self.current_question = Some(question.clone());
                    self.pending_fetch = false;
                    self.error = None;
                    return Ok(SubmitOutcome::NextQuestion(question));
                }
                QuestionDirective::PhaseComplete => {}
            }

            match sequencer.advance() {
                Ok(next) => log_phase_advance(&self.id, &phase, next, self.ledger.len()),
                Err(_) => {
                    self.sequencer = sequencer;
                    return self.complete(CompletionReason::PhasesExhausted).await;
                }
            }
        }

        self.sequencer = sequencer;
        self.complete(CompletionReason::PhasesExhausted).await
    }

    fn fetch_failed(&mut self, err: ServiceError) -> SessionError {
        let err = SessionError::QuestionService(err);
        log_service_failure(&self.id, "next_question", &err.to_string());
        self.error = Some(err.to_string());
        self.pending_fetch = true;
        err
    }

    /// Enter the terminal state and hand off to the Report Service.
    async fn complete(&mut self, reason: CompletionReason) -> Result<SubmitOutcome, SessionError> {
        self.status = SessionStatus::Completed;
        self.completion = Some(reason);
        self.current_question = None;
        self.pending_fetch = false;
        self.error = None;
        log_completion(&self.id, &reason.to_string(), self.ledger.len());

        let report = self.generate_report().await?;
        Ok(SubmitOutcome::Completed {
            report: Some(report),
        })
    }

    async fn generate_report(&mut self) -> Result<ReportArtifact, SessionError> {
        let history = self.ledger.slice(self.max_questions);
        debug!(
            session_id = %self.id,
            entries = history.len(),
            industry = %self.industry,
            "Requesting report"
        );

        match self.reports.generate_report(&history, &self.industry).await {
            Ok(markdown) => {
                let artifact = ReportArtifact::new(markdown, history);
                info!(
                    session_id = %self.id,
                    history_hash = %artifact.history_hash,
                    "Report generated"
                );
                self.report = Some(artifact.clone());
                self.error = None;
                Ok(artifact)
            }
            Err(err) => {
                let err = SessionError::Report(err);
                log_service_failure(&self.id, "generate_report", &err.to_string());
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }
}
