//! Session façade for external consumers.
//!
//! **Integration rule**: outside this crate, drive sessions through
//! [`Orchestrator`] and [`SessionHandle`]. `AssessmentSession` is the state
//! machine underneath; the handle adds submit serialization, non-blocking
//! snapshots and the auto-complete task.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use assessor_config::Config;
//! use assessor_engine::{Answer, Orchestrator, Persona};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::from_config(Config::defaults())?;
//!     let handle = orchestrator.start_session(Some("retail")).await?;
//!
//!     handle.submit_answer(Answer::Text("We review it yearly".into())).await?;
//!
//!     handle.start_auto_complete(Persona::Enabler)?;
//!     let outcome = handle.wait_auto_complete().await;
//!     println!("{outcome:?}, report: {:?}", handle.get_report().is_some());
//!     Ok(())
//! }
//! ```
//!
//! # Threading
//!
//! `SessionHandle` is cheap to clone and `Send + Sync`. Only one submission
//! (manual, retry, or auto-complete step) runs at a time per session; a
//! second one is rejected with `SessionError::SubmitInFlight` instead of
//! queueing. Reads ([`snapshot`](SessionHandle::snapshot),
//! [`get_history`](SessionHandle::get_history),
//! [`get_report`](SessionHandle::get_report)) never wait for a submission.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};

use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, warn};

use assessor_config::Config;
use assessor_utils::error::{ConfigError, DriverError, ServiceError, SessionError};
use assessor_utils::logging::session_span;

use crate::driver::{AutoCompleteDriver, AutoCompleteOutcome, AutoCompleteState};
use crate::ledger::HistoryEntry;
use crate::persona::Persona;
use crate::question::{Answer, QuestionSpec};
use crate::report::ReportArtifact;
use crate::services::{HttpQuestionService, HttpReportService, QuestionService, ReportService};
use crate::session::{AssessmentSession, CompletionReason, SessionStatus, SubmitOutcome};
use crate::simulator::PersonaAutoAnswerer;
use crate::source::AnswerSource;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> String {
    format!(
        "{}-{:04}",
        Utc::now().format("%Y%m%dT%H%M%S"),
        SESSION_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// Owned, point-in-time view of a session.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub session_id: String,
    pub industry: String,
    pub phase: String,
    pub phase_index: usize,
    pub phase_count: usize,
    pub question: Option<QuestionSpec>,
    pub status: SessionStatus,
    pub completion: Option<CompletionReason>,
    /// Last error from a submission, fetch retry, or report attempt
    pub error: Option<String>,
    pub pending_fetch: bool,
    pub history: Arc<Vec<HistoryEntry>>,
    pub report: Option<Arc<ReportArtifact>>,
    pub auto: AutoCompleteState,
    pub auto_steps: u32,
    /// Last auto-complete failure, kept apart from `error`
    pub auto_error: Option<String>,
}

impl SessionView {
    fn of(session: &AssessmentSession) -> Self {
        Self {
            session_id: session.id().to_string(),
            industry: session.industry().to_string(),
            phase: session.current_phase().to_string(),
            phase_index: session.phase_index(),
            phase_count: session.phases().len(),
            question: session.current_question().cloned(),
            status: session.status(),
            completion: session.completion_reason(),
            error: session.error().map(str::to_string),
            pending_fetch: session.is_fetch_pending(),
            history: Arc::new(session.history()),
            report: session.report().cloned().map(Arc::new),
            auto: AutoCompleteState::Idle,
            auto_steps: 0,
            auto_error: None,
        }
    }

    /// Refresh the session-owned fields, keeping auto-complete fields.
    fn refresh(&mut self, session: &AssessmentSession) {
        let fresh = Self::of(session);
        *self = Self {
            auto: self.auto,
            auto_steps: self.auto_steps,
            auto_error: self.auto_error.take(),
            ..fresh
        };
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

/// Creates sessions that share one configuration and one set of collaborators.
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<Config>,
    questions: Arc<dyn QuestionService>,
    reports: Arc<dyn ReportService>,
    answerer: Arc<PersonaAutoAnswerer>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        config: Config,
        questions: Arc<dyn QuestionService>,
        reports: Arc<dyn ReportService>,
        answerer: Arc<PersonaAutoAnswerer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            questions,
            reports,
            answerer,
        }
    }

    /// HTTP services and simulator providers as configured.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` if an HTTP client cannot be built.
    pub fn from_config(config: Config) -> Result<Self, ServiceError> {
        let questions = Arc::new(HttpQuestionService::from_config(&config)?);
        let reports = Arc::new(HttpReportService::from_config(&config)?);
        let answerer = Arc::new(PersonaAutoAnswerer::from_config(&config));
        Ok(Self::new(config, questions, reports, answerer))
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create a session and fetch its first question.
    ///
    /// A failed first fetch does not fail this call: the handle is returned
    /// with the error in its snapshot and [`SessionHandle::retry`] available.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the assessment configuration is unusable.
    pub async fn start_session(&self, industry: Option<&str>) -> Result<SessionHandle, ConfigError> {
        let industry = industry
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .unwrap_or(&self.config.assessment.industry)
            .to_string();
        let id = next_session_id();
        let span = session_span(&id, &industry);

        let session = AssessmentSession::new(
            id.clone(),
            industry,
            &self.config.assessment,
            self.questions.clone(),
            self.reports.clone(),
        )?;
        let (view, _) = watch::channel(SessionView::of(&session));

        let handle = SessionHandle {
            inner: Arc::new(HandleInner {
                id,
                session: Mutex::new(session),
                view,
                answerer: self.answerer.clone(),
                max_auto_steps: self.config.assessment.max_auto_steps,
                max_questions: self.config.assessment.max_questions,
                auto: std::sync::Mutex::new(AutoSlot::default()),
                span,
            }),
        };

        let started = async {
            let mut session = handle.inner.session.lock().await;
            let result = session.start().await;
            handle.publish(&session);
            result
        }
        .instrument(handle.inner.span.clone())
        .await;

        if let Err(err) = started {
            warn!(session_id = %handle.id(), error = %err, "First question could not be loaded");
        }
        Ok(handle)
    }
}

#[derive(Default)]
struct AutoSlot {
    stop: Option<Arc<AtomicBool>>,
    task: Option<JoinHandle<AutoCompleteOutcome>>,
}

struct HandleInner {
    id: String,
    session: Mutex<AssessmentSession>,
    view: watch::Sender<SessionView>,
    answerer: Arc<PersonaAutoAnswerer>,
    max_auto_steps: u32,
    max_questions: usize,
    auto: std::sync::Mutex<AutoSlot>,
    span: Span,
}

/// Reference to one running assessment.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<HandleInner>,
}

impl SessionHandle {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn max_questions(&self) -> usize {
        self.inner.max_questions
    }

    /// Current state without waiting for an in-flight submission.
    #[must_use]
    pub fn snapshot(&self) -> SessionView {
        self.inner.view.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.inner.view.subscribe()
    }

    #[must_use]
    pub fn get_history(&self) -> Vec<HistoryEntry> {
        self.inner.view.borrow().history.as_ref().clone()
    }

    /// The stored report, if one was produced. Never calls the Report Service.
    #[must_use]
    pub fn get_report(&self) -> Option<ReportArtifact> {
        self.inner
            .view
            .borrow()
            .report
            .as_deref()
            .cloned()
    }

    /// Submit a manual answer for the current question.
    ///
    /// # Errors
    ///
    /// `SubmitInFlight` while another submission or an auto-complete run is
    /// active; otherwise see [`AssessmentSession::submit_answer`].
    pub async fn submit_answer(&self, answer: Answer) -> Result<SubmitOutcome, SessionError> {
        if self.snapshot().auto == AutoCompleteState::Running {
            return Err(SessionError::SubmitInFlight);
        }
        let mut session = self.lock_session()?;
        let result = session
            .submit_answer(answer, AnswerSource::Manual)
            .instrument(self.inner.span.clone())
            .await;
        self.publish(&session);
        result
    }

    /// Shape typed text for the current question and submit it.
    ///
    /// # Errors
    ///
    /// `EmptyAnswer` for blank input, otherwise as [`submit_answer`](Self::submit_answer).
    pub async fn submit_text(&self, text: &str) -> Result<SubmitOutcome, SessionError> {
        let view = self.snapshot();
        let question = view.question.as_ref().ok_or(if view.is_completed() {
            SessionError::AlreadyCompleted
        } else {
            SessionError::NoCurrentQuestion
        })?;
        let answer = Answer::from_text(text, question).ok_or(SessionError::EmptyAnswer)?;
        self.submit_answer(answer).await
    }

    /// Retry a failed question fetch.
    ///
    /// # Errors
    ///
    /// See [`AssessmentSession::retry_fetch`].
    pub async fn retry(&self) -> Result<SubmitOutcome, SessionError> {
        let mut session = self.lock_session()?;
        let result = session
            .retry_fetch()
            .instrument(self.inner.span.clone())
            .await;
        self.publish(&session);
        result
    }

    /// Produce the report if completion happened but the report failed.
    ///
    /// # Errors
    ///
    /// See [`AssessmentSession::retry_report`].
    pub async fn retry_report(&self) -> Result<ReportArtifact, SessionError> {
        let mut session = self.lock_session()?;
        let result = session
            .retry_report()
            .instrument(self.inner.span.clone())
            .await;
        self.publish(&session);
        result
    }

    /// Start answering automatically as `persona`. Must be called from
    /// within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if a run is active, `Session(AlreadyCompleted)` after
    /// completion.
    pub fn start_auto_complete(&self, persona: Persona) -> Result<(), DriverError> {
        let mut slot = self.auto_slot();
        if slot.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return Err(DriverError::AlreadyRunning);
        }
        if self.snapshot().is_completed() {
            return Err(DriverError::Session(SessionError::AlreadyCompleted));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let driver = AutoCompleteDriver::new(
            self.clone(),
            self.inner.answerer.clone(),
            persona,
            stop.clone(),
            self.inner.max_auto_steps,
        );

        self.inner.view.send_modify(|view| {
            view.auto = AutoCompleteState::Running;
            view.auto_steps = 0;
            view.auto_error = None;
        });

        let task = tokio::spawn(driver.run().instrument(self.inner.span.clone()));
        slot.stop = Some(stop);
        slot.task = Some(task);
        Ok(())
    }

    /// Ask the running auto-complete loop to stop before its next step.
    /// Returns `false` if nothing was running.
    pub fn stop_auto_complete(&self) -> bool {
        let slot = self.auto_slot();
        match (&slot.stop, &slot.task) {
            (Some(stop), Some(task)) if !task.is_finished() => {
                stop.store(true, Ordering::SeqCst);
                true
            }
            _ => false,
        }
    }

    /// Wait for the current auto-complete run to end.
    ///
    /// Returns `None` if no run was started since the last wait.
    pub async fn wait_auto_complete(&self) -> Option<AutoCompleteOutcome> {
        let task = self.auto_slot().task.take()?;
        match task.await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                warn!(error = %err, "Auto-complete task did not finish cleanly");
                None
            }
        }
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, AssessmentSession>, SessionError> {
        self.inner
            .session
            .try_lock()
            .map_err(|_| SessionError::SubmitInFlight)
    }

    fn auto_slot(&self) -> std::sync::MutexGuard<'_, AutoSlot> {
        self.inner
            .auto
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &AssessmentSession) {
        self.inner.view.send_modify(|view| view.refresh(session));
    }

    /// Submit on behalf of the auto-complete loop, only if `question` is
    /// still the one awaiting an answer.
    pub(crate) async fn submit_for_driver(
        &self,
        question: &str,
        answer: Answer,
        source: AnswerSource,
    ) -> Result<SubmitOutcome, SessionError> {
        let mut session = self.lock_session()?;
        if session.current_question().map(|q| q.text.as_str()) != Some(question) {
            return Err(SessionError::NoCurrentQuestion);
        }
        let result = session.submit_answer(answer, source).await;
        self.publish(&session);
        result
    }

    pub(crate) fn record_auto_step(&self, steps: u32) {
        self.inner.view.send_modify(|view| view.auto_steps = steps);
    }

    pub(crate) fn finish_auto(&self, outcome: &AutoCompleteOutcome) {
        self.inner.view.send_modify(|view| {
            view.auto = outcome.state();
            view.auto_steps = outcome.steps();
            view.auto_error = outcome.error().map(ToString::to_string);
        });
    }
}
