//! In-process stand-ins for the Question Service, Report Service and the
//! simulator providers. Nothing here touches the network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assessor::services::{QuestionResponse, QuestionService, ReportService};
use assessor::{Config, HistoryEntry, Orchestrator, PersonaAutoAnswerer, ServiceError, ServiceKind};
use assessor_llm::{LlmBackend, LlmError, LlmInvocation, LlmResult};
use async_trait::async_trait;

/// One observed `next_question` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCall {
    pub phase: String,
    pub history_len: usize,
}

/// Replays queued responses; once the queue is empty every call signals
/// overall completion.
#[derive(Default)]
pub struct ScriptedQuestions {
    replies: Mutex<VecDeque<Result<QuestionResponse, ServiceError>>>,
    calls: Mutex<Vec<QuestionCall>>,
}

impl ScriptedQuestions {
    pub fn new<I>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Result<QuestionResponse, ServiceError>>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, reply: Result<QuestionResponse, ServiceError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<QuestionCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuestionService for ScriptedQuestions {
    async fn next_question(
        &self,
        phase: &str,
        history: &[HistoryEntry],
    ) -> Result<QuestionResponse, ServiceError> {
        self.calls.lock().unwrap().push(QuestionCall {
            phase: phase.to_string(),
            history_len: history.len(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QuestionResponse::completed()))
    }
}

/// Asks numbered free-text questions forever and never ends a phase.
#[derive(Default)]
pub struct EndlessQuestions {
    calls: AtomicUsize,
}

#[async_trait]
impl QuestionService for EndlessQuestions {
    async fn next_question(
        &self,
        phase: &str,
        _history: &[HistoryEntry],
    ) -> Result<QuestionResponse, ServiceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(QuestionResponse::asking(format!("{phase} question {n}")))
    }
}

/// Counts report requests and fails the first `failures` of them.
pub struct RecordingReports {
    failures: AtomicUsize,
    calls: AtomicUsize,
    seen: Mutex<Vec<(usize, String)>>,
}

impl RecordingReports {
    pub fn ok() -> Arc<Self> {
        Self::failing_first(0)
    }

    pub fn failing_first(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(history_len, industry)` per call.
    pub fn seen(&self) -> Vec<(usize, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportService for RecordingReports {
    async fn generate_report(
        &self,
        history: &[HistoryEntry],
        industry: &str,
    ) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((history.len(), industry.to_string()));

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(transport(ServiceKind::Report));
        }
        Ok(format!("# Report\n\n{} answers for {industry}", history.len()))
    }
}

/// Simulator provider that always answers with the same text, or always fails.
pub struct StubLlm {
    name: &'static str,
    reply: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubLlm {
    pub fn answering(name: &'static str, text: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: Some(text.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(name: &'static str, text: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: Some(text.to_string()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for StubLlm {
    fn name(&self) -> &str {
        self.name
    }

    async fn invoke(&self, _inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Some(text) => Ok(LlmResult::new(text.clone(), self.name, "stub")),
            None => Err(LlmError::ProviderOutage("HTTP 503".to_string())),
        }
    }
}

pub fn transport(service: ServiceKind) -> ServiceError {
    ServiceError::Transport {
        service,
        message: "connection refused".to_string(),
    }
}

pub fn config(phases: &[&str], max_questions: usize) -> Config {
    Config::builder()
        .phases(phases.iter().copied())
        .max_questions(max_questions)
        .max_auto_steps(30)
        .industry("retail")
        .build()
        .unwrap()
}

pub fn orchestrator(
    config: Config,
    questions: Arc<dyn QuestionService>,
    reports: Arc<dyn ReportService>,
    primary: Arc<dyn LlmBackend>,
    fallback: Arc<dyn LlmBackend>,
) -> Orchestrator {
    let answerer = PersonaAutoAnswerer::new(primary, fallback, config.assessment.industry.clone());
    Orchestrator::new(config, questions, reports, Arc::new(answerer))
}

/// Orchestrator whose simulators are never expected to be called.
pub fn manual_orchestrator(
    config: Config,
    questions: Arc<dyn QuestionService>,
    reports: Arc<dyn ReportService>,
) -> Orchestrator {
    orchestrator(
        config,
        questions,
        reports,
        StubLlm::failing("primary"),
        StubLlm::failing("fallback"),
    )
}

pub fn ask(text: &str) -> Result<QuestionResponse, ServiceError> {
    Ok(QuestionResponse::asking(text))
}

pub fn phase_done() -> Result<QuestionResponse, ServiceError> {
    Ok(QuestionResponse::phase_complete())
}

pub fn all_done() -> Result<QuestionResponse, ServiceError> {
    Ok(QuestionResponse::completed())
}
