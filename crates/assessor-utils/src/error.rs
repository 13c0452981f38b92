//! Error types shared by every assessor crate.
//!
//! Each layer has its own narrow enum. [`AssessError`] wraps them at the CLI
//! boundary, where [`UserFriendlyError`] turns any of them into a message,
//! some context, a list of next steps and an exit status.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::exit_codes::ExitCode;
use crate::redaction::redact_error_message;

/// Anything a CLI command can fail with.
#[derive(Error, Debug)]
pub enum AssessError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("session: {0}")]
    Session(#[from] SessionError),

    #[error("auto-complete: {0}")]
    Driver(#[from] DriverError),

    #[error("simulator provider: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// How an error is presented on the terminal.
pub trait UserFriendlyError {
    fn user_message(&self) -> String;

    /// What state the session is left in, when that is worth saying.
    fn context(&self) -> Option<String>;

    /// Next steps, most useful first.
    fn suggestions(&self) -> Vec<String>;

    fn category(&self) -> ErrorCategory;
}

/// Where a failure came from. The category alone decides the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    QuestionService,
    ReportService,
    Simulator,
    Invariant,
    Concurrency,
    FileSystem,
}

impl ErrorCategory {
    #[must_use]
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Configuration => ExitCode::CLI_ARGS,
            Self::QuestionService | Self::ReportService => ExitCode::SERVICE_FAILURE,
            Self::Simulator => ExitCode::SIMULATOR_FAILURE,
            Self::Invariant | Self::Concurrency => ExitCode::INVARIANT,
            Self::FileSystem => ExitCode::INTERNAL,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configuration => "configuration",
            Self::QuestionService => "question service",
            Self::ReportService => "report service",
            Self::Simulator => "answer simulator",
            Self::Invariant => "session rule",
            Self::Concurrency => "concurrent use",
            Self::FileSystem => "file system",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file exists but could not be read or parsed.
    #[error("cannot load config file: {0}")]
    InvalidFile(String),

    #[error("'{0}' must be set")]
    MissingRequired(String),

    #[error("bad value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}

/// The external service a [`ServiceError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Question,
    Report,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Question => write!(f, "question service"),
            Self::Report => write!(f, "report service"),
        }
    }
}

/// Failures talking to the Question or Report service.
///
/// Every variant is recoverable: the caller keeps its state and may retry.
/// A malformed body is reported separately for diagnostics but handled
/// exactly like a transport failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{service} unreachable: {message}")]
    Transport {
        service: ServiceKind,
        message: String,
    },

    #[error("{service} returned HTTP {status}")]
    Status { service: ServiceKind, status: u16 },

    #[error("{service} returned a malformed response: {message}")]
    Malformed {
        service: ServiceKind,
        message: String,
    },

    #[error("{service} timed out after {duration:?}")]
    Timeout {
        service: ServiceKind,
        duration: Duration,
    },
}

impl ServiceError {
    /// Which service failed.
    #[must_use]
    pub fn service(&self) -> ServiceKind {
        match self {
            Self::Transport { service, .. }
            | Self::Status { service, .. }
            | Self::Malformed { service, .. }
            | Self::Timeout { service, .. } => *service,
        }
    }

    /// Shorthand used by response validation.
    #[must_use]
    pub fn malformed(service: ServiceKind, message: impl Into<String>) -> Self {
        Self::Malformed {
            service,
            message: message.into(),
        }
    }
}

/// A simulator provider call that produced no usable text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Connection failure, non-classified 4xx, or a body that did not parse.
    #[error("{0}")]
    Transport(String),

    /// 401 or 403.
    #[error("rejected credentials: {0}")]
    ProviderAuth(String),

    /// 429.
    #[error("rate limited: {0}")]
    ProviderQuota(String),

    /// 5xx.
    #[error("provider down: {0}")]
    ProviderOutage(String),

    #[error("no answer within {duration:?}")]
    Timeout { duration: Duration },

    /// Missing key or unusable settings; raised before any request is sent.
    #[error("not configured: {0}")]
    Misconfiguration(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Errors raised by the assessment state machine.
///
/// Invariant violations (`NoCurrentQuestion`, `AlreadyCompleted`,
/// `SubmitInFlight`, `FetchPending`, `EmptyAnswer`, `AnswerShapeMismatch`,
/// `NotCompleted`) are
/// programmer errors: they never mutate the history ledger. Service variants
/// are recoverable and leave the session in place for a retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no question is currently awaiting an answer")]
    NoCurrentQuestion,

    #[error("assessment already completed; answers are no longer accepted")]
    AlreadyCompleted,

    #[error("another answer submission is still in flight for this session")]
    SubmitInFlight,

    #[error("the next question has not been fetched yet; retry the fetch before answering")]
    FetchPending,

    #[error("answer is empty")]
    EmptyAnswer,

    #[error("answer shape does not fit a '{answer_type}' question")]
    AnswerShapeMismatch { answer_type: String },

    #[error("assessment is not completed yet; no report can be produced")]
    NotCompleted,

    #[error("failed to fetch next question: {0}")]
    QuestionService(ServiceError),

    #[error("assessment completed but report generation failed: {0}")]
    Report(ServiceError),
}

impl SessionError {
    /// Recoverable errors can be retried without restarting the assessment.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::QuestionService(_) | Self::Report(_))
    }

    /// Invariant violations indicate caller misuse.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        !self.is_recoverable()
    }
}

/// Errors that stop an auto-complete run.
///
/// These travel on a channel separate from manual submission errors so the
/// two flows never mask each other.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("both answer simulators failed for question '{question}'")]
    SimulatorExhausted { question: String },

    #[error("auto-complete is already running for this session")]
    AlreadyRunning,

    #[error("auto-complete stopped after reaching the absolute step cap of {steps}")]
    StepCapReached { steps: u32 },

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        Some("Flags override the config file, which overrides built-in defaults.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        vec![
            "See where each value comes from with 'assessor config'".to_string(),
            "Fix .assessor/config.toml, or the file given to --config".to_string(),
        ]
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

impl UserFriendlyError for ServiceError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        Some(format!(
            "Nothing recorded so far depends on the {}; progress is intact.",
            self.service()
        ))
    }

    fn suggestions(&self) -> Vec<String> {
        vec![
            "Try again once the service is back".to_string(),
            "Check the [services] URLs".to_string(),
        ]
    }

    fn category(&self) -> ErrorCategory {
        match self.service() {
            ServiceKind::Question => ErrorCategory::QuestionService,
            ServiceKind::Report => ErrorCategory::ReportService,
        }
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        format!("simulator provider failed: {self}")
    }

    fn context(&self) -> Option<String> {
        matches!(self, Self::ProviderAuth(_) | Self::Misconfiguration(_)).then(|| {
            "API keys come from the variables named by api_key_env under [simulator.*]."
                .to_string()
        })
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) => {
                vec!["Export the key variable, or point api_key_env at one that is set".to_string()]
            }
            _ => vec!["Answer the rest by hand, or try auto-complete again later".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Misconfiguration(_) | Self::Unsupported(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::Simulator,
        }
    }
}

impl UserFriendlyError for SessionError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::QuestionService(_) => Some(
                "No recorded answer was lost; only the next question is missing.".to_string(),
            ),
            Self::Report(_) => Some(
                "The assessment itself is complete; only the report is missing.".to_string(),
            ),
            Self::SubmitInFlight => {
                Some("Answers are processed strictly one at a time.".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::QuestionService(_) | Self::FetchPending => {
                vec!["Retry fetching the next question".to_string()]
            }
            Self::Report(_) => vec!["Retry report generation".to_string()],
            Self::SubmitInFlight => vec!["Wait for the pending answer to finish".to_string()],
            Self::AnswerShapeMismatch { .. } => vec![
                "Answer multiple-choice questions with selections and all others with text"
                    .to_string(),
            ],
            _ => vec!["Restart the assessment".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::QuestionService(_) => ErrorCategory::QuestionService,
            Self::Report(_) => ErrorCategory::ReportService,
            Self::SubmitInFlight => ErrorCategory::Concurrency,
            _ => ErrorCategory::Invariant,
        }
    }
}

impl UserFriendlyError for DriverError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::SimulatorExhausted { .. } => Some(
                "Neither the primary nor the fallback provider produced an answer; nothing was submitted."
                    .to_string(),
            ),
            Self::Session(inner) => inner.context(),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::SimulatorExhausted { .. } => vec![
                "Continue answering manually".to_string(),
                "Check simulator provider configuration and API keys".to_string(),
            ],
            Self::Session(inner) => inner.suggestions(),
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Session(inner) => inner.category(),
            Self::AlreadyRunning => ErrorCategory::Concurrency,
            _ => ErrorCategory::Simulator,
        }
    }
}

impl UserFriendlyError for AssessError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Session(e) => e.user_message(),
            Self::Driver(e) => e.user_message(),
            Self::Llm(e) => e.user_message(),
            Self::Service(e) => e.user_message(),
            Self::Io(e) => format!("i/o failure: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Session(e) => e.context(),
            Self::Driver(e) => e.context(),
            Self::Llm(e) => e.context(),
            Self::Service(e) => e.context(),
            Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Session(e) => e.suggestions(),
            Self::Driver(e) => e.suggestions(),
            Self::Llm(e) => e.suggestions(),
            Self::Service(e) => e.suggestions(),
            Self::Io(_) => vec!["Check that the output path is writable".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(e) => e.category(),
            Self::Session(e) => e.category(),
            Self::Driver(e) => e.category(),
            Self::Llm(e) => e.category(),
            Self::Service(e) => e.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

impl AssessError {
    /// Multi-line rendering for stderr, with secrets redacted.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut lines = vec![format!("Error: {}", self.user_message())];
        if let Some(context) = self.context() {
            lines.push(format!("  ({context})"));
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            lines.push(String::new());
            lines.push(format!("Next steps ({}):", self.category()));
            lines.extend(suggestions.iter().map(|s| format!("  - {s}")));
        }
        redact_error_message(&lines.join("\n"))
    }

    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        self.category().exit_code()
    }
}
