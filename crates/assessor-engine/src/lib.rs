//! Assessment orchestration core
//!
//! Drives a respondent through AI-generated questions grouped into ordered
//! phases, records every answer in an append-only ledger, detects completion
//! and hands the transcript to the Report Service exactly once.
//!
//! Start with [`Orchestrator`] and [`SessionHandle`].

mod driver;
mod handle;
mod ledger;
mod persona;
mod phase;
mod question;
mod report;
mod session;
mod simulator;
mod source;

pub mod services;

pub use driver::{AutoCompleteOutcome, AutoCompleteState};
pub use handle::{Orchestrator, SessionHandle, SessionView};
pub use ledger::{HistoryEntry, HistoryLedger};
pub use persona::{Persona, PersonaProfile};
pub use phase::{EndOfPhases, PhaseSequencer};
pub use question::{Answer, AnswerType, QuestionShapeError, QuestionSpec};
pub use report::{ReportArtifact, hash_history};
pub use services::{
    HttpQuestionService, HttpReportService, OverallStatus, PhaseStatus, QuestionDirective,
    QuestionResponse, QuestionService, ReportService,
};
pub use session::{AssessmentSession, CompletionReason, SessionStatus, SubmitOutcome};
pub use simulator::{PersonaAutoAnswerer, SimulatedAnswer};
pub use source::{AnswerSource, ChainPosition};

pub use assessor_utils::error::{DriverError, ServiceError, ServiceKind, SessionError};
