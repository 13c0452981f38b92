//! Append-only transcript of the assessment.

use serde::{Deserialize, Serialize};

use crate::question::{Answer, AnswerType, QuestionSpec};
use crate::source::AnswerSource;

/// One answered question. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub question: String,
    pub answer: Answer,
    pub phase: String,
    pub answer_type: AnswerType,
    pub options: Option<Vec<String>>,
    pub reasoning: Option<String>,
    pub source: AnswerSource,
}

impl HistoryEntry {
    /// Record `answer` against `question` asked during `phase`.
    #[must_use]
    pub fn record(
        question: &QuestionSpec,
        answer: Answer,
        phase: impl Into<String>,
        source: AnswerSource,
    ) -> Self {
        Self {
            question: question.text.clone(),
            answer,
            phase: phase.into(),
            answer_type: question.answer_type,
            options: question.options.clone(),
            reasoning: question.reasoning.clone(),
            source,
        }
    }
}

/// Ordered history. Only `append` grows it; nothing shrinks or edits it.
/// Reads hand out copies.
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and return the new length.
    pub fn append(&mut self, entry: HistoryEntry) -> usize {
        self.entries.push(entry);
        self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the first `n` entries (fewer if the ledger is shorter).
    #[must_use]
    pub fn slice(&self, n: usize) -> Vec<HistoryEntry> {
        self.entries[..n.min(self.entries.len())].to_vec()
    }

    /// Copy of every entry.
    #[must_use]
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.clone()
    }

    /// Borrowed view for request bodies built while the session is locked.
    #[must_use]
    pub fn as_slice(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Exact-text match against every question already asked.
    #[must_use]
    pub fn contains_question(&self, text: &str) -> bool {
        self.entries.iter().any(|e| e.question == text)
    }
}
