//! Question and answer model
//!
//! A [`QuestionSpec`] is what the Question Service asks; an [`Answer`] is what
//! gets recorded against it. Choice and scale questions always carry a
//! non-empty option list, text questions never do.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a question expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnswerType {
    Text,
    SingleChoice,
    MultipleChoice,
    Scale,
}

impl AnswerType {
    /// Parse the wire name used by the Question Service.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "singleChoice" => Some(Self::SingleChoice),
            "multipleChoice" => Some(Self::MultipleChoice),
            "scale" => Some(Self::Scale),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::SingleChoice => "singleChoice",
            Self::MultipleChoice => "multipleChoice",
            Self::Scale => "scale",
        }
    }

    /// Whether questions of this type must offer options.
    #[must_use]
    pub fn requires_options(self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl fmt::Display for AnswerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single question as presented to the respondent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSpec {
    pub text: String,
    pub answer_type: AnswerType,
    pub options: Option<Vec<String>>,
    pub reasoning: Option<String>,
}

/// Why a question could not be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionShapeError {
    EmptyText,
    MissingOptions(AnswerType),
}

impl fmt::Display for QuestionShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyText => write!(f, "question text is empty"),
            Self::MissingOptions(kind) => {
                write!(f, "{kind} question arrived without options")
            }
        }
    }
}

impl QuestionSpec {
    /// Build a question, enforcing the options invariant.
    ///
    /// Blank options are discarded. Options sent with a text question are
    /// dropped rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns `QuestionShapeError` if the text is blank or a choice/scale
    /// question has no usable options.
    pub fn new(
        text: impl Into<String>,
        answer_type: AnswerType,
        options: Option<Vec<String>>,
        reasoning: Option<String>,
    ) -> Result<Self, QuestionShapeError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(QuestionShapeError::EmptyText);
        }

        let options = if answer_type.requires_options() {
            let cleaned: Vec<String> = options
                .unwrap_or_default()
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            if cleaned.is_empty() {
                return Err(QuestionShapeError::MissingOptions(answer_type));
            }
            Some(cleaned)
        } else {
            None
        };

        let reasoning = reasoning
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        Ok(Self {
            text,
            answer_type,
            options,
            reasoning,
        })
    }

    /// A free-text question.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            answer_type: AnswerType::Text,
            options: None,
            reasoning: None,
        }
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }
}

/// A recorded answer: one string, or the selections of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    Selections(Vec<String>),
}

impl Answer {
    /// True when nothing meaningful was answered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Selections(items) => items.iter().all(|s| s.trim().is_empty()),
        }
    }

    /// Multiple-choice questions take selections; every other type takes text.
    #[must_use]
    pub fn fits(&self, answer_type: AnswerType) -> bool {
        matches!(self, Self::Selections(_)) == (answer_type == AnswerType::MultipleChoice)
    }

    /// Turn free text (typed by a person or generated by a simulator) into
    /// the answer shape the question expects.
    ///
    /// Multiple-choice text is split on newlines, commas and semicolons and
    /// matched case-insensitively against the offered options. When nothing
    /// matches, the whole trimmed text is kept as a single selection.
    /// Returns `None` for empty input.
    #[must_use]
    pub fn from_text(raw: &str, question: &QuestionSpec) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if question.answer_type != AnswerType::MultipleChoice {
            return Some(Self::Text(trimmed.to_string()));
        }

        let mut selections: Vec<String> = Vec::new();
        for part in trimmed.split(['\n', ',', ';']) {
            let candidate = part.trim().trim_start_matches(['-', '*', '•']).trim();
            if candidate.is_empty() {
                continue;
            }
            if let Some(option) = question
                .options()
                .iter()
                .find(|o| o.eq_ignore_ascii_case(candidate))
                && !selections.contains(option)
            {
                selections.push(option.clone());
            }
        }

        if selections.is_empty() {
            selections.push(trimmed.to_string());
        }
        Some(Self::Selections(selections))
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Selections(items) => f.write_str(&items.join(", ")),
        }
    }
}
