//! Persona tiers for simulated answers
//!
//! Each tier maps to a fixed profile: how it talks, which part of a 1–5
//! scale it picks from, and how many options it selects on multi-select
//! questions. The prompts below are built only from that table, so the same
//! tier always yields the same instructions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::question::{AnswerType, QuestionSpec};

/// One of three ordered maturity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Explorer,
    Enabler,
    Leader,
}

/// Fixed per-tier answering profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonaProfile {
    pub persona: Persona,
    pub vocabulary: &'static str,
    /// Inclusive sub-range of a 1–5 scale
    pub scale_range: (u8, u8),
    /// Inclusive number of selections on multiple-choice questions
    pub selection_range: (usize, usize),
}

const PROFILES: [PersonaProfile; 3] = [
    PersonaProfile {
        persona: Persona::Explorer,
        vocabulary: "Use basic, uncertain language. Practices are ad hoc and informal; \
                     admit gaps and say when something is not done yet.",
        scale_range: (1, 2),
        selection_range: (1, 2),
    },
    PersonaProfile {
        persona: Persona::Enabler,
        vocabulary: "Answer in your own words. Practices are partly established and \
                     repeatable in some teams, with known gaps being worked on.",
        scale_range: (3, 4),
        selection_range: (2, 3),
    },
    PersonaProfile {
        persona: Persona::Leader,
        vocabulary: "Answer in your own words. Practices are mature, measured and \
                     organisation-wide; give a concrete example where it helps.",
        scale_range: (4, 5),
        selection_range: (3, 5),
    },
];

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Explorer, Persona::Enabler, Persona::Leader];

    #[must_use]
    pub fn profile(self) -> &'static PersonaProfile {
        match self {
            Self::Explorer => &PROFILES[0],
            Self::Enabler => &PROFILES[1],
            Self::Leader => &PROFILES[2],
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explorer => "explorer",
            Self::Enabler => "enabler",
            Self::Leader => "leader",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explorer" => Ok(Self::Explorer),
            "enabler" => Ok(Self::Enabler),
            "leader" => Ok(Self::Leader),
            other => Err(format!(
                "unknown persona '{other}' (expected explorer, enabler or leader)"
            )),
        }
    }
}

impl PersonaProfile {
    /// The options of a scale question that fall inside this tier's range.
    ///
    /// Options are read as an ordered scale and mapped onto 1–5, so a
    /// ten-point or three-point scale gets the proportional band.
    #[must_use]
    pub fn scale_band<'a>(&self, options: &'a [String]) -> &'a [String] {
        if options.len() <= 1 {
            return options;
        }
        let last = (options.len() - 1) as f64;
        let to_index = |point: u8| ((f64::from(point) - 1.0) / 4.0 * last).round() as usize;
        let lo = to_index(self.scale_range.0);
        let hi = to_index(self.scale_range.1).min(options.len() - 1);
        &options[lo..=hi]
    }

    /// Selection count range clamped to the number of offered options.
    #[must_use]
    pub fn selection_bounds(&self, option_count: usize) -> (usize, usize) {
        let hi = self.selection_range.1.min(option_count).max(1);
        let lo = self.selection_range.0.min(hi);
        (lo, hi)
    }

    /// System prompt for the simulator.
    #[must_use]
    pub fn system_prompt(&self, industry: &str) -> String {
        format!(
            "You are answering a maturity assessment on behalf of an organisation in the \
             {industry} industry. Your organisation is at the '{persona}' maturity tier. \
             {vocabulary} Reply with the answer only: no preamble, no explanation, no markdown.",
            persona = self.persona,
            vocabulary = self.vocabulary,
        )
    }

    /// User prompt describing the question and the expected answer format.
    #[must_use]
    pub fn user_prompt(&self, question: &QuestionSpec) -> String {
        let mut prompt = format!("Question: {}\n", question.text);
        match question.answer_type {
            AnswerType::Text => {
                prompt.push_str("Answer in two or three sentences.");
            }
            AnswerType::SingleChoice => {
                prompt.push_str(&format!(
                    "Options:\n{}\nReply with exactly one option, copied verbatim.",
                    bullet_list(question.options())
                ));
            }
            AnswerType::MultipleChoice => {
                let (lo, hi) = self.selection_bounds(question.options().len());
                prompt.push_str(&format!(
                    "Options:\n{}\nSelect between {lo} and {hi} options. \
                     Reply with the chosen options copied verbatim, one per line.",
                    bullet_list(question.options())
                ));
            }
            AnswerType::Scale => {
                let band = self.scale_band(question.options());
                prompt.push_str(&format!(
                    "Scale: {}\nReply with exactly one of: {}.",
                    question.options().join(", "),
                    band.join(", ")
                ));
            }
        }
        if let Some(reasoning) = &question.reasoning {
            prompt.push_str(&format!("\nContext: {reasoning}"));
        }
        prompt
    }
}

fn bullet_list(options: &[String]) -> String {
    options
        .iter()
        .map(|o| format!("- {o}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(n: usize) -> Vec<String> {
        (1..=n).map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_profile_table_is_fixed() {
        assert_eq!(Persona::Explorer.profile().scale_range, (1, 2));
        assert_eq!(Persona::Enabler.profile().scale_range, (3, 4));
        assert_eq!(Persona::Leader.profile().scale_range, (4, 5));
        assert_eq!(Persona::Explorer.profile().selection_range, (1, 2));
        assert_eq!(Persona::Enabler.profile().selection_range, (2, 3));
        assert_eq!(Persona::Leader.profile().selection_range, (3, 5));
        for persona in Persona::ALL {
            assert_eq!(persona.profile().persona, persona);
        }
    }

    #[test]
    fn test_scale_band_on_five_point_scale() {
        let options = scale(5);
        assert_eq!(Persona::Explorer.profile().scale_band(&options), &["1", "2"]);
        assert_eq!(Persona::Enabler.profile().scale_band(&options), &["3", "4"]);
        assert_eq!(Persona::Leader.profile().scale_band(&options), &["4", "5"]);
    }

    #[test]
    fn test_scale_band_on_other_lengths() {
        let ten = scale(10);
        let band = Persona::Leader.profile().scale_band(&ten);
        assert_eq!(band.last().map(String::as_str), Some("10"));
        assert!(!band.is_empty());

        let one = scale(1);
        assert_eq!(Persona::Explorer.profile().scale_band(&one), &["1"]);
    }

    #[test]
    fn test_selection_bounds_clamped() {
        assert_eq!(Persona::Leader.profile().selection_bounds(2), (2, 2));
        assert_eq!(Persona::Leader.profile().selection_bounds(8), (3, 5));
        assert_eq!(Persona::Explorer.profile().selection_bounds(0), (1, 1));
    }

    #[test]
    fn test_prompts_are_deterministic_per_tier() {
        let question = QuestionSpec::new(
            "How mature is your data platform?",
            AnswerType::Scale,
            Some(scale(5)),
            None,
        )
        .unwrap();
        let profile = Persona::Enabler.profile();

        assert_eq!(profile.user_prompt(&question), profile.user_prompt(&question));
        assert!(profile.user_prompt(&question).contains("exactly one of: 3, 4."));
        assert!(profile.system_prompt("retail").contains("'enabler'"));
    }

    #[test]
    fn test_parse_persona() {
        assert_eq!("Leader".parse::<Persona>(), Ok(Persona::Leader));
        assert!("guru".parse::<Persona>().is_err());
    }
}
