use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in the primary → fallback simulator chain that produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPosition {
    Primary,
    Fallback,
}

/// How an answer was produced. Audit metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnswerSource {
    Manual,
    PrimarySimulator,
    FallbackSimulator,
    SimulatorFailed,
}

impl AnswerSource {
    /// Tag a simulator outcome: the chain position that succeeded, or `None`
    /// when both providers failed.
    #[must_use]
    pub fn from_chain(position: Option<ChainPosition>) -> Self {
        match position {
            Some(ChainPosition::Primary) => Self::PrimarySimulator,
            Some(ChainPosition::Fallback) => Self::FallbackSimulator,
            None => Self::SimulatorFailed,
        }
    }

    /// The only source that stops an auto-complete run.
    #[must_use]
    pub fn halts_driver(self) -> bool {
        matches!(self, Self::SimulatorFailed)
    }

    /// `SimulatorFailed` never labels a recorded answer.
    #[must_use]
    pub fn is_recordable(self) -> bool {
        !self.halts_driver()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::PrimarySimulator => "primarySimulator",
            Self::FallbackSimulator => "fallbackSimulator",
            Self::SimulatorFailed => "simulatorFailed",
        }
    }
}

impl fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
