//! Final report artifact with audit data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::HistoryEntry;

/// The report produced once per session, together with the exact transcript
/// prefix it was generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportArtifact {
    pub markdown: String,
    pub history: Vec<HistoryEntry>,
    pub generated_at: DateTime<Utc>,
    /// BLAKE3 of the JCS-canonical JSON of `history`
    pub history_hash: String,
}

impl ReportArtifact {
    #[must_use]
    pub fn new(markdown: String, history: Vec<HistoryEntry>) -> Self {
        let history_hash = hash_history(&history);
        Self {
            markdown,
            history,
            generated_at: Utc::now(),
            history_hash,
        }
    }

    /// True if `history` still hashes to the recorded value.
    #[must_use]
    pub fn verify(&self) -> bool {
        hash_history(&self.history) == self.history_hash
    }
}

/// Hash a transcript deterministically (RFC 8785 canonical JSON, then BLAKE3).
///
/// Serialization of these plain data types cannot fail; a failure hashes
/// empty input.
#[must_use]
pub fn hash_history(history: &[HistoryEntry]) -> String {
    let bytes = serde_json::to_value(history)
        .ok()
        .and_then(|value| serde_json_canonicalizer::to_vec(&value).ok())
        .unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}
