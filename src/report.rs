//! Serializable summary of one normalization call.

use airn_core::{AnyRecord, OutcomeTag, ParseMode, ParseOutcome, TargetType};
use serde::Serialize;

/// What the `airn` binary prints: the record plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub target: String,
    pub mode: String,
    pub outcome: OutcomeTag,
    pub record: AnyRecord,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Report {
    pub fn new(target: TargetType, mode: ParseMode, outcome: ParseOutcome<AnyRecord>) -> Self {
        let tag = outcome.tag();
        let warnings = outcome.warnings().to_vec();
        let reason = outcome.reason().map(str::to_string);
        Self {
            target: target.to_string(),
            mode: mode.to_string(),
            outcome: tag,
            record: outcome.into_value(),
            warnings,
            reason,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        let head = format!("{} via {}: {}", self.target, self.mode, self.outcome);
        match (&self.reason, self.warnings.len()) {
            (Some(reason), _) => format!("{head} ({reason})"),
            (None, 0) => head,
            (None, n) => format!("{head} with {n} warning(s)"),
        }
    }
}
