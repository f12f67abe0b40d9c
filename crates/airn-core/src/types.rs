//! Core types for airn-core.
//!
//! This module defines the data structures shared across all pipeline stages:
//! the generic [`GenericNode`] tree, the typed records produced for callers,
//! the [`ParseOutcome`] wrapper, and the small enums that select what to build
//! ([`TargetType`]) and how hard to try ([`ParseMode`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Generic key/value tree produced by strict or lenient parsing.
///
/// `serde_json` is built with `preserve_order`, so object keys keep the order
/// in which the model emitted them.
pub type GenericNode = serde_json::Value;

// ---------------------------------------------------------------------------
// Risk level
// ---------------------------------------------------------------------------

/// Conversation risk severity, ordered `Safe < Warning < Danger`.
///
/// The order is only used to break ties during keyword inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    #[default]
    Safe,
    Warning,
    Danger,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Safe => write!(f, "SAFE"),
            RiskLevel::Warning => write!(f, "WARNING"),
            RiskLevel::Danger => write!(f, "DANGER"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Result of a conversation-analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub reply_suggestion: String,
    pub strategy_analysis: String,
    pub risk_level: RiskLevel,
}

/// Result of checking a draft message against the contact's sensitive topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyCheckResult {
    pub is_safe: bool,
    /// Deduplicated, trimmed, never contains blank entries.
    pub triggered_risks: Vec<String>,
    pub suggestion: Option<String>,
}

/// Facts and topic tags mined from a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    /// Flat string map; nested values are rendered to text during extraction.
    pub facts: BTreeMap<String, String>,
    /// Topics to avoid.
    pub red_tags: Vec<String>,
    /// Topics that land well.
    pub green_tags: Vec<String>,
}

/// Result of a draft-polishing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolishResult {
    pub polished_text: String,
    pub has_risk: bool,
    pub risk_warning: Option<String>,
}

/// Result of a reply-generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResult {
    pub suggested_reply: String,
    pub strategy_note: Option<String>,
}

/// Any record, for callers that pick the target at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnyRecord {
    Analysis(AnalysisResult),
    SafetyCheck(SafetyCheckResult),
    Extracted(ExtractedData),
    Polish(PolishResult),
    Reply(ReplyResult),
}

impl AnyRecord {
    pub fn target(&self) -> TargetType {
        match self {
            AnyRecord::Analysis(_) => TargetType::Analysis,
            AnyRecord::SafetyCheck(_) => TargetType::SafetyCheck,
            AnyRecord::Extracted(_) => TargetType::Extracted,
            AnyRecord::Polish(_) => TargetType::Polish,
            AnyRecord::Reply(_) => TargetType::Reply,
        }
    }
}

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

/// Which record a normalization call should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    Analysis,
    SafetyCheck,
    Extracted,
    Polish,
    Reply,
}

impl TargetType {
    pub const ALL: [TargetType; 5] = [
        TargetType::Analysis,
        TargetType::SafetyCheck,
        TargetType::Extracted,
        TargetType::Polish,
        TargetType::Reply,
    ];
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Analysis => write!(f, "analysis"),
            TargetType::SafetyCheck => write!(f, "safety-check"),
            TargetType::Extracted => write!(f, "extracted"),
            TargetType::Polish => write!(f, "polish"),
            TargetType::Reply => write!(f, "reply"),
        }
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "analysis" => Ok(TargetType::Analysis),
            "safety-check" | "safety" => Ok(TargetType::SafetyCheck),
            "extracted" | "extracted-data" | "extract" => Ok(TargetType::Extracted),
            "polish" => Ok(TargetType::Polish),
            "reply" => Ok(TargetType::Reply),
            other => Err(format!("unknown target type: {other}")),
        }
    }
}

/// How many fallback tiers a call may use.
///
/// | Mode          | Tiers            | Structural strategies |
/// |---------------|------------------|-----------------------|
/// | `Standard`    | strict, lenient  | no                    |
/// | `Fallback`    | all four         | no                    |
/// | `Intelligent` | all four         | yes                   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    Standard,
    Fallback,
    #[default]
    Intelligent,
}

impl ParseMode {
    /// Whether the heuristic raw-text tier may run.
    pub fn allows_heuristic(self) -> bool {
        !matches!(self, ParseMode::Standard)
    }

    /// Whether list-shaped and nested-object extraction strategies are enabled.
    pub fn structural_strategies(self) -> bool {
        matches!(self, ParseMode::Intelligent)
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::Standard => write!(f, "standard"),
            ParseMode::Fallback => write!(f, "fallback"),
            ParseMode::Intelligent => write!(f, "intelligent"),
        }
    }
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(ParseMode::Standard),
            "fallback" => Ok(ParseMode::Fallback),
            "intelligent" => Ok(ParseMode::Intelligent),
            other => Err(format!("unknown parse mode: {other}")),
        }
    }
}

/// One attempt level in the fallback cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Strict,
    Lenient,
    Heuristic,
    Default,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Strict => write!(f, "strict"),
            Tier::Lenient => write!(f, "lenient"),
            Tier::Heuristic => write!(f, "heuristic"),
            Tier::Default => write!(f, "default"),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Tagged result of a normalization call. Every variant carries a usable record.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// Strict parsing succeeded without heuristics.
    Success(T),
    /// Lenient or heuristic recovery was needed; `warnings` says what was done.
    Recovered { value: T, warnings: Vec<String> },
    /// Nothing could be recovered; `value` is the canned default.
    DefaultUsed { value: T, reason: String },
}

/// Discriminant of a [`ParseOutcome`], handy for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeTag {
    Success,
    Recovered,
    DefaultUsed,
}

impl fmt::Display for OutcomeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeTag::Success => write!(f, "success"),
            OutcomeTag::Recovered => write!(f, "recovered"),
            OutcomeTag::DefaultUsed => write!(f, "default_used"),
        }
    }
}

impl<T> ParseOutcome<T> {
    pub fn tag(&self) -> OutcomeTag {
        match self {
            ParseOutcome::Success(_) => OutcomeTag::Success,
            ParseOutcome::Recovered { .. } => OutcomeTag::Recovered,
            ParseOutcome::DefaultUsed { .. } => OutcomeTag::DefaultUsed,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            ParseOutcome::Success(value)
            | ParseOutcome::Recovered { value, .. }
            | ParseOutcome::DefaultUsed { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            ParseOutcome::Success(value)
            | ParseOutcome::Recovered { value, .. }
            | ParseOutcome::DefaultUsed { value, .. } => value,
        }
    }

    /// Warnings of a `Recovered` outcome; empty otherwise.
    pub fn warnings(&self) -> &[String] {
        match self {
            ParseOutcome::Recovered { warnings, .. } => warnings,
            _ => &[],
        }
    }

    /// Reason of a `DefaultUsed` outcome.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ParseOutcome::DefaultUsed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ParseOutcome::DefaultUsed { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ParseOutcome<U> {
        match self {
            ParseOutcome::Success(value) => ParseOutcome::Success(f(value)),
            ParseOutcome::Recovered { value, warnings } => ParseOutcome::Recovered {
                value: f(value),
                warnings,
            },
            ParseOutcome::DefaultUsed { value, reason } => ParseOutcome::DefaultUsed {
                value: f(value),
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_orders_by_severity() {
        assert!(RiskLevel::Safe < RiskLevel::Warning);
        assert!(RiskLevel::Warning < RiskLevel::Danger);
        assert_eq!(RiskLevel::default(), RiskLevel::Safe);
    }

    #[test]
    fn records_serialize_with_canonical_names() {
        let record = AnalysisResult {
            reply_suggestion: "hi".into(),
            strategy_analysis: "calm".into(),
            risk_level: RiskLevel::Warning,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["replySuggestion"], "hi");
        assert_eq!(json["riskLevel"], "WARNING");
    }

    #[test]
    fn parse_mode_round_trips_through_str() {
        for mode in [ParseMode::Standard, ParseMode::Fallback, ParseMode::Intelligent] {
            assert_eq!(mode.to_string().parse::<ParseMode>(), Ok(mode));
        }
        assert!("psychic".parse::<ParseMode>().is_err());
    }

    #[test]
    fn target_type_accepts_aliases() {
        assert_eq!("safety_check".parse(), Ok(TargetType::SafetyCheck));
        assert_eq!("Extracted-Data".parse(), Ok(TargetType::Extracted));
    }

    #[test]
    fn outcome_accessors() {
        let outcome = ParseOutcome::Recovered {
            value: 3,
            warnings: vec!["lenient".into()],
        };
        assert_eq!(outcome.tag(), OutcomeTag::Recovered);
        assert_eq!(outcome.warnings(), ["lenient".to_string()]);
        assert_eq!(outcome.reason(), None);
        assert_eq!(outcome.map(|v| v * 2).into_value(), 6);
    }
}
