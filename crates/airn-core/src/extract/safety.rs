//! Field extraction for [`SafetyCheckResult`].

use super::coerce::coerce_bool;
use super::{
    candidates, contains_any, direct, nested, string_list, text_of, tidy, unresolved, Extracted,
    Extraction, FieldSource, FieldSpec, Record, Resolved,
};
use crate::heuristic::risk_lines;
use crate::types::{AnyRecord, GenericNode, SafetyCheckResult, TargetType};
use serde_json::Value;

pub const IS_SAFE: FieldSpec = FieldSpec::required(
    "isSafe",
    &["safe", "is_safe", "safety", "check_result", "result", "passed"],
);

pub const TRIGGERED_RISKS: FieldSpec = FieldSpec::optional(
    "triggeredRisks",
    &["risks", "warnings", "alerts", "issues", "problems", "risk_list", "triggered"],
);

pub const SUGGESTION: FieldSpec = FieldSpec::optional(
    "suggestion",
    &["recommendation", "advice", "tip", "guidance", "revision", "suggested_revision"],
);

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// `isSafe` before the triggered-risks inference is applied.
fn explicit_is_safe(node: &GenericNode, cx: &Extraction<'_>) -> Option<Resolved<bool>> {
    let keywords = &cx.config.keywords;
    let from_value = |value: &Value, source: FieldSource| -> Option<Resolved<bool>> {
        if let Value::Bool(b) = value {
            return Some(Resolved::new(*b, source));
        }
        if let Some(b) = coerce_bool(value) {
            return Some(Resolved::new(b, FieldSource::Coerced));
        }
        // verdict words such as "不安全" / "safe"
        let text = value.as_str()?;
        if contains_any(text, &keywords.unsafe_cues) {
            Some(Resolved::new(false, FieldSource::Coerced))
        } else if contains_any(text, &keywords.safe_cues) {
            Some(Resolved::new(true, FieldSource::Coerced))
        } else {
            None
        }
    };

    candidates(node, &IS_SAFE)
        .find_map(|(value, source)| from_value(value, source))
        .or_else(|| {
            if !cx.structural {
                return None;
            }
            let (value, source) = nested(node, "check", &["isSafe", "safe", "result"])
                .or_else(|| nested(node, "result", &["isSafe", "safe"]))?;
            from_value(value, source)
        })
}

pub fn triggered_risks(node: &GenericNode, _cx: &Extraction<'_>) -> Resolved<Vec<String>> {
    direct(node, &TRIGGERED_RISKS, string_list)
        .map(|r| Resolved::new(tidy(r.value), r.source))
        .unwrap_or_else(|| Resolved::new(Vec::new(), unresolved(node, TRIGGERED_RISKS.name)))
}

pub fn suggestion(node: &GenericNode, cx: &Extraction<'_>) -> Resolved<Option<String>> {
    direct(node, &SUGGESTION, text_of)
        .or_else(|| {
            cx.structural
                .then(|| nested(node, "check", &["suggestion", "advice"]))
                .flatten()
                .and_then(|(value, source)| text_of(value).map(|t| Resolved::new(t, source)))
        })
        .map(|r| Resolved::new(Some(r.value), r.source))
        .unwrap_or_else(|| Resolved::new(None, unresolved(node, SUGGESTION.name)))
}

/// Explicit value, else `false` when risks were triggered, else `true`.
pub fn is_safe(node: &GenericNode, cx: &Extraction<'_>, risks: &[String]) -> Resolved<bool> {
    explicit_is_safe(node, cx).unwrap_or_else(|| {
        if risks.is_empty() {
            Resolved::new(true, unresolved(node, IS_SAFE.name))
        } else {
            Resolved::new(false, FieldSource::Inferred)
        }
    })
}

fn assemble(
    is_safe: Resolved<bool>,
    risks: Resolved<Vec<String>>,
    suggestion: Resolved<Option<String>>,
) -> Extracted<SafetyCheckResult> {
    Extracted {
        record: SafetyCheckResult {
            is_safe: is_safe.value,
            triggered_risks: risks.value,
            suggestion: suggestion.value,
        },
        fields: vec![
            (IS_SAFE.name, is_safe.source),
            (TRIGGERED_RISKS.name, risks.source),
            (SUGGESTION.name, suggestion.source),
        ],
    }
}

// ---------------------------------------------------------------------------
// Record impl
// ---------------------------------------------------------------------------

impl Record for SafetyCheckResult {
    const TARGET: TargetType = TargetType::SafetyCheck;
    const FIELDS: &'static [FieldSpec] = &[IS_SAFE, TRIGGERED_RISKS, SUGGESTION];

    fn extract(node: &GenericNode, cx: &Extraction<'_>) -> Extracted<Self> {
        let risks = triggered_risks(node, cx);
        let safe = is_safe(node, cx, &risks.value);
        let suggestion = suggestion(node, cx);
        assemble(safe, risks, suggestion)
    }

    fn from_text(raw: &str, cx: &Extraction<'_>) -> Extracted<Self> {
        let p = cx.patterns;
        let keywords = &cx.config.keywords;

        let risks = match p.list(raw, TRIGGERED_RISKS.name) {
            Some(items) => Resolved::new(tidy(items), FieldSource::Pattern),
            None => {
                let lines = tidy(risk_lines(raw));
                let source = if lines.is_empty() {
                    FieldSource::Default
                } else {
                    FieldSource::Pattern
                };
                Resolved::new(lines, source)
            }
        };
        let safe = match p.boolean(raw, IS_SAFE.name) {
            Some(b) => Resolved::new(b, FieldSource::Pattern),
            None if !risks.value.is_empty() || contains_any(raw, &keywords.unsafe_cues) => {
                Resolved::new(false, FieldSource::Inferred)
            }
            None if contains_any(raw, &keywords.safe_cues) => Resolved::new(true, FieldSource::Inferred),
            None => Resolved::new(true, FieldSource::Default),
        };
        let suggestion = p
            .text(raw, SUGGESTION.name)
            .map(|t| Resolved::new(Some(t), FieldSource::Pattern))
            .unwrap_or_else(|| Resolved::new(None, FieldSource::Default));
        assemble(safe, risks, suggestion)
    }

    fn fallback(_raw: &str, _cx: &Extraction<'_>) -> Self {
        SafetyCheckResult {
            is_safe: true,
            triggered_risks: Vec::new(),
            suggestion: None,
        }
    }

    fn adopt(&mut self, donor: &Self, field: &str) {
        match field {
            "isSafe" => self.is_safe = donor.is_safe,
            "triggeredRisks" => self.triggered_risks = donor.triggered_risks.clone(),
            "suggestion" => self.suggestion = donor.suggestion.clone(),
            _ => {}
        }
    }

    fn into_any(self) -> AnyRecord {
        AnyRecord::SafetyCheck(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
