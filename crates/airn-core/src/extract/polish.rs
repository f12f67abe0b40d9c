//! Field extraction for [`PolishResult`] and [`ReplyResult`].
//!
//! Both records are mostly one block of prose, so the raw-text tier falls back
//! to the cleaned response itself when no labelled value is found.

use super::analysis::pick_suggestion;
use super::coerce::coerce_bool;
use super::{
    direct, nested, text_of, unresolved, Extracted, Extraction, FieldSource, FieldSpec, Record,
    Resolved,
};
use crate::heuristic::plain_text;
use crate::types::{AnyRecord, GenericNode, PolishResult, ReplyResult, TargetType};
use serde_json::Value;

pub const POLISHED_TEXT: FieldSpec = FieldSpec::required(
    "polishedText",
    &["polished_text", "text", "result", "content", "rewritten", "optimized_text", "revised"],
);

pub const HAS_RISK: FieldSpec = FieldSpec::optional("hasRisk", &["has_risk", "risk", "risky"]);

pub const RISK_WARNING: FieldSpec = FieldSpec::optional(
    "riskWarning",
    &["risk_warning", "warning", "risk_note", "warnings"],
);

pub const SUGGESTED_REPLY: FieldSpec = FieldSpec::required(
    "suggestedReply",
    &["suggested_reply", "reply", "response", "answer", "replySuggestion", "text", "content"],
);

pub const STRATEGY_NOTE: FieldSpec = FieldSpec::optional(
    "strategyNote",
    &["strategy_note", "strategy", "note", "explanation", "reason", "strategyAnalysis"],
);

/// Keys that hold a list of reply options.
const REPLY_LISTS: &[&str] = &["suggestedReply", "replies", "suggestions", "options", "candidates"];

/// Wrapper objects some models put the payload in.
const WRAPPERS: &[&str] = &["result", "data", "output"];

/// Text from the first wrapper object holding one of `children`.
fn wrapped_text(node: &GenericNode, children: &[&str]) -> Option<Resolved<String>> {
    WRAPPERS.iter().find_map(|parent| {
        let (value, source) = nested(node, parent, children)?;
        text_of(value).map(|t| Resolved::new(t, source))
    })
}

fn optional_text(node: &GenericNode, spec: &FieldSpec) -> Resolved<Option<String>> {
    direct(node, spec, text_of)
        .map(|r| Resolved::new(Some(r.value), r.source))
        .unwrap_or_else(|| Resolved::new(None, unresolved(node, spec.name)))
}

/// The cleaned response as a text field, or the placeholder.
fn excerpt_or(raw: &str, placeholder: &str) -> Resolved<String> {
    let text = plain_text(raw);
    if text.is_empty() {
        Resolved::new(placeholder.to_string(), FieldSource::Default)
    } else {
        Resolved::new(text, FieldSource::RawText)
    }
}

// ---------------------------------------------------------------------------
// PolishResult
// ---------------------------------------------------------------------------

pub fn polished_text(node: &GenericNode, cx: &Extraction<'_>) -> Resolved<String> {
    direct(node, &POLISHED_TEXT, text_of)
        .or_else(|| {
            cx.structural
                .then(|| wrapped_text(node, &["polishedText", "polished_text", "text", "content"]))
                .flatten()
        })
        .unwrap_or_else(|| {
            Resolved::new(
                cx.config.placeholders.polished_text.clone(),
                unresolved(node, POLISHED_TEXT.name),
            )
        })
}

/// Explicit flag, else `true` when a warning is present, else `false`.
pub fn has_risk(node: &GenericNode, warning: &Option<String>) -> Resolved<bool> {
    direct(node, &HAS_RISK, |value| match value {
        Value::Bool(b) => Some(*b),
        _ => None,
    })
    .or_else(|| {
        direct(node, &HAS_RISK, coerce_bool).map(|r| Resolved::new(r.value, FieldSource::Coerced))
    })
    .unwrap_or_else(|| match warning {
        Some(_) => Resolved::new(true, FieldSource::Inferred),
        None => Resolved::new(false, unresolved(node, HAS_RISK.name)),
    })
}

fn assemble_polish(
    text: Resolved<String>,
    risk: Resolved<bool>,
    warning: Resolved<Option<String>>,
) -> Extracted<PolishResult> {
    Extracted {
        record: PolishResult {
            polished_text: text.value,
            has_risk: risk.value,
            risk_warning: warning.value,
        },
        fields: vec![
            (POLISHED_TEXT.name, text.source),
            (HAS_RISK.name, risk.source),
            (RISK_WARNING.name, warning.source),
        ],
    }
}

impl Record for PolishResult {
    const TARGET: TargetType = TargetType::Polish;
    const FIELDS: &'static [FieldSpec] = &[POLISHED_TEXT, HAS_RISK, RISK_WARNING];

    fn extract(node: &GenericNode, cx: &Extraction<'_>) -> Extracted<Self> {
        let text = polished_text(node, cx);
        let warning = optional_text(node, &RISK_WARNING);
        let risk = has_risk(node, &warning.value);
        assemble_polish(text, risk, warning)
    }

    fn from_text(raw: &str, cx: &Extraction<'_>) -> Extracted<Self> {
        let p = cx.patterns;
        let text = p
            .text(raw, POLISHED_TEXT.name)
            .map(|t| Resolved::new(t, FieldSource::Pattern))
            .unwrap_or_else(|| excerpt_or(raw, &cx.config.placeholders.polished_text));
        let warning = p
            .text(raw, RISK_WARNING.name)
            .map(|t| Resolved::new(Some(t), FieldSource::Pattern))
            .unwrap_or_else(|| Resolved::new(None, FieldSource::Default));
        let risk = match p.boolean(raw, HAS_RISK.name) {
            Some(b) => Resolved::new(b, FieldSource::Pattern),
            None if warning.value.is_some() => Resolved::new(true, FieldSource::Inferred),
            None => Resolved::new(false, FieldSource::Default),
        };
        assemble_polish(text, risk, warning)
    }

    fn fallback(raw: &str, cx: &Extraction<'_>) -> Self {
        PolishResult {
            polished_text: excerpt_or(raw, &cx.config.placeholders.polished_text).value,
            has_risk: false,
            risk_warning: None,
        }
    }

    fn adopt(&mut self, donor: &Self, field: &str) {
        match field {
            "polishedText" => self.polished_text = donor.polished_text.clone(),
            "hasRisk" => self.has_risk = donor.has_risk,
            "riskWarning" => self.risk_warning = donor.risk_warning.clone(),
            _ => {}
        }
    }

    fn into_any(self) -> AnyRecord {
        AnyRecord::Polish(self)
    }
}

// ---------------------------------------------------------------------------
// ReplyResult
// ---------------------------------------------------------------------------

pub fn suggested_reply(node: &GenericNode, cx: &Extraction<'_>) -> Resolved<String> {
    direct(node, &SUGGESTED_REPLY, text_of)
        .or_else(|| {
            if !cx.structural {
                return None;
            }
            REPLY_LISTS
                .iter()
                .find_map(|key| {
                    let items = node.get(*key)?.as_array()?;
                    pick_suggestion(items).map(|t| Resolved::new(t, FieldSource::List(key.to_string())))
                })
                .or_else(|| wrapped_text(node, &["suggestedReply", "reply", "text"]))
        })
        .unwrap_or_else(|| {
            Resolved::new(
                cx.config.placeholders.suggested_reply.clone(),
                unresolved(node, SUGGESTED_REPLY.name),
            )
        })
}

fn assemble_reply(reply: Resolved<String>, note: Resolved<Option<String>>) -> Extracted<ReplyResult> {
    Extracted {
        record: ReplyResult {
            suggested_reply: reply.value,
            strategy_note: note.value,
        },
        fields: vec![(SUGGESTED_REPLY.name, reply.source), (STRATEGY_NOTE.name, note.source)],
    }
}

impl Record for ReplyResult {
    const TARGET: TargetType = TargetType::Reply;
    const FIELDS: &'static [FieldSpec] = &[SUGGESTED_REPLY, STRATEGY_NOTE];

    fn extract(node: &GenericNode, cx: &Extraction<'_>) -> Extracted<Self> {
        assemble_reply(suggested_reply(node, cx), optional_text(node, &STRATEGY_NOTE))
    }

    fn from_text(raw: &str, cx: &Extraction<'_>) -> Extracted<Self> {
        let p = cx.patterns;
        let reply = p
            .text(raw, SUGGESTED_REPLY.name)
            .map(|t| Resolved::new(t, FieldSource::Pattern))
            .unwrap_or_else(|| excerpt_or(raw, &cx.config.placeholders.suggested_reply));
        let note = p
            .text(raw, STRATEGY_NOTE.name)
            .map(|t| Resolved::new(Some(t), FieldSource::Pattern))
            .unwrap_or_else(|| Resolved::new(None, FieldSource::Default));
        assemble_reply(reply, note)
    }

    fn fallback(raw: &str, cx: &Extraction<'_>) -> Self {
        ReplyResult {
            suggested_reply: excerpt_or(raw, &cx.config.placeholders.suggested_reply).value,
            strategy_note: None,
        }
    }

    fn adopt(&mut self, donor: &Self, field: &str) {
        match field {
            "suggestedReply" => self.suggested_reply = donor.suggested_reply.clone(),
            "strategyNote" => self.strategy_note = donor.strategy_note.clone(),
            _ => {}
        }
    }

    fn into_any(self) -> AnyRecord {
        AnyRecord::Reply(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizerConfig;
    use crate::heuristic::Patterns;
    use crate::synonyms::SynonymTable;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn with_cx<R>(structural: bool, f: impl FnOnce(&Extraction<'_>) -> R) -> R {
        let table = SynonymTable::builtin();
        let config = NormalizerConfig::defaults();
        let patterns = Patterns::new(&table).unwrap();
        f(&Extraction {
            table: &table,
            config: &config,
            patterns: &patterns,
            structural,
        })
    }

    #[test]
    fn polish_reads_canonical_fields() {
        let node = json!({"polishedText": "改好了", "hasRisk": "yes", "riskWarning": "语气略强"});
        let out = with_cx(true, |cx| PolishResult::extract(&node, cx));
        assert_eq!(out.record.polished_text, "改好了");
        assert!(out.record.has_risk);
        assert_eq!(out.source("hasRisk"), Some(&FieldSource::Coerced));
        assert!(out.missing_required().is_empty());
    }

    #[test]
    fn warning_implies_risk() {
        let node = json!({"text": "ok", "warning": "提到了收入"});
        let out = with_cx(false, |cx| PolishResult::extract(&node, cx));
        assert!(out.record.has_risk);
        assert_eq!(out.source("hasRisk"), Some(&FieldSource::Inferred));
        assert_eq!(out.source("polishedText"), Some(&FieldSource::Alias("text".into())));
    }

    #[test]
    fn wrapped_payload_needs_structural_mode() {
        let node = json!({"data": {"polished_text": "包起来的"}});
        let out = with_cx(true, |cx| PolishResult::extract(&node, cx));
        assert_eq!(out.record.polished_text, "包起来的");
        let flat = with_cx(false, |cx| PolishResult::extract(&node, cx));
        assert_eq!(flat.missing_required(), vec!["polishedText"]);
    }

    #[test]
    fn polish_from_text_uses_the_response_itself() {
        let out = with_cx(true, |cx| PolishResult::from_text("**润色后**\n今晚一起吃饭吗？", cx));
        assert_eq!(out.record.polished_text, "润色后\n今晚一起吃饭吗？");
        assert_eq!(out.source("polishedText"), Some(&FieldSource::RawText));
        assert!(!out.record.has_risk);
    }

    #[test]
    fn reply_picks_from_option_lists() {
        let node = json!({"options": [
            {"text": "A", "priority": "low"},
            {"text": "B", "priority": "high"},
        ]});
        let out = with_cx(true, |cx| ReplyResult::extract(&node, cx));
        assert_eq!(out.record.suggested_reply, "B");
        assert_eq!(out.source("suggestedReply"), Some(&FieldSource::List("options".into())));
    }

    #[test]
    fn reply_from_labelled_text() {
        let raw = "推荐回复：周末有空吗\n策略说明：轻松一点";
        let out = with_cx(true, |cx| ReplyResult::from_text(raw, cx));
        assert_eq!(out.record.suggested_reply, "周末有空吗");
        assert_eq!(out.record.strategy_note.as_deref(), Some("轻松一点"));
    }

    #[test]
    fn fallbacks_use_placeholders_for_blank_input() {
        let config = NormalizerConfig::defaults();
        let reply = with_cx(true, |cx| ReplyResult::fallback("  ", cx));
        assert_eq!(reply.suggested_reply, config.placeholders.suggested_reply);
        let polish = with_cx(true, |cx| PolishResult::fallback("原文", cx));
        assert_eq!(polish.polished_text, "原文");
    }
}
