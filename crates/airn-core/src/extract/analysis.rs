//! Field extraction for [`AnalysisResult`].

use super::coerce::{infer_risk_level, parse_risk_level, risk_from_value};
use super::{
    direct, entry_text, nested, render_text, string_leaves, text_of, unresolved, Extracted,
    Extraction, FieldSource, FieldSpec, Record, Resolved,
};
use crate::heuristic::plain_text;
use crate::types::{AnalysisResult, AnyRecord, GenericNode, RiskLevel, TargetType};
use serde_json::Value;

pub const REPLY: FieldSpec = FieldSpec::required(
    "replySuggestion",
    &[
        "suggested_response",
        "reply",
        "response",
        "answer",
        "recommended_response",
        "recommendation",
        "suggestion",
    ],
);

pub const STRATEGY: FieldSpec = FieldSpec::optional(
    "strategyAnalysis",
    &["strategy", "analysis_result", "analysis", "insights", "summary", "assessment"],
);

pub const RISK: FieldSpec = FieldSpec::optional("riskLevel", &["risk_level", "risk", "severity"]);

/// Keys that hold a list of reply candidates.
const REPLY_LISTS: &[&str] = &[
    "replySuggestion",
    "response_suggestions",
    "suggestions",
    "replySuggestions",
    "recommendations",
    "replies",
];

/// Keys that hold a list of analysis points.
const STRATEGY_LISTS: &[&str] = &["strategyAnalysis", "points", "insights", "analysis_points", "key_points"];

const STATE_KEYS: &[&str] = &["emotion", "emotional_state", "mood", "情绪"];
const INTENT_KEYS: &[&str] = &[
    "intention",
    "potential_intent",
    "underlying_intention",
    "underlying_intentions",
    "intent",
    "意图",
];
const RISK_KEYS: &[&str] = &["risk", "risks", "risk_assessment", "风险"];

// ---------------------------------------------------------------------------
// replySuggestion
// ---------------------------------------------------------------------------

pub fn reply_suggestion(node: &GenericNode, cx: &Extraction<'_>) -> Resolved<String> {
    direct(node, &REPLY, text_of)
        .or_else(|| cx.structural.then(|| reply_from_lists(node)).flatten())
        .or_else(|| cx.structural.then(|| reply_from_nested(node)).flatten())
        .unwrap_or_else(|| {
            Resolved::new(
                cx.config.placeholders.reply_suggestion.clone(),
                unresolved(node, REPLY.name),
            )
        })
}

fn reply_from_lists(node: &GenericNode) -> Option<Resolved<String>> {
    REPLY_LISTS.iter().find_map(|key| {
        let items = node.get(*key)?.as_array()?;
        pick_suggestion(items).map(|text| Resolved::new(text, FieldSource::List(key.to_string())))
    })
}

/// The `priority: "high"` entry if there is one, else the first usable entry.
pub fn pick_suggestion(items: &[Value]) -> Option<String> {
    let high = items.iter().find(|item| {
        item.get("priority")
            .and_then(Value::as_str)
            .is_some_and(|p| p.trim().eq_ignore_ascii_case("high") || p.trim() == "高")
    });
    high.and_then(entry_text)
        .or_else(|| items.iter().find_map(entry_text))
}

fn reply_from_nested(node: &GenericNode) -> Option<Resolved<String>> {
    const PATHS: &[(&str, &[&str])] = &[
        ("response_suggestions", &["recommended_response", "immediate_response", "alternative_responses"]),
        ("suggestions", &["recommended_response", "immediate_response", "alternative_responses"]),
        ("analysis", &["replySuggestion", "reply", "suggested_response"]),
    ];
    PATHS.iter().find_map(|(parent, children)| {
        let (value, source) = nested(node, parent, children)?;
        let text = match value {
            Value::Array(items) => pick_suggestion(items),
            other => text_of(other),
        }?;
        Some(Resolved::new(text, source))
    })
}

// ---------------------------------------------------------------------------
// strategyAnalysis
// ---------------------------------------------------------------------------

pub fn strategy_analysis(node: &GenericNode, cx: &Extraction<'_>) -> Resolved<String> {
    direct(node, &STRATEGY, text_of)
        .or_else(|| cx.structural.then(|| strategy_from_lists(node)).flatten())
        .or_else(|| cx.structural.then(|| strategy_from_nested(node)).flatten())
        .unwrap_or_else(|| {
            Resolved::new(
                cx.config.placeholders.strategy_analysis.clone(),
                unresolved(node, STRATEGY.name),
            )
        })
}

fn strategy_from_lists(node: &GenericNode) -> Option<Resolved<String>> {
    STRATEGY_LISTS.iter().find_map(|key| {
        let items = node.get(*key).filter(|v| v.is_array())?;
        let text = render_text(items)?;
        Some(Resolved::new(text, FieldSource::List(key.to_string())))
    })
}

fn strategy_from_nested(node: &GenericNode) -> Option<Resolved<String>> {
    if let Some((value, source)) = nested(node, "analysis", &["strategyAnalysis", "summary"]) {
        if let Some(text) = text_of(value) {
            return Some(Resolved::new(text, source));
        }
    }
    if let Some(text) = node.get("analysis").and_then(compose_sections) {
        return Some(Resolved::new(text, FieldSource::Nested("analysis".into())));
    }
    let (value, source) = nested(node, "strategic_recommendations", &["approach_strategy"])?;
    Some(Resolved::new(render_text(value)?, source))
}

/// Labeled sections from an `analysis` object: state, intent, then risks.
///
/// Blank sub-fields are skipped; `None` when every section is blank.
pub fn compose_sections(analysis: &Value) -> Option<String> {
    let map = analysis.as_object()?;
    let section = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k).and_then(render_text));
    let sections: Vec<String> = [
        ("Emotional state", section(STATE_KEYS)),
        ("Underlying intent", section(INTENT_KEYS)),
        ("Risks", section(RISK_KEYS)),
    ]
    .into_iter()
    .filter_map(|(label, text)| text.map(|t| format!("{label}: {t}")))
    .collect();
    (!sections.is_empty()).then(|| sections.join("\n"))
}

// ---------------------------------------------------------------------------
// riskLevel
// ---------------------------------------------------------------------------

pub fn risk_level(node: &GenericNode, cx: &Extraction<'_>) -> Resolved<RiskLevel> {
    direct(node, &RISK, risk_from_value)
        .or_else(|| cx.structural.then(|| risk_from_nested(node)).flatten())
        .unwrap_or_else(|| {
            let keywords = &cx.config.keywords;
            let level = infer_risk_level(&string_leaves(node), &keywords.danger, &keywords.warning);
            Resolved::new(level, FieldSource::Inferred)
        })
}

fn risk_from_nested(node: &GenericNode) -> Option<Resolved<RiskLevel>> {
    const PATHS: &[(&str, &[&str])] = &[
        ("risk_assessment", &["level", "risk_level", "riskLevel"]),
        ("analysis", &["riskLevel", "risk_level", "risk_assessment"]),
    ];
    PATHS.iter().find_map(|(parent, children)| {
        let (value, source) = nested(node, parent, children)?;
        risk_from_value(value).map(|level| Resolved::new(level, source))
    })
}

// ---------------------------------------------------------------------------
// Record impl
// ---------------------------------------------------------------------------

impl Record for AnalysisResult {
    const TARGET: TargetType = TargetType::Analysis;
    const FIELDS: &'static [FieldSpec] = &[REPLY, STRATEGY, RISK];

    fn extract(node: &GenericNode, cx: &Extraction<'_>) -> Extracted<Self> {
        let reply = reply_suggestion(node, cx);
        let strategy = strategy_analysis(node, cx);
        let risk = risk_level(node, cx);
        Extracted {
            record: AnalysisResult {
                reply_suggestion: reply.value,
                strategy_analysis: strategy.value,
                risk_level: risk.value,
            },
            fields: vec![
                (REPLY.name, reply.source),
                (STRATEGY.name, strategy.source),
                (RISK.name, risk.source),
            ],
        }
    }

    fn from_text(raw: &str, cx: &Extraction<'_>) -> Extracted<Self> {
        let p = cx.patterns;
        let placeholders = &cx.config.placeholders;

        let reply = p
            .text(raw, REPLY.name)
            .map(|t| Resolved::new(t, FieldSource::Pattern))
            .unwrap_or_else(|| Resolved::new(placeholders.reply_suggestion.clone(), FieldSource::Default));
        let strategy = p
            .text(raw, STRATEGY.name)
            .map(|t| Resolved::new(t, FieldSource::Pattern))
            .unwrap_or_else(|| Resolved::new(placeholders.strategy_analysis.clone(), FieldSource::Default));
        let risk = p
            .scalar(raw, RISK.name)
            .and_then(|token| parse_risk_level(&token))
            .map(|level| Resolved::new(level, FieldSource::Pattern))
            .unwrap_or_else(|| {
                let keywords = &cx.config.keywords;
                Resolved::new(
                    infer_risk_level(raw, &keywords.danger, &keywords.warning),
                    FieldSource::Inferred,
                )
            });

        Extracted {
            record: AnalysisResult {
                reply_suggestion: reply.value,
                strategy_analysis: strategy.value,
                risk_level: risk.value,
            },
            fields: vec![
                (REPLY.name, reply.source),
                (STRATEGY.name, strategy.source),
                (RISK.name, risk.source),
            ],
        }
    }

    fn fallback(raw: &str, cx: &Extraction<'_>) -> Self {
        let placeholders = &cx.config.placeholders;
        let excerpt = plain_text(raw);
        AnalysisResult {
            reply_suggestion: placeholders.reply_suggestion.clone(),
            strategy_analysis: if excerpt.is_empty() {
                placeholders.strategy_analysis.clone()
            } else {
                excerpt
            },
            risk_level: RiskLevel::Safe,
        }
    }

    fn adopt(&mut self, donor: &Self, field: &str) {
        match field {
            "replySuggestion" => self.reply_suggestion = donor.reply_suggestion.clone(),
            "strategyAnalysis" => self.strategy_analysis = donor.strategy_analysis.clone(),
            "riskLevel" => self.risk_level = donor.risk_level,
            _ => {}
        }
    }

    fn into_any(self) -> AnyRecord {
        AnyRecord::Analysis(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
