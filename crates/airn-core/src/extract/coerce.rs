//! Loose conversions for stringly-typed model output.

use super::contains_any;
use crate::types::RiskLevel;
use phf::{phf_map, phf_set};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Static token tables
// ---------------------------------------------------------------------------

static TRUE_TOKENS: phf::Set<&'static str> = phf_set! {
    "true", "yes", "y", "on", "1", "是", "是的", "对", "真",
};

static FALSE_TOKENS: phf::Set<&'static str> = phf_set! {
    "false", "no", "n", "off", "0", "否", "不", "不是", "假",
};

/// Whole-token risk spellings, checked before containment.
static RISK_TOKENS: phf::Map<&'static str, RiskLevel> = phf_map! {
    "safe" => RiskLevel::Safe,
    "unsafe" => RiskLevel::Danger,
    "not safe" => RiskLevel::Danger,
    "不安全" => RiskLevel::Danger,
    "low" => RiskLevel::Safe,
    "none" => RiskLevel::Safe,
    "安全" => RiskLevel::Safe,
    "低" => RiskLevel::Safe,
    "无" => RiskLevel::Safe,
    "warning" => RiskLevel::Warning,
    "medium" => RiskLevel::Warning,
    "moderate" => RiskLevel::Warning,
    "caution" => RiskLevel::Warning,
    "警告" => RiskLevel::Warning,
    "注意" => RiskLevel::Warning,
    "中" => RiskLevel::Warning,
    "danger" => RiskLevel::Danger,
    "dangerous" => RiskLevel::Danger,
    "high" => RiskLevel::Danger,
    "critical" => RiskLevel::Danger,
    "危险" => RiskLevel::Danger,
    "高" => RiskLevel::Danger,
    "0" => RiskLevel::Safe,
    "1" => RiskLevel::Warning,
    "2" => RiskLevel::Danger,
};

/// Negated phrases, checked before the plain markers they contain.
const NEGATED_MARKERS: &[(&str, RiskLevel)] = &[
    ("unsafe", RiskLevel::Danger),
    ("not safe", RiskLevel::Danger),
    ("不安全", RiskLevel::Danger),
    ("not high", RiskLevel::Safe),
    ("not dangerous", RiskLevel::Safe),
    ("不高", RiskLevel::Safe),
    ("不大", RiskLevel::Safe),
    ("不危险", RiskLevel::Safe),
    ("没有危险", RiskLevel::Safe),
    ("无危险", RiskLevel::Safe),
];

// ASCII markers match whole words; CJK markers match as substrings and are
// never a single character ("中" and "无" are too common to mean anything).
const DANGER_MARKERS: &[&str] = &["danger", "dangerous", "high", "critical", "severe", "危险", "高风险", "风险高", "严重"];
const WARNING_MARKERS: &[&str] = &["warn", "warning", "medium", "moderate", "caution", "警告", "注意", "中风险", "中等", "谨慎"];
const SAFE_MARKERS: &[&str] = &["safe", "low", "none", "安全", "低风险", "风险低", "无风险"];

// ---------------------------------------------------------------------------
// Booleans
// ---------------------------------------------------------------------------

/// Boolean literals, `"true"`/`"false"` in any case, the localized yes/no
/// pair and the numbers 1/0. Anything else is `None`.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 1.0 => Some(true),
            Some(f) if f == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => bool_token(s),
        _ => None,
    }
}

pub fn bool_token(text: &str) -> Option<bool> {
    let token = text.trim().trim_matches(['"', '\'']).to_lowercase();
    if TRUE_TOKENS.contains(token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(token.as_str()) {
        Some(false)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Risk level
// ---------------------------------------------------------------------------

/// Parse an explicit risk value: enum names, severity words, 0/1/2.
///
/// After whole tokens come negated phrases, then markers, danger first, so
/// `"HIGH - be careful"` is `Danger` and `"风险不高"` is `Safe`.
pub fn parse_risk_level(text: &str) -> Option<RiskLevel> {
    let token = text.trim().trim_matches(['"', '\'']).to_lowercase();
    if token.is_empty() {
        return None;
    }
    if let Some(level) = RISK_TOKENS.get(token.as_str()) {
        return Some(*level);
    }
    if let Some((_, level)) = NEGATED_MARKERS.iter().find(|(phrase, _)| token.contains(phrase)) {
        return Some(*level);
    }
    [
        (DANGER_MARKERS, RiskLevel::Danger),
        (WARNING_MARKERS, RiskLevel::Warning),
        (SAFE_MARKERS, RiskLevel::Safe),
    ]
    .into_iter()
    .find(|(markers, _)| markers.iter().any(|m| has_marker(&token, m)))
    .map(|(_, level)| level)
}

fn has_marker(text: &str, marker: &str) -> bool {
    if marker.is_ascii() {
        text.split(|c: char| !c.is_ascii_alphanumeric()).any(|word| word == marker)
    } else {
        text.contains(marker)
    }
}

/// Risk level from a JSON value: strings, the numbers 0/1/2, or an object
/// carrying a `level`-like key.
pub fn risk_from_value(value: &Value) -> Option<RiskLevel> {
    match value {
        Value::String(s) => parse_risk_level(s),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(RiskLevel::Safe),
            Some(1) => Some(RiskLevel::Warning),
            Some(2) => Some(RiskLevel::Danger),
            _ => None,
        },
        Value::Object(map) => ["level", "riskLevel", "risk_level", "severity"]
            .iter()
            .find_map(|key| map.get(*key).and_then(risk_from_value)),
        _ => None,
    }
}

/// Keyword inference over free text. Danger keywords win over warning ones;
/// nothing matching means `Safe`.
pub fn infer_risk_level(text: &str, danger: &[String], warning: &[String]) -> RiskLevel {
    if contains_any(text, danger) {
        RiskLevel::Danger
    } else if contains_any(text, warning) {
        RiskLevel::Warning
    } else {
        RiskLevel::Safe
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_booleans() {
        assert_eq!(coerce_bool(&json!(true)), Some(true));
        assert_eq!(coerce_bool(&json!("FALSE")), Some(false));
        assert_eq!(coerce_bool(&json!(" yes ")), Some(true));
        assert_eq!(coerce_bool(&json!("是")), Some(true));
        assert_eq!(coerce_bool(&json!("否")), Some(false));
        assert_eq!(coerce_bool(&json!(0)), Some(false));
        assert_eq!(coerce_bool(&json!(1.0)), Some(true));
        assert_eq!(coerce_bool(&json!(2)), None);
        assert_eq!(coerce_bool(&json!("maybe")), None);
        assert_eq!(coerce_bool(&json!({"a": 1})), None);
    }

    #[test]
    fn parses_risk_tokens() {
        assert_eq!(parse_risk_level("SAFE"), Some(RiskLevel::Safe));
        assert_eq!(parse_risk_level("medium"), Some(RiskLevel::Warning));
        assert_eq!(parse_risk_level("高"), Some(RiskLevel::Danger));
        assert_eq!(parse_risk_level("2"), Some(RiskLevel::Danger));
        assert_eq!(parse_risk_level("HIGH - be careful"), Some(RiskLevel::Danger));
        assert_eq!(parse_risk_level("低风险"), Some(RiskLevel::Safe));
        assert_eq!(parse_risk_level("unknown"), None);
        assert_eq!(parse_risk_level("  "), None);
    }

    #[test]
    fn negated_risk_words() {
        assert_eq!(parse_risk_level("UNSAFE"), Some(RiskLevel::Danger));
        assert_eq!(parse_risk_level("not safe"), Some(RiskLevel::Danger));
        assert_eq!(parse_risk_level("content is unsafe"), Some(RiskLevel::Danger));
        assert_eq!(parse_risk_level("不安全"), Some(RiskLevel::Danger));
        assert_eq!(parse_risk_level("风险不高"), Some(RiskLevel::Safe));
        assert_eq!(parse_risk_level("not high at all"), Some(RiskLevel::Safe));
    }

    #[test]
    fn markers_need_whole_words() {
        assert_eq!(parse_risk_level("below threshold"), None);
        assert_eq!(parse_risk_level("无法判断"), None);
        assert_eq!(parse_risk_level("中文回复"), None);
        assert_eq!(parse_risk_level("high风险"), Some(RiskLevel::Danger));
        assert_eq!(parse_risk_level("low-key fine"), Some(RiskLevel::Safe));
        assert_eq!(parse_risk_level("中等风险"), Some(RiskLevel::Warning));
    }

    #[test]
    fn risk_from_numbers_and_objects() {
        assert_eq!(risk_from_value(&json!(1)), Some(RiskLevel::Warning));
        assert_eq!(risk_from_value(&json!(7)), None);
        assert_eq!(
            risk_from_value(&json!({"level": "danger", "reason": "x"})),
            Some(RiskLevel::Danger)
        );
    }

    #[test]
    fn infers_from_keywords() {
        let danger = vec!["severe".to_string(), "立即".to_string()];
        let warning = vec!["avoid".to_string()];
        assert_eq!(infer_risk_level("a SEVERE issue", &danger, &warning), RiskLevel::Danger);
        assert_eq!(infer_risk_level("avoid this, 立即", &danger, &warning), RiskLevel::Danger);
        assert_eq!(infer_risk_level("avoid politics", &danger, &warning), RiskLevel::Warning);
        assert_eq!(infer_risk_level("all good", &danger, &warning), RiskLevel::Safe);
    }
}
