//! Heuristic raw-text extraction for the third fallback tier.
//!
//! When no parser produces an object, values are pulled straight out of the
//! response text. [`Patterns`] holds one compiled regex set per field, built
//! from every spelling the field is known by (canonical name, synonym table
//! entries, record aliases):
//!
//! | Pattern  | Matches                                   |
//! |----------|-------------------------------------------|
//! | `string` | `"name": "value"`, `'name': 'value'`      |
//! | `scalar` | `name: true`, `"name": DANGER`            |
//! | `list`   | `"name": ["a", "b"]`                      |
//! | `object` | `"name": {"k": "v"}`                      |
//! | `line`   | `**name**：value` and other prose lines   |
//!
//! Patterns are compiled once per [`Normalizer`](crate::Normalizer).

use crate::error::Result;
use crate::extract::{coerce, string_list, FieldSpec, Record};
use crate::lenient::parse_lenient;
use crate::synonyms::SynonymTable;
use crate::types::{
    AnalysisResult, ExtractedData, GenericNode, PolishResult, ReplyResult, SafetyCheckResult,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Longest raw-text excerpt used as a record's text field.
pub const MAX_EXCERPT_CHARS: usize = 500;

/// Keys must not continue a longer identifier.
const KEY_PREFIX: &str = r"(?:^|[^\p{L}\p{N}_])";

static RISK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)(?:风险|雷区|问题|issue|risk)s?\s*[:：]\s*([^\n]+)").expect("static regex")
});

static BULLET_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:[-*•]|\d+[.)、])\s*(.+?)\s*$").expect("static regex")
});

static KEY_VALUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:[-*•]\s*)?([^\s:：,，"'{}\[\]]{1,24})\s*[:：]\s*(.+?)\s*$"#)
        .expect("static regex")
});

static FENCE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*```.*$").expect("static regex"));

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*#+\s*").expect("static regex"));

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));

// ---------------------------------------------------------------------------
// Field patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct FieldPatterns {
    string: Regex,
    scalar: Regex,
    list: Regex,
    object: Regex,
    line: Regex,
}

impl FieldPatterns {
    fn compile(spellings: &[String]) -> Result<Self> {
        let mut escaped: Vec<String> = spellings.iter().map(|s| regex::escape(s)).collect();
        escaped.sort_by_key(|s| std::cmp::Reverse(s.len()));
        let alt = escaped.join("|");
        let key = format!(r#"(?i){KEY_PREFIX}["'“]?(?:{alt})["'”]?(?:\*\*|】)?\s*[:：=]\s*"#);

        Ok(Self {
            string: Regex::new(&format!(
                r#"{key}(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)'|“([^”]*)”)"#
            ))?,
            scalar: Regex::new(&format!(r#"{key}["']?([^,"'}}\]\n]+)"#))?,
            list: Regex::new(&format!(r#"{key}(\[[^\]]*\]?)"#))?,
            object: Regex::new(&format!(r#"{key}(\{{[^}}]*\}}?)"#))?,
            line: Regex::new(&format!(
                r#"(?im)^[\s>*#\-•\d.、)【\[]*(?:\*\*)?(?:{alt})(?:\*\*|】|\])?\s*[:：]\s*(.+?)\s*$"#
            ))?,
        })
    }
}

/// Compiled raw-text patterns for every record field.
#[derive(Debug, Clone)]
pub struct Patterns {
    fields: HashMap<&'static str, FieldPatterns>,
}

impl Patterns {
    /// Compile patterns for the fields of every record type.
    pub fn new(table: &SynonymTable) -> Result<Self> {
        let specs = [
            AnalysisResult::FIELDS,
            SafetyCheckResult::FIELDS,
            ExtractedData::FIELDS,
            PolishResult::FIELDS,
            ReplyResult::FIELDS,
        ];
        let mut fields = HashMap::new();
        for spec in specs.into_iter().flatten() {
            let spellings = spellings(table, spec);
            fields.insert(spec.name, FieldPatterns::compile(&spellings)?);
        }
        Ok(Self { fields })
    }

    /// Quoted value, else the rest of a prose `name: value` line.
    pub fn text(&self, raw: &str, field: &str) -> Option<String> {
        let set = self.fields.get(field)?;
        set.string
            .captures_iter(raw)
            .find_map(|caps| {
                let quoted = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
                let text = unescape(quoted.as_str());
                (!text.trim().is_empty()).then(|| text.trim().to_string())
            })
            .or_else(|| {
                set.line.captures_iter(raw).find_map(|caps| {
                    let text = tidy_line(caps.get(1)?.as_str());
                    (!text.is_empty()).then_some(text)
                })
            })
    }

    /// Unquoted or quoted single token after `name:`.
    pub fn scalar(&self, raw: &str, field: &str) -> Option<String> {
        let set = self.fields.get(field)?;
        set.scalar.captures_iter(raw).find_map(|caps| {
            let token = caps.get(1)?.as_str().trim();
            (!token.is_empty()).then(|| token.to_string())
        })
    }

    /// Items of a `name: [...]` array (closed or not).
    pub fn list(&self, raw: &str, field: &str) -> Option<Vec<String>> {
        let set = self.fields.get(field)?;
        let caps = set.list.captures(raw)?;
        let parsed = parse_lenient(caps.get(1)?.as_str()).ok()?;
        string_list(&parsed.node)
    }

    /// A flat `name: {...}` object, parsed leniently.
    pub fn object(&self, raw: &str, field: &str) -> Option<GenericNode> {
        let set = self.fields.get(field)?;
        let caps = set.object.captures(raw)?;
        let parsed = parse_lenient(caps.get(1)?.as_str()).ok()?;
        parsed.node.is_object().then_some(parsed.node)
    }

    /// Boolean after `name:`.
    pub fn boolean(&self, raw: &str, field: &str) -> Option<bool> {
        self.scalar(raw, field).and_then(|token| coerce::bool_token(&token))
    }
}

/// Canonical name, table synonyms and record aliases, deduplicated.
pub fn spellings(table: &SynonymTable, spec: &FieldSpec) -> Vec<String> {
    let mut out = vec![spec.name.to_string()];
    let synonyms = table.synonyms_of(spec.name).unwrap_or_default();
    for spelling in synonyms.iter().map(String::as_str).chain(spec.aliases.iter().copied()) {
        if !out.iter().any(|s| s == spelling) {
            out.push(spelling.to_string());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Free-text scans
// ---------------------------------------------------------------------------

/// Values of `risk: ...` / `风险：...` lines.
pub fn risk_lines(raw: &str) -> Vec<String> {
    RISK_LINE
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).map(|m| tidy_line(m.as_str())))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Bulleted or numbered list items.
pub fn bullet_items(raw: &str) -> Vec<String> {
    BULLET_LINE
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).map(|m| tidy_line(m.as_str())))
        .filter(|s| !s.is_empty())
        .collect()
}

/// `key: value` lines as pairs, keys and values tidied.
pub fn key_value_lines(raw: &str) -> Vec<(String, String)> {
    KEY_VALUE_LINE
        .captures_iter(raw)
        .filter_map(|caps| {
            let key = tidy_line(caps.get(1)?.as_str());
            let value = tidy_line(caps.get(2)?.as_str());
            (!key.is_empty() && !value.is_empty()).then_some((key, value))
        })
        .collect()
}

/// The response with fences, heading markers and bold markers removed,
/// capped at [`MAX_EXCERPT_CHARS`].
pub fn plain_text(raw: &str) -> String {
    let text = FENCE_LINE.replace_all(raw, "");
    let text = HEADING.replace_all(&text, "");
    let text = text.replace("**", "");
    let text = BLANK_RUN.replace_all(text.trim(), "\n\n");
    text.chars().take(MAX_EXCERPT_CHARS).collect::<String>().trim().to_string()
}

/// Strip markdown emphasis, wrapping quotes and trailing separators.
fn tidy_line(line: &str) -> String {
    line.trim()
        .trim_matches(|c: char| matches!(c, '*' | '"' | '\'' | '“' | '”' | '`'))
        .trim_end_matches([',', '，', ';', '；'])
        .trim()
        .to_string()
}

fn unescape(quoted: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{quoted}\"")).unwrap_or_else(|_| quoted.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
