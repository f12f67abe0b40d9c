//! Field extraction for [`ExtractedData`].
//!
//! Facts are flattened to a string map: non-blank strings as-is, numbers and
//! booleans by their text, lists joined with `", "`, nested objects as
//! compact JSON, nulls dropped. A list of `"key: value"` strings is split
//! into facts.

use super::{
    contains_any, direct, nested, string_list, text_of, tidy, unresolved, Extracted, Extraction,
    FieldSource, FieldSpec, Record, Resolved,
};
use crate::heuristic::{bullet_items, key_value_lines};
use crate::types::{AnyRecord, ExtractedData, GenericNode, TargetType};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const FACTS: FieldSpec = FieldSpec::optional(
    "facts",
    &["information", "profile", "user_profile", "personal_info", "extracted_facts"],
);

pub const RED_TAGS: FieldSpec = FieldSpec::optional(
    "redTags",
    &["red_flags", "redFlags", "donts", "avoid", "sensitive_topics", "red"],
);

pub const GREEN_TAGS: FieldSpec = FieldSpec::optional(
    "greenTags",
    &["green_flags", "greenFlags", "dos", "tips", "best_practices", "recommendations", "green"],
);

/// Untyped tag lists split by the red-tag keywords.
const MIXED_TAG_KEYS: &[&str] = &["tags", "labels"];

type Facts = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

/// Render one fact value; `None` drops the fact.
pub fn flatten_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(flatten_value).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Object(map) if map.is_empty() => None,
        Value::Object(_) => Some(value.to_string()),
        other => text_of(other),
    }
}

/// Facts from an object, a `"k: v"` list, or a list of `{key, value}` pairs.
pub fn facts_from_value(value: &Value) -> Option<Facts> {
    match value {
        Value::Object(map) => Some(facts_from_map(map)),
        Value::Array(items) => {
            let mut facts = Facts::new();
            for item in items {
                match item {
                    Value::String(s) => {
                        if let Some((k, v)) = split_pair(s) {
                            facts.insert(k, v);
                        }
                    }
                    Value::Object(pair) => {
                        let key = ["key", "name", "label"]
                            .iter()
                            .find_map(|k| pair.get(*k).and_then(text_of));
                        let val = pair.get("value").and_then(flatten_value);
                        match (key, val) {
                            (Some(k), Some(v)) => {
                                facts.insert(k, v);
                            }
                            _ => facts.extend(facts_from_map(pair)),
                        }
                    }
                    _ => {}
                }
            }
            (!facts.is_empty()).then_some(facts)
        }
        _ => None,
    }
}

fn facts_from_map(map: &Map<String, Value>) -> Facts {
    map.iter()
        .filter(|(key, _)| !key.trim().is_empty())
        .filter_map(|(key, value)| flatten_value(value).map(|v| (key.trim().to_string(), v)))
        .collect()
}

fn split_pair(text: &str) -> Option<(String, String)> {
    let (key, value) = text.split_once([':', '：'])?;
    let (key, value) = (key.trim(), value.trim());
    (!key.is_empty() && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
}

pub fn facts(node: &GenericNode, cx: &Extraction<'_>) -> Resolved<Facts> {
    direct(node, &FACTS, facts_from_value)
        .or_else(|| {
            if !cx.structural {
                return None;
            }
            let (value, source) = nested(node, "data", &["facts", "information"])?;
            facts_from_value(value).map(|f| Resolved::new(f, source))
        })
        .unwrap_or_else(|| Resolved::new(Facts::new(), unresolved(node, FACTS.name)))
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

fn tag_list(node: &GenericNode, spec: &FieldSpec) -> Resolved<Vec<String>> {
    direct(node, spec, string_list)
        .map(|r| Resolved::new(tidy(r.value), r.source))
        .unwrap_or_else(|| Resolved::new(Vec::new(), unresolved(node, spec.name)))
}

/// Split a mixed tag list: entries with a red-tag keyword are red.
pub fn partition_tags(items: Vec<String>, red_keywords: &[String]) -> (Vec<String>, Vec<String>) {
    items
        .into_iter()
        .partition(|item| contains_any(item, red_keywords))
}

/// `(red, green)` with the mixed-list strategy applied in structural modes.
pub fn tags(node: &GenericNode, cx: &Extraction<'_>) -> (Resolved<Vec<String>>, Resolved<Vec<String>>) {
    let mut red = tag_list(node, &RED_TAGS);
    let mut green = tag_list(node, &GREEN_TAGS);
    if !cx.structural {
        return (red, green);
    }
    for key in MIXED_TAG_KEYS {
        let Some(items) = node.get(*key).and_then(string_list) else {
            continue;
        };
        let (r, g) = partition_tags(items, &cx.config.keywords.red_tag);
        for (slot, extra) in [(&mut red, r), (&mut green, g)] {
            if extra.is_empty() {
                continue;
            }
            slot.value = tidy(std::mem::take(&mut slot.value).into_iter().chain(extra));
            if !slot.source.is_resolved() {
                slot.source = FieldSource::List(key.to_string());
            }
        }
    }
    (red, green)
}

fn assemble(facts: Resolved<Facts>, red: Resolved<Vec<String>>, green: Resolved<Vec<String>>) -> Extracted<ExtractedData> {
    Extracted {
        record: ExtractedData {
            facts: facts.value,
            red_tags: red.value,
            green_tags: green.value,
        },
        fields: vec![
            (FACTS.name, facts.source),
            (RED_TAGS.name, red.source),
            (GREEN_TAGS.name, green.source),
        ],
    }
}

// ---------------------------------------------------------------------------
// Record impl
// ---------------------------------------------------------------------------

impl Record for ExtractedData {
    const TARGET: TargetType = TargetType::Extracted;
    const FIELDS: &'static [FieldSpec] = &[FACTS, RED_TAGS, GREEN_TAGS];

    fn extract(node: &GenericNode, cx: &Extraction<'_>) -> Extracted<Self> {
        let facts = facts(node, cx);
        let (red, green) = tags(node, cx);
        assemble(facts, red, green)
    }

    fn from_text(raw: &str, cx: &Extraction<'_>) -> Extracted<Self> {
        let p = cx.patterns;
        let keywords = &cx.config.keywords;

        let facts = match p.object(raw, FACTS.name).as_ref().and_then(facts_from_value) {
            Some(found) if !found.is_empty() => Resolved::new(found, FieldSource::Pattern),
            _ => {
                let found: Facts = key_value_lines(raw)
                    .into_iter()
                    .filter(|(key, _)| contains_any(key, &keywords.fact))
                    .collect();
                let source = if found.is_empty() {
                    FieldSource::Default
                } else {
                    FieldSource::Pattern
                };
                Resolved::new(found, source)
            }
        };

        let listed = |spec: &FieldSpec| {
            p.list(raw, spec.name)
                .map(|items| Resolved::new(tidy(items), FieldSource::Pattern))
        };
        let (red, green) = match (listed(&RED_TAGS), listed(&GREEN_TAGS)) {
            (None, None) => {
                let bullets: Vec<String> = bullet_items(raw)
                    .into_iter()
                    .filter(|item| split_pair(item).is_none())
                    .collect();
                let (r, g) = partition_tags(bullets, &keywords.red_tag);
                let g: Vec<String> = g
                    .into_iter()
                    .filter(|item| contains_any(item, &keywords.green_tag))
                    .collect();
                (
                    Resolved::new(tidy(r), FieldSource::Inferred),
                    Resolved::new(tidy(g), FieldSource::Inferred),
                )
            }
            (red, green) => (
                red.unwrap_or_else(|| Resolved::new(Vec::new(), FieldSource::Default)),
                green.unwrap_or_else(|| Resolved::new(Vec::new(), FieldSource::Default)),
            ),
        };
        assemble(facts, red, green)
    }

    fn fallback(_raw: &str, _cx: &Extraction<'_>) -> Self {
        ExtractedData::default()
    }

    fn adopt(&mut self, donor: &Self, field: &str) {
        match field {
            "facts" => self.facts = donor.facts.clone(),
            "redTags" => self.red_tags = donor.red_tags.clone(),
            "greenTags" => self.green_tags = donor.green_tags.clone(),
            _ => {}
        }
    }

    fn into_any(self) -> AnyRecord {
        AnyRecord::Extracted(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
