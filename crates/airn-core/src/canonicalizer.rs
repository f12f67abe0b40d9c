//! FieldCanonicalizer: rewrites synonym keys to canonical keys, recursively.
//!
//! Children are rewritten before their parent, so synonyms nested anywhere
//! (inside arrays of risk objects, sub-objects, ...) are covered. Keys the
//! [`SynonymTable`] does not know pass through untouched.
//!
//! When several spellings of one field share a map, one value survives:
//!
//! 1. the canonical key itself, if present;
//! 2. otherwise the best match by kind (exact, folded, fuzzy), then by
//!    synonym rank, then by position in the map.
//!
//! The survivor takes the position of the key it came from; the other
//! spellings are removed.

use crate::synonyms::{MatchKind, SynonymTable};
use crate::types::GenericNode;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Canonicalize every map in `node`. Total: primitives come back unchanged.
pub fn canonicalize(node: GenericNode, table: &SynonymTable) -> GenericNode {
    match node {
        Value::Object(map) => Value::Object(canonicalize_map(map, table)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| canonicalize(item, table))
                .collect(),
        ),
        other => other,
    }
}

fn canonicalize_map(map: Map<String, Value>, table: &SynonymTable) -> Map<String, Value> {
    let entries: Vec<(String, Value)> = map
        .into_iter()
        .map(|(key, value)| (key, canonicalize(value, table)))
        .collect();

    let matches: Vec<Option<(&str, MatchKind, usize)>> = entries
        .iter()
        .map(|(key, _)| table.lookup(key).map(|m| (m.canonical, m.kind, m.rank)))
        .collect();

    // canonical → (kind, rank, position) of the winning spelling
    let mut winners: HashMap<&str, (MatchKind, usize, usize)> = HashMap::new();
    for (pos, found) in matches.iter().enumerate() {
        let Some((canonical, kind, rank)) = *found else {
            continue;
        };
        let candidate = (kind, rank, pos);
        winners
            .entry(canonical)
            .and_modify(|best| {
                if candidate < *best {
                    *best = candidate;
                }
            })
            .or_insert(candidate);
    }

    let mut out = Map::with_capacity(entries.len());
    for (pos, ((key, value), found)) in entries.into_iter().zip(matches).enumerate() {
        match found {
            None => {
                out.insert(key, value);
            }
            Some((canonical, ..)) if winners.get(canonical).map(|w| w.2) == Some(pos) => {
                if key != canonical {
                    tracing::trace!(from = %key, to = canonical, "canonicalized key");
                }
                out.insert(canonical.to_string(), value);
            }
            Some((canonical, ..)) => {
                tracing::trace!(key = %key, canonical, "dropped shadowed synonym");
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MatchingConfig, SynonymEntry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn table() -> SynonymTable {
        SynonymTable::from_entries(
            vec![
                SynonymEntry::new("replySuggestion", &["回复建议", "建议回复"]),
                SynonymEntry::new("riskLevel", &["风险等级"]),
                SynonymEntry::new("triggeredRisks", &["风险列表"]),
            ],
            MatchingConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn rewrites_top_level_synonyms() {
        let out = canonicalize(json!({"回复建议": "你好", "风险等级": "SAFE"}), &table());
        assert_eq!(out, json!({"replySuggestion": "你好", "riskLevel": "SAFE"}));
    }

    #[test]
    fn canonical_key_wins_over_synonym() {
        let out = canonicalize(json!({"回复建议": "a", "replySuggestion": "b"}), &table());
        assert_eq!(out, json!({"replySuggestion": "b"}));
    }

    #[test]
    fn lower_rank_synonym_wins() {
        let out = canonicalize(json!({"建议回复": "second", "回复建议": "first"}), &table());
        assert_eq!(out, json!({"replySuggestion": "first"}));
    }

    #[test]
    fn rewrites_inside_arrays_and_objects() {
        let input = json!({
            "outer": {"风险列表": [{"风险等级": "DANGER"}, {"other": 1}]},
        });
        let out = canonicalize(input, &table());
        assert_eq!(
            out,
            json!({"outer": {"triggeredRisks": [{"riskLevel": "DANGER"}, {"other": 1}]}})
        );
    }

    #[test]
    fn unknown_keys_and_order_survive() {
        let out = canonicalize(json!({"z": 1, "风险等级": "WARNING", "a": 2}), &table());
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["z", "riskLevel", "a"]);
    }

    #[test]
    fn folded_spelling_loses_to_exact_synonym() {
        let out = canonicalize(json!({"reply_suggestion": "folded", "回复建议": "exact"}), &table());
        assert_eq!(out, json!({"replySuggestion": "exact"}));
    }

    #[test]
    fn primitives_pass_through() {
        let t = table();
        for v in [json!(null), json!("回复建议"), json!(3), json!(true), json!([])] {
            assert_eq!(canonicalize(v.clone(), &t), v);
        }
    }
}
