//! ValueExtractor: typed field values out of a canonicalized [`GenericNode`].
//!
//! Every record type implements [`Record`]. Field extractors never fail: each
//! returns a [`Resolved`] value whose [`FieldSource`] says which strategy
//! produced it, or that the documented default was used.
//!
//! Strategies per field, first match wins:
//!
//! 1. canonical key at the top level
//! 2. record-specific alias keys (spellings the synonym table leaves alone)
//! 3. list-shaped alternatives (structural modes only)
//! 4. nested-object alternatives (structural modes only)
//! 5. keyword inference, for the few fields that allow it

pub mod analysis;
pub mod coerce;
pub mod facts;
pub mod polish;
pub mod safety;

use crate::config::NormalizerConfig;
use crate::heuristic::Patterns;
use crate::synonyms::SynonymTable;
use crate::types::{AnyRecord, GenericNode, TargetType};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// Field metadata
// ---------------------------------------------------------------------------

/// Static description of one record field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Extra top-level keys tried after the canonical one, in order.
    pub aliases: &'static [&'static str],
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            required: false,
        }
    }
}

/// Which strategy produced a field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// Canonical key, value used as-is.
    Canonical,
    /// Record-specific alias key.
    Alias(String),
    /// Entry picked from a list under the given key.
    List(String),
    /// Value found under a nested path such as `analysis.reply`.
    Nested(String),
    /// Regex match against the raw response text.
    Pattern,
    /// The raw response text itself, lightly cleaned.
    RawText,
    /// Explicit value converted from another type (`"yes"`, `0`, ...).
    Coerced,
    /// Keyword inference or derived from a sibling field.
    Inferred,
    /// Nothing found; documented default.
    Default,
    /// Key present with an unusable shape; documented default.
    Mismatch { found: &'static str },
}

impl FieldSource {
    /// Whether any strategy produced the value.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, FieldSource::Default | FieldSource::Mismatch { .. })
    }

    /// Resolved by something other than inference.
    pub fn is_evidence(&self) -> bool {
        self.is_resolved() && !matches!(self, FieldSource::Inferred)
    }
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSource::Canonical => write!(f, "canonical key"),
            FieldSource::Alias(key) => write!(f, "alias `{key}`"),
            FieldSource::List(key) => write!(f, "list `{key}`"),
            FieldSource::Nested(path) => write!(f, "nested `{path}`"),
            FieldSource::Pattern => write!(f, "raw-text pattern"),
            FieldSource::RawText => write!(f, "raw text"),
            FieldSource::Coerced => write!(f, "coerced value"),
            FieldSource::Inferred => write!(f, "inferred"),
            FieldSource::Default => write!(f, "default"),
            FieldSource::Mismatch { found } => write!(f, "default, found {found}"),
        }
    }
}

/// A field value plus its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: FieldSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: FieldSource) -> Self {
        Self { value, source }
    }
}

/// A whole record plus the provenance of each field, in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
    pub record: T,
    pub fields: Vec<(&'static str, FieldSource)>,
}

impl<T: Record> Extracted<T> {
    pub fn source(&self, field: &str) -> Option<&FieldSource> {
        self.fields.iter().find(|(name, _)| *name == field).map(|(_, s)| s)
    }

    /// Required fields no strategy resolved.
    pub fn missing_required(&self) -> Vec<&'static str> {
        T::FIELDS
            .iter()
            .filter(|spec| spec.required)
            .filter(|spec| !self.source(spec.name).is_some_and(FieldSource::is_resolved))
            .map(|spec| spec.name)
            .collect()
    }

    /// At least one field came from real evidence rather than inference.
    pub fn has_evidence(&self) -> bool {
        self.fields.iter().any(|(_, source)| source.is_evidence())
    }

    /// Share of the record's fields backed by evidence, in `0.0..=1.0`.
    pub fn quality(&self) -> f64 {
        if T::FIELDS.is_empty() {
            return 0.0;
        }
        let backed = T::FIELDS
            .iter()
            .filter(|spec| self.source(spec.name).is_some_and(FieldSource::is_evidence))
            .count();
        backed as f64 / T::FIELDS.len() as f64
    }

    /// One line per field resolved by a non-canonical strategy.
    pub fn notes(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, source)| *source != FieldSource::Canonical && *source != FieldSource::Default)
            .map(|(name, source)| format!("{name}: {source}"))
            .collect()
    }

    /// Copy `fields` from `donor` where the donor has real evidence for them.
    ///
    /// Raw-text fallbacks are never adopted. Returns the fields filled.
    pub fn fill_from(&mut self, donor: &Extracted<T>, fields: &[&'static str]) -> Vec<&'static str> {
        let mut filled = Vec::new();
        for &field in fields {
            let Some(source) = donor.source(field) else {
                continue;
            };
            if !source.is_evidence() || *source == FieldSource::RawText {
                continue;
            }
            self.record.adopt(&donor.record, field);
            let source = source.clone();
            if let Some(slot) = self.fields.iter_mut().find(|(name, _)| *name == field) {
                slot.1 = source;
            }
            filled.push(field);
        }
        filled
    }
}

// ---------------------------------------------------------------------------
// Record trait
// ---------------------------------------------------------------------------

/// Everything an extractor may consult.
#[derive(Debug, Clone, Copy)]
pub struct Extraction<'a> {
    pub table: &'a SynonymTable,
    pub config: &'a NormalizerConfig,
    pub patterns: &'a Patterns,
    /// List-shaped and nested-object strategies enabled.
    pub structural: bool,
}

/// A record type the pipeline can produce.
pub trait Record: Sized + Clone + fmt::Debug + Send + 'static {
    const TARGET: TargetType;
    const FIELDS: &'static [FieldSpec];

    /// Build from a canonicalized tree. Never fails.
    fn extract(node: &GenericNode, cx: &Extraction<'_>) -> Extracted<Self>;

    /// Build from raw text with regex and keyword strategies. Never fails.
    fn from_text(raw: &str, cx: &Extraction<'_>) -> Extracted<Self>;

    /// The canned record used when every tier failed.
    fn fallback(raw: &str, cx: &Extraction<'_>) -> Self;

    /// Take `field` from `donor`.
    fn adopt(&mut self, donor: &Self, field: &str);

    fn into_any(self) -> AnyRecord;
}

// ---------------------------------------------------------------------------
// Shared strategies
// ---------------------------------------------------------------------------

/// Non-null values under the canonical key, then under each alias.
pub fn candidates<'n>(
    node: &'n GenericNode,
    spec: &FieldSpec,
) -> impl Iterator<Item = (&'n Value, FieldSource)> + 'n {
    let canonical = node
        .get(spec.name)
        .map(|value| (value, FieldSource::Canonical));
    let aliases = spec
        .aliases
        .iter()
        .filter_map(move |alias| node.get(*alias).map(|value| (value, FieldSource::Alias(alias.to_string()))));
    canonical
        .into_iter()
        .chain(aliases)
        .filter(|(value, _)| !value.is_null())
}

/// First candidate `convert` accepts.
pub fn direct<T>(
    node: &GenericNode,
    spec: &FieldSpec,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<Resolved<T>> {
    candidates(node, spec).find_map(|(value, source)| convert(value).map(|v| Resolved::new(v, source)))
}

/// `Mismatch` when the canonical key holds something unusable, else `Default`.
pub fn unresolved(node: &GenericNode, canonical: &str) -> FieldSource {
    match node.get(canonical) {
        None | Some(Value::Null) => FieldSource::Default,
        Some(value) => FieldSource::Mismatch {
            found: kind_of(value),
        },
    }
}

/// Value under `parent.child`, for the first child key present.
pub fn nested<'n>(node: &'n GenericNode, parent: &str, children: &[&str]) -> Option<(&'n Value, FieldSource)> {
    let inner = node.get(parent)?.as_object()?;
    children.iter().find_map(|child| {
        inner
            .get(*child)
            .filter(|v| !v.is_null())
            .map(|v| (v, FieldSource::Nested(format!("{parent}.{child}"))))
    })
}

pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Scalar text: trimmed non-blank strings, numbers and booleans.
pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text of any value: scalars as-is, lists joined with `"; "`, objects by
/// their rendered values. `None` when nothing non-blank remains.
pub fn render_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => join_non_blank(items.iter().filter_map(render_text), "; "),
        Value::Object(map) => join_non_blank(map.values().filter_map(render_text), "; "),
        other => text_of(other),
    }
}

fn join_non_blank(parts: impl Iterator<Item = String>, sep: &str) -> Option<String> {
    let parts: Vec<String> = parts.filter(|p| !p.trim().is_empty()).collect();
    (!parts.is_empty()).then(|| parts.join(sep))
}

/// Keys whose value names an entry inside a list of objects.
const ENTRY_TEXT_KEYS: &[&str] = &[
    "text", "content", "name", "title", "risk", "tag", "topic", "description", "response",
    "reply", "suggestion", "message", "value",
];

/// Display text of one list entry.
pub fn entry_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => ENTRY_TEXT_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(text_of))
            .or_else(|| render_text(value)),
        other => render_text(other),
    }
}

/// A list of strings from an array or a delimited string. Not yet tidied.
pub fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(entry_text).collect()),
        Value::String(s) => Some(
            s.split(['\n', ',', '，', '、', ';', '；'])
                .map(|part| part.trim().trim_start_matches(['-', '*', '•']).trim().to_string())
                .collect(),
        ),
        _ => None,
    }
}

/// Trim, drop blanks and drop repeats, keeping first occurrences.
pub fn tidy(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.trim();
        if item.is_empty() || out.iter().any(|seen| seen == item) {
            continue;
        }
        out.push(item.to_string());
    }
    out
}

/// All string leaves of `node`, newline separated, for keyword inference.
pub fn string_leaves(node: &GenericNode) -> String {
    fn walk(value: &Value, out: &mut String) {
        match value {
            Value::String(s) => {
                out.push_str(s);
                out.push('\n');
            }
            Value::Array(items) => items.iter().for_each(|item| walk(item, out)),
            Value::Object(map) => map.values().for_each(|item| walk(item, out)),
            _ => {}
        }
    }
    let mut out = String::new();
    walk(node, &mut out);
    out
}

/// Case-insensitive substring match against any keyword.
pub fn contains_any(text: &str, keywords: &[String]) -> bool {
    let text = text.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .any(|k| text.contains(&k.to_lowercase()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
