//! SynonymTable: canonical field names and the spellings models use instead.
//!
//! A table is immutable once built. Lookups try, in order:
//!
//! 1. the exact key (canonical name or listed synonym);
//! 2. the key with case folded and `_`, `-` and spaces removed;
//! 3. optionally, normalized Levenshtein similarity (`strsim`) for keys that
//!    are not plain ASCII identifiers (localized spellings with a stray character).
//!
//! The process-wide instance behind [`SynonymTable::shared`] is built from the
//! `[[synonyms]]` tables of the embedded configuration on first use and
//! dropped again by [`clear_cache`].

use crate::config::{MatchingConfig, NormalizerConfig, SynonymEntry};
use crate::error::{NormalizeError, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

// ---------------------------------------------------------------------------
// Lookup results
// ---------------------------------------------------------------------------

/// How a key was matched to its canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Exact,
    Normalized,
    Fuzzy,
}

/// A successful key lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMatch<'a> {
    pub canonical: &'a str,
    /// Position of the matched spelling: 0 for the canonical name, `n` for the
    /// n-th listed synonym. Lower ranks win when several spellings are present.
    pub rank: usize,
    pub kind: MatchKind,
}

/// Size summary of a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableStats {
    pub canonical_fields: usize,
    pub synonyms: usize,
    pub average_per_field: f64,
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SynonymTable {
    entries: Vec<SynonymEntry>,
    /// Exact spelling → (entry index, rank).
    exact: HashMap<String, (usize, usize)>,
    /// Folded spelling → (entry index, rank). First writer wins on collision.
    folded: HashMap<String, (usize, usize)>,
    matching: MatchingConfig,
}

impl SynonymTable {
    /// Build and validate a table from ordered entries.
    ///
    /// Fails when a spelling maps to two canonical fields, or when a canonical
    /// name is listed as a synonym of another field. Duplicate spellings within
    /// one entry are ignored.
    pub fn from_entries(entries: Vec<SynonymEntry>, matching: MatchingConfig) -> Result<Self> {
        let mut exact: HashMap<String, (usize, usize)> = HashMap::new();
        let mut folded: HashMap<String, (usize, usize)> = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            if entry.canonical.trim().is_empty() {
                return Err(NormalizeError::SynonymTable(format!(
                    "entry {idx} has a blank canonical name"
                )));
            }
            if let Some(&(other, _)) = exact.get(&entry.canonical) {
                return Err(NormalizeError::SynonymTable(format!(
                    "canonical field `{}` is defined twice (entries {other} and {idx})",
                    entry.canonical
                )));
            }
            exact.insert(entry.canonical.clone(), (idx, 0));
        }

        for (idx, entry) in entries.iter().enumerate() {
            for (pos, alias) in entry.aliases.iter().enumerate() {
                let alias = alias.trim();
                if alias.is_empty() {
                    continue;
                }
                match exact.get(alias) {
                    Some(&(owner, _)) if owner == idx => continue,
                    Some(&(_, 0)) => {
                        return Err(NormalizeError::SynonymTable(format!(
                            "`{alias}` is listed for `{}` but is the canonical name of another field",
                            entry.canonical
                        )));
                    }
                    Some(&(owner, _)) => {
                        return Err(NormalizeError::SynonymTable(format!(
                            "`{alias}` maps to both `{}` and `{}`",
                            entries[owner].canonical, entry.canonical
                        )));
                    }
                    None => {
                        exact.insert(alias.to_string(), (idx, pos + 1));
                    }
                }
            }
        }

        for (spelling, &slot) in sorted_by_slot(&exact) {
            folded.entry(fold(spelling)).or_insert(slot);
        }

        let table = Self {
            entries,
            exact,
            folded,
            matching,
        };
        let stats = table.stats();
        tracing::debug!(
            canonical_fields = stats.canonical_fields,
            synonyms = stats.synonyms,
            fuzzy = table.matching.fuzzy,
            "synonym table built"
        );
        Ok(table)
    }

    /// Build from a loaded configuration.
    pub fn from_config(cfg: &NormalizerConfig) -> Result<Self> {
        Self::from_entries(cfg.synonyms.clone(), cfg.matching.clone())
    }

    /// The table described by the embedded default configuration.
    pub fn builtin() -> Self {
        Self::from_config(&NormalizerConfig::defaults())
            .expect("built-in synonym table must validate")
    }

    /// Process-wide table, built on first use.
    pub fn shared() -> Arc<SynonymTable> {
        if let Some(table) = SHARED.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Arc::clone(table);
        }
        let mut slot = SHARED.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slot.get_or_insert_with(|| Arc::new(Self::builtin())))
    }

    /// Return a new table with `synonyms` added to `canonical` (created if absent).
    pub fn with_mapping(&self, canonical: &str, synonyms: &[&str]) -> Result<Self> {
        let mut entries = self.entries.clone();
        match entries.iter_mut().find(|e| e.canonical == canonical) {
            Some(entry) => entry.aliases.extend(synonyms.iter().map(|s| s.to_string())),
            None => entries.push(SynonymEntry::new(canonical, synonyms)),
        }
        Self::from_entries(entries, self.matching.clone())
    }

    /// Resolve `key` to its canonical field.
    pub fn lookup(&self, key: &str) -> Option<KeyMatch<'_>> {
        if let Some(&(idx, rank)) = self.exact.get(key) {
            return Some(self.key_match(idx, rank, MatchKind::Exact));
        }
        if let Some(&(idx, rank)) = self.folded.get(&fold(key)) {
            return Some(self.key_match(idx, rank, MatchKind::Normalized));
        }
        if self.matching.fuzzy && !is_ascii_identifier(key) {
            return self.fuzzy_lookup(key);
        }
        None
    }

    pub fn is_canonical(&self, key: &str) -> bool {
        matches!(self.exact.get(key), Some(&(_, 0)))
    }

    /// Canonical field names in table order.
    pub fn canonicals(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.canonical.as_str())
    }

    /// Listed synonyms of `canonical`, in rank order.
    pub fn synonyms_of(&self, canonical: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.canonical == canonical)
            .map(|e| e.aliases.as_slice())
    }

    pub fn entries(&self) -> &[SynonymEntry] {
        &self.entries
    }

    pub fn stats(&self) -> TableStats {
        let canonical_fields = self.entries.len();
        let synonyms = self.exact.len() - canonical_fields;
        let average_per_field = if canonical_fields == 0 {
            0.0
        } else {
            synonyms as f64 / canonical_fields as f64
        };
        TableStats {
            canonical_fields,
            synonyms,
            average_per_field,
        }
    }

    fn key_match(&self, idx: usize, rank: usize, kind: MatchKind) -> KeyMatch<'_> {
        KeyMatch {
            canonical: &self.entries[idx].canonical,
            rank,
            kind,
        }
    }

    fn fuzzy_lookup(&self, key: &str) -> Option<KeyMatch<'_>> {
        let needle = fold(key);
        let mut best: Option<(f64, usize, usize)> = None;
        for (spelling, &(idx, rank)) in sorted_by_slot(&self.exact) {
            let score = strsim::normalized_levenshtein(&needle, &fold(spelling));
            if score < self.matching.fuzzy_threshold {
                continue;
            }
            if best.map_or(true, |(top, _, _)| score > top) {
                best = Some((score, idx, rank));
            }
        }
        best.map(|(score, idx, rank)| {
            tracing::trace!(key, score, canonical = %self.entries[idx].canonical, "fuzzy key match");
            self.key_match(idx, rank, MatchKind::Fuzzy)
        })
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Process-wide cache
// ---------------------------------------------------------------------------

static SHARED: RwLock<Option<Arc<SynonymTable>>> = RwLock::new(None);

/// Drop the process-wide table; the next [`SynonymTable::shared`] rebuilds it.
pub fn clear_cache() {
    SHARED.write().unwrap_or_else(PoisonError::into_inner).take();
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Case-fold and drop `_`, `-` and whitespace.
pub fn fold(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_ascii_identifier(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Deterministic iteration: entry order, then rank.
fn sorted_by_slot(map: &HashMap<String, (usize, usize)>) -> Vec<(&String, &(usize, usize))> {
    let mut pairs: Vec<_> = map.iter().collect();
    pairs.sort_by_key(|(_, slot)| **slot);
    pairs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
