//! NormalizationPipeline: the single entry point callers use.
//!
//! A [`Normalizer`] owns everything one call needs (synonym table, config,
//! compiled patterns) behind `Arc`s, so it is cheap to clone and safe to share
//! across threads. The free functions [`normalize`] and [`normalize_as`] use a
//! process-wide instance built from the embedded configuration.

use crate::config::NormalizerConfig;
use crate::error::Result;
use crate::extract::{Extraction, Record};
use crate::fallback::recover;
use crate::heuristic::Patterns;
use crate::synonyms::SynonymTable;
use crate::types::{
    AnalysisResult, AnyRecord, ExtractedData, ParseMode, ParseOutcome, PolishResult, ReplyResult,
    SafetyCheckResult, TargetType,
};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Normalizer {
    table: Arc<SynonymTable>,
    config: Arc<NormalizerConfig>,
    patterns: Arc<Patterns>,
}

impl Normalizer {
    /// Build a normalizer with the synonym table described by `config`.
    pub fn new(config: NormalizerConfig) -> Result<Self> {
        let table = Arc::new(SynonymTable::from_config(&config)?);
        Self::with_table(config, table)
    }

    /// Build a normalizer around an existing table.
    pub fn with_table(config: NormalizerConfig, table: Arc<SynonymTable>) -> Result<Self> {
        let patterns = Arc::new(Patterns::new(&table)?);
        Ok(Self {
            table,
            config: Arc::new(config),
            patterns,
        })
    }

    /// Process-wide normalizer on the shared synonym table, built on first use.
    pub fn shared() -> Arc<Normalizer> {
        if let Some(normalizer) = SHARED.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Arc::clone(normalizer);
        }
        let mut slot = SHARED.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slot.get_or_insert_with(|| {
            let normalizer = Self::with_table(NormalizerConfig::defaults(), SynonymTable::shared())
                .expect("built-in field patterns must compile");
            Arc::new(normalizer)
        }))
    }

    pub fn table(&self) -> &SynonymTable {
        &self.table
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize `raw` into a `T`. Never fails.
    pub fn normalize<T: Record>(&self, raw: &str, mode: ParseMode) -> ParseOutcome<T> {
        let limit = self.config.pipeline.max_input_bytes;
        let (input, truncated) = truncate(raw, limit);
        debug!(
            target_type = %T::TARGET,
            %mode,
            bytes = raw.len(),
            truncated,
            "normalizing response"
        );
        let cx = Extraction {
            table: &self.table,
            config: &self.config,
            patterns: &self.patterns,
            structural: mode.structural_strategies(),
        };
        let outcome = recover::<T>(input, &cx, mode);
        if truncated {
            cap_truncated(outcome, format!("input truncated to {} of {} bytes", input.len(), raw.len()))
        } else {
            outcome
        }
    }

    /// [`normalize`](Self::normalize) with the configured default mode.
    pub fn normalize_default<T: Record>(&self, raw: &str) -> ParseOutcome<T> {
        self.normalize(raw, self.config.pipeline.default_mode)
    }

    /// Normalize into the record type selected at runtime.
    pub fn normalize_as(&self, raw: &str, target: TargetType, mode: ParseMode) -> ParseOutcome<AnyRecord> {
        match target {
            TargetType::Analysis => self.normalize::<AnalysisResult>(raw, mode).map(Record::into_any),
            TargetType::SafetyCheck => self.normalize::<SafetyCheckResult>(raw, mode).map(Record::into_any),
            TargetType::Extracted => self.normalize::<ExtractedData>(raw, mode).map(Record::into_any),
            TargetType::Polish => self.normalize::<PolishResult>(raw, mode).map(Record::into_any),
            TargetType::Reply => self.normalize::<ReplyResult>(raw, mode).map(Record::into_any),
        }
    }
}

/// `raw` cut to at most `limit` bytes on a char boundary, and whether it was cut.
fn truncate(raw: &str, limit: usize) -> (&str, bool) {
    if raw.len() <= limit {
        return (raw, false);
    }
    let mut end = limit;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    (&raw[..end], true)
}

/// A truncated input is never a clean success.
fn cap_truncated<T>(outcome: ParseOutcome<T>, warning: String) -> ParseOutcome<T> {
    match outcome {
        ParseOutcome::Success(value) => ParseOutcome::Recovered {
            value,
            warnings: vec![warning],
        },
        ParseOutcome::Recovered { value, mut warnings } => {
            warnings.insert(0, warning);
            ParseOutcome::Recovered { value, warnings }
        }
        ParseOutcome::DefaultUsed { value, reason } => ParseOutcome::DefaultUsed {
            value,
            reason: format!("{warning}; {reason}"),
        },
    }
}

// ---------------------------------------------------------------------------
// Process-wide instance
// ---------------------------------------------------------------------------

static SHARED: RwLock<Option<Arc<Normalizer>>> = RwLock::new(None);

/// Drop the process-wide normalizer; the next call rebuilds it.
pub fn clear_cache() {
    SHARED.write().unwrap_or_else(PoisonError::into_inner).take();
}

/// Normalize `raw` into a `T` with the shared normalizer.
pub fn normalize<T: Record>(raw: &str, mode: ParseMode) -> ParseOutcome<T> {
    Normalizer::shared().normalize(raw, mode)
}

/// Normalize `raw` into the record type `target` with the shared normalizer.
pub fn normalize_as(raw: &str, target: TargetType, mode: ParseMode) -> ParseOutcome<AnyRecord> {
    Normalizer::shared().normalize_as(raw, target, mode)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutcomeTag, RiskLevel};
    use pretty_assertions::assert_eq;

    #[test]
    fn fenced_localized_json() {
        let raw = "```json\n{\"回复建议\":\"你好\",\"风险等级\":\"SAFE\"}\n```";
        let out: ParseOutcome<AnalysisResult> = normalize(raw, ParseMode::Intelligent);
        assert_eq!(out.tag(), OutcomeTag::Success);
        assert_eq!(out.value().reply_suggestion, "你好");
        assert_eq!(out.value().risk_level, RiskLevel::Safe);
    }

    #[test]
    fn normalize_as_picks_the_record_type() {
        let out = normalize_as(r#"{"isSafe": "否"}"#, TargetType::SafetyCheck, ParseMode::Fallback);
        assert_eq!(out.value().target(), TargetType::SafetyCheck);
        match out.into_value() {
            AnyRecord::SafetyCheck(check) => assert!(!check.is_safe),
            other => panic!("unexpected record: {other:?}"),
        }
    }

    #[test]
    fn truncation_caps_the_outcome() {
        let config = NormalizerConfig::from_toml_str("[pipeline]\nmax_input_bytes = 40").unwrap();
        let normalizer = Normalizer::new(config).unwrap();
        let raw = r#"{"replySuggestion": "好", "strategyAnalysis": "这段会被截掉"}"#;
        let out: ParseOutcome<AnalysisResult> = normalizer.normalize(raw, ParseMode::Intelligent);
        assert_eq!(out.tag(), OutcomeTag::Recovered);
        assert!(out.warnings()[0].starts_with("input truncated to"));
        assert_eq!(out.value().reply_suggestion, "好");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let (cut, truncated) = truncate("你好", 4);
        assert!(truncated);
        assert_eq!(cut, "你");
        assert_eq!(truncate("abc", 3), ("abc", false));
    }

    #[test]
    fn custom_table_is_used() {
        let table = SynonymTable::builtin().with_mapping("replySuggestion", &["答复"]).unwrap();
        let normalizer = Normalizer::with_table(NormalizerConfig::defaults(), Arc::new(table)).unwrap();
        let out: ParseOutcome<AnalysisResult> = normalizer.normalize(r#"{"答复": "在的"}"#, ParseMode::Standard);
        assert_eq!(out.value().reply_suggestion, "在的");
    }

    #[test]
    fn shared_instance_is_reused_until_cleared() {
        let a = Normalizer::shared();
        let b = Normalizer::shared();
        assert!(Arc::ptr_eq(&a, &b));
        crate::clear_cache();
        let c = Normalizer::shared();
        let out: ParseOutcome<AnalysisResult> = c.normalize("", ParseMode::Intelligent);
        assert!(out.is_default());
    }
}
