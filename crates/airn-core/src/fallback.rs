//! FallbackHandler: the four-tier recovery cascade.
//!
//! | Tier        | Input        | Succeeds when                                   |
//! |-------------|--------------|-------------------------------------------------|
//! | `strict`    | cleaned text | `serde_json` parses it to an object             |
//! | `lenient`   | cleaned text | the tolerant parser produces an object that     |
//! |             |              | meets the quality bar and resolves required     |
//! |             |              | fields                                          |
//! | `heuristic` | raw text     | enough fields are read from the text            |
//! | `default`   | raw text     | always                                          |
//!
//! Quality is the share of a record's fields backed by evidence (see
//! [`Extracted::quality`]); `pipeline.min_quality` sets the bar. A result with
//! no evidence at all never passes.
//!
//! Each tier is a plain function returning [`Result`]; [`recover`] walks them
//! in order and turns the first success into a [`ParseOutcome`]. A panic in
//! any tier is contained by [`guarded`] and counts as that tier's failure.

use crate::canonicalizer::canonicalize;
use crate::cleaner::clean;
use crate::error::{NormalizeError, Result};
use crate::extract::{kind_of, Extracted, Extraction, Record};
use crate::lenient::{parse_lenient, Deviation};
use crate::types::{GenericNode, ParseMode, ParseOutcome, Tier};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Strict JSON parse.
pub fn parse_strict(text: &str) -> Result<GenericNode> {
    serde_json::from_str(text).map_err(|e| NormalizeError::Syntax(e.to_string()))
}

fn require_object(node: GenericNode) -> Result<GenericNode> {
    if node.is_object() {
        Ok(node)
    } else {
        Err(NormalizeError::NotAnObject(kind_of(&node)))
    }
}

/// Tier 1: strict parse of the cleaned text, canonicalize, extract.
pub fn strict_tier<T: Record>(cleaned: &str, cx: &Extraction<'_>) -> Result<Extracted<T>> {
    let node = require_object(parse_strict(cleaned)?)?;
    let node = canonicalize(node, cx.table);
    Ok(T::extract(&node, cx))
}

/// Evidence share of `extracted`, or [`NormalizeError::LowQuality`] when it is
/// zero or below `min`.
pub fn check_quality<T: Record>(extracted: &Extracted<T>, min: f64) -> Result<f64> {
    let score = extracted.quality();
    if score > 0.0 && score >= min {
        Ok(score)
    } else {
        Err(NormalizeError::LowQuality { score, min })
    }
}

/// Tier 2: tolerant parse of the cleaned text, canonicalize, extract.
///
/// An object the parser builds out of stray braces in prose resolves nothing
/// and fails the quality check, leaving the text to the heuristic tier.
pub fn lenient_tier<T: Record>(
    cleaned: &str,
    cx: &Extraction<'_>,
) -> Result<(Extracted<T>, Vec<Deviation>)> {
    let parsed = parse_lenient(cleaned)?;
    let node = require_object(parsed.node)?;
    let node = canonicalize(node, cx.table);
    let extracted = T::extract(&node, cx);
    check_quality(&extracted, cx.config.pipeline.min_quality)?;
    Ok((extracted, parsed.deviations))
}

/// Tier 3: regex and keyword strategies over the raw text.
pub fn heuristic_tier<T: Record>(raw: &str, cx: &Extraction<'_>) -> Result<Extracted<T>> {
    let extracted = T::from_text(raw, cx);
    if !extracted.has_evidence() {
        return Err(NormalizeError::NothingRecognised);
    }
    check_quality(&extracted, cx.config.pipeline.min_quality)?;
    Ok(extracted)
}

/// Tier 4: the canned record.
pub fn default_tier<T: Record>(raw: &str, cx: &Extraction<'_>) -> T {
    T::fallback(raw, cx)
}

/// Run `f`, turning a panic into [`NormalizeError::Internal`].
pub fn guarded<R>(tier: Tier, f: impl FnOnce() -> Result<R>) -> Result<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(NormalizeError::Internal {
            tier,
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Fill unresolved required fields from the heuristic tier, when the mode
/// allows it. Returns the fields filled.
fn fill_missing<T: Record>(
    extracted: &mut Extracted<T>,
    raw: &str,
    cx: &Extraction<'_>,
    mode: ParseMode,
) -> Vec<&'static str> {
    let missing = extracted.missing_required();
    if missing.is_empty() || !mode.allows_heuristic() {
        return Vec::new();
    }
    match guarded(Tier::Heuristic, || Ok(T::from_text(raw, cx))) {
        Ok(donor) => extracted.fill_from(&donor, &missing),
        Err(err) => {
            debug!(target_type = %T::TARGET, error = %err, "field fill failed");
            Vec::new()
        }
    }
}

fn fill_warnings<'a>(filled: &'a [&'static str]) -> impl Iterator<Item = String> + 'a {
    filled
        .iter()
        .map(|field| format!("{field}: filled from raw text"))
}

fn quality_warning<T: Record>(extracted: &Extracted<T>) -> String {
    format!("parse quality: {:.2}", extracted.quality())
}

fn missing_warnings<T: Record>(extracted: &Extracted<T>) -> impl Iterator<Item = String> {
    extracted
        .missing_required()
        .into_iter()
        .map(|field| format!("{}, default used", NormalizeError::MissingField(field)))
}

/// Walk the tiers for `raw` and tag the first success.
pub fn recover<T: Record>(raw: &str, cx: &Extraction<'_>, mode: ParseMode) -> ParseOutcome<T> {
    let target = T::TARGET;
    let cleaned = clean(raw);
    let mut failures: Vec<(Tier, NormalizeError)> = Vec::new();

    match guarded(Tier::Strict, || strict_tier::<T>(&cleaned, cx)) {
        Ok(mut extracted) => {
            let filled = fill_missing(&mut extracted, raw, cx, mode);
            debug!(target_type = %target, tier = %Tier::Strict, %mode, filled = filled.len(), "tier succeeded");
            if filled.is_empty() {
                return ParseOutcome::Success(extracted.record);
            }
            let warnings = fill_warnings(&filled)
                .chain(missing_warnings(&extracted))
                .chain([quality_warning(&extracted)])
                .collect();
            return ParseOutcome::Recovered {
                value: extracted.record,
                warnings,
            };
        }
        Err(err) => {
            debug!(target_type = %target, tier = %Tier::Strict, %mode, error = %err, "tier failed");
            failures.push((Tier::Strict, err));
        }
    }

    match guarded(Tier::Lenient, || lenient_tier::<T>(&cleaned, cx)) {
        Ok((mut extracted, deviations)) => {
            let filled = fill_missing(&mut extracted, raw, cx, mode);
            match extracted.missing_required().first() {
                Some(&field) => {
                    let err = NormalizeError::MissingField(field);
                    debug!(target_type = %target, tier = %Tier::Lenient, %mode, error = %err, "tier failed");
                    failures.push((Tier::Lenient, err));
                }
                None => {
                    debug!(
                        target_type = %target,
                        tier = %Tier::Lenient,
                        %mode,
                        deviations = deviations.len(),
                        filled = filled.len(),
                        quality = extracted.quality(),
                        "tier succeeded"
                    );
                    let mut warnings: Vec<String> = deviations
                        .iter()
                        .map(|d| format!("lenient parse: {d}"))
                        .collect();
                    warnings.extend(extracted.notes());
                    warnings.push(quality_warning(&extracted));
                    return ParseOutcome::Recovered {
                        value: extracted.record,
                        warnings,
                    };
                }
            }
        }
        Err(err) => {
            debug!(target_type = %target, tier = %Tier::Lenient, %mode, error = %err, "tier failed");
            failures.push((Tier::Lenient, err));
        }
    }

    if mode.allows_heuristic() {
        match guarded(Tier::Heuristic, || heuristic_tier::<T>(raw, cx)) {
            Ok(extracted) => {
                debug!(
                    target_type = %target,
                    tier = %Tier::Heuristic,
                    %mode,
                    quality = extracted.quality(),
                    "tier succeeded"
                );
                let mut warnings = vec!["no parsable JSON object; fields read from raw text".to_string()];
                warnings.extend(extracted.notes());
                warnings.extend(missing_warnings(&extracted));
                warnings.push(quality_warning(&extracted));
                return ParseOutcome::Recovered {
                    value: extracted.record,
                    warnings,
                };
            }
            Err(err) => {
                debug!(target_type = %target, tier = %Tier::Heuristic, %mode, error = %err, "tier failed");
                failures.push((Tier::Heuristic, err));
            }
        }
    } else {
        failures.push((Tier::Heuristic, NormalizeError::TierDisabled(Tier::Heuristic)));
    }

    let reason = failures
        .iter()
        .map(|(tier, err)| format!("{tier}: {err}"))
        .collect::<Vec<_>>()
        .join("; ");
    warn!(target_type = %target, %mode, %reason, "all tiers failed, using default record");
    let value = guarded(Tier::Default, || Ok(default_tier::<T>(raw, cx)))
        .unwrap_or_else(|_| T::fallback("", cx));
    ParseOutcome::DefaultUsed { value, reason }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizerConfig;
    use crate::extract::FieldSource;
    use crate::heuristic::Patterns;
    use crate::synonyms::SynonymTable;
    use crate::types::{AnalysisResult, OutcomeTag, PolishResult, RiskLevel, SafetyCheckResult};
    use pretty_assertions::assert_eq;

    struct Fixture {
        table: SynonymTable,
        config: NormalizerConfig,
        patterns: Patterns,
    }

    impl Fixture {
        fn new() -> Self {
            let table = SynonymTable::builtin();
            let patterns = Patterns::new(&table).unwrap();
            Self {
                table,
                config: NormalizerConfig::defaults(),
                patterns,
            }
        }

        fn run<T: Record>(&self, raw: &str, mode: ParseMode) -> ParseOutcome<T> {
            let cx = Extraction {
                table: &self.table,
                config: &self.config,
                patterns: &self.patterns,
                structural: mode.structural_strategies(),
            };
            recover(raw, &cx, mode)
        }
    }

    #[test]
    fn strict_json_is_success() {
        let out: ParseOutcome<AnalysisResult> =
            Fixture::new().run(r#"{"replySuggestion": "hi", "riskLevel": "DANGER"}"#, ParseMode::Intelligent);
        assert_eq!(out.tag(), OutcomeTag::Success);
        assert_eq!(out.value().risk_level, RiskLevel::Danger);
    }

    #[test]
    fn strict_tier_rejects_non_objects() {
        let f = Fixture::new();
        let cx = Extraction {
            table: &f.table,
            config: &f.config,
            patterns: &f.patterns,
            structural: true,
        };
        let err = strict_tier::<AnalysisResult>("[1, 2]", &cx).unwrap_err();
        assert!(matches!(err, NormalizeError::NotAnObject("array")));
        assert!(matches!(
            strict_tier::<AnalysisResult>("{oops", &cx),
            Err(NormalizeError::Syntax(_))
        ));
    }

    #[test]
    fn lenient_tier_reports_deviations() {
        let out: ParseOutcome<SafetyCheckResult> =
            Fixture::new().run("{isSafe: False, 'suggestion': 'calm down'", ParseMode::Standard);
        assert_eq!(out.tag(), OutcomeTag::Recovered);
        assert!(!out.value().is_safe);
        assert!(out.warnings().iter().any(|w| w.starts_with("lenient parse:")));
    }

    #[test]
    fn braces_in_prose_do_not_preempt_heuristics() {
        let raw = "回复建议：你好\n风险等级：高\n例如可以说 {名字}";
        let out: ParseOutcome<AnalysisResult> = Fixture::new().run(raw, ParseMode::Fallback);
        assert_eq!(out.tag(), OutcomeTag::Recovered);
        assert_eq!(out.value().reply_suggestion, "你好");
        assert_eq!(out.value().risk_level, RiskLevel::Danger);
        assert_eq!(out.warnings()[0], "no parsable JSON object; fields read from raw text");
    }

    #[test]
    fn lenient_object_without_evidence_fails() {
        for mode in [ParseMode::Standard, ParseMode::Fallback] {
            let out: ParseOutcome<AnalysisResult> = Fixture::new().run("{garbage", mode);
            assert!(out.is_default(), "{mode}: {out:?}");
            assert!(out.reason().unwrap().contains("lenient: parse quality 0.00 below 0.30"));

            let check: ParseOutcome<SafetyCheckResult> = Fixture::new().run("{oops no json here", mode);
            assert!(check.is_default(), "{mode}: {check:?}");
            assert!(check.value().is_safe);
        }
    }

    #[test]
    fn lenient_object_missing_required_field_escalates() {
        let out: ParseOutcome<AnalysisResult> =
            Fixture::new().run("{'riskLevel': 'DANGER'}", ParseMode::Standard);
        assert!(out.is_default());
        assert!(out
            .reason()
            .unwrap()
            .contains("lenient: required field `replySuggestion` unresolved"));
    }

    #[test]
    fn quality_counts_evidence_backed_fields() {
        let f = Fixture::new();
        let cx = Extraction {
            table: &f.table,
            config: &f.config,
            patterns: &f.patterns,
            structural: true,
        };
        let node = serde_json::json!({"replySuggestion": "hi", "strategyAnalysis": "calm"});
        let extracted = AnalysisResult::extract(&node, &cx);
        // riskLevel is only inferred
        assert!((extracted.quality() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(check_quality(&extracted, 0.9).unwrap_err().to_string(), "parse quality 0.67 below 0.90");

        let empty = AnalysisResult::extract(&serde_json::json!({"x": 1}), &cx);
        assert_eq!(empty.quality(), 0.0);
        assert!(check_quality(&empty, 0.0).is_err());
    }

    #[test]
    fn recovered_outcomes_report_quality() {
        let out: ParseOutcome<SafetyCheckResult> =
            Fixture::new().run("{isSafe: False, 'suggestion': 'calm down'", ParseMode::Standard);
        assert_eq!(out.warnings().last().map(String::as_str), Some("parse quality: 0.67"));
    }

    #[test]
    fn missing_required_field_is_filled_from_text() {
        // `replySuggestion` sits outside the object span the cleaner keeps
        let raw = "回复建议：明天见\n{\"riskLevel\": \"SAFE\"}";
        let out: ParseOutcome<AnalysisResult> = Fixture::new().run(raw, ParseMode::Intelligent);
        assert_eq!(out.tag(), OutcomeTag::Recovered);
        assert_eq!(out.value().reply_suggestion, "明天见");
        assert_eq!(out.warnings()[0], "replySuggestion: filled from raw text");
    }

    #[test]
    fn standard_mode_does_not_fill() {
        let raw = "回复建议：明天见\n{\"riskLevel\": \"SAFE\"}";
        let out: ParseOutcome<AnalysisResult> = Fixture::new().run(raw, ParseMode::Standard);
        assert_eq!(out.tag(), OutcomeTag::Success);
        assert_eq!(out.value().reply_suggestion, NormalizerConfig::defaults().placeholders.reply_suggestion);
    }

    #[test]
    fn prose_recovers_through_heuristics() {
        let raw = "好的，分析如下。\n**回复建议**：可以问问她周末的安排\n**风险等级**：低";
        let out: ParseOutcome<AnalysisResult> = Fixture::new().run(raw, ParseMode::Fallback);
        assert_eq!(out.tag(), OutcomeTag::Recovered);
        assert_eq!(out.value().reply_suggestion, "可以问问她周末的安排");
        assert_eq!(out.value().risk_level, RiskLevel::Safe);
    }

    #[test]
    fn standard_mode_skips_heuristics() {
        let raw = "**回复建议**：可以问问她周末的安排";
        let out: ParseOutcome<AnalysisResult> = Fixture::new().run(raw, ParseMode::Standard);
        assert!(out.is_default());
        assert!(out.reason().unwrap().contains("heuristic tier disabled"));
    }

    #[test]
    fn empty_input_uses_default_with_chained_reason() {
        let out: ParseOutcome<AnalysisResult> = Fixture::new().run("", ParseMode::Intelligent);
        assert!(out.is_default());
        let reason = out.reason().unwrap();
        assert!(reason.starts_with("strict: syntax fault"));
        assert!(reason.contains("lenient: syntax fault"));
        assert!(reason.contains("heuristic: no recognisable fields"));
        assert!(!out.value().reply_suggestion.trim().is_empty());
    }

    #[test]
    fn polish_heuristic_uses_raw_text() {
        let out: ParseOutcome<PolishResult> = Fixture::new().run("今晚要不要一起吃饭？", ParseMode::Intelligent);
        assert_eq!(out.tag(), OutcomeTag::Recovered);
        assert_eq!(out.value().polished_text, "今晚要不要一起吃饭？");
    }

    #[test]
    fn guarded_contains_panics() {
        let err = guarded::<()>(Tier::Lenient, || panic!("boom")).unwrap_err();
        match err {
            NormalizeError::Internal { tier, message } => {
                assert_eq!(tier, Tier::Lenient);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn inference_alone_is_not_recovery() {
        let f = Fixture::new();
        let cx = Extraction {
            table: &f.table,
            config: &f.config,
            patterns: &f.patterns,
            structural: true,
        };
        // only keyword inference fires on this text
        let err = heuristic_tier::<AnalysisResult>("be careful here", &cx).unwrap_err();
        assert!(matches!(err, NormalizeError::NothingRecognised));
        let extracted = AnalysisResult::from_text("be careful here", &cx);
        assert_eq!(extracted.source("riskLevel"), Some(&FieldSource::Inferred));
    }
}
