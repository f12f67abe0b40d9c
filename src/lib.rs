//! airn: AI response normalizer
//!
//! Facade over [`airn_core`] plus the JSON [`report`] the `airn` binary
//! prints. Integration tests and benches import everything from here.
//!
//! # Architecture
//!
//! ```text
//! captured response ──► airn_core::Normalizer ──► ParseOutcome ──► report
//! ```

pub mod report;

pub use airn_core::{
    canonicalizer, cleaner, clear_cache, config, error, extract, fallback, heuristic, lenient,
    normalize, normalize_as, pipeline, synonyms, types, AnalysisResult, AnyRecord, ExtractedData,
    GenericNode, NormalizeError, Normalizer, OutcomeTag, ParseMode, ParseOutcome, PolishResult,
    Record, ReplyResult, RiskLevel, SafetyCheckResult, SynonymTable, TargetType, Tier,
};
