//! airn-core: resilient normalization of LLM JSON responses.
//!
//! Language models asked for a JSON object routinely answer with prose,
//! markdown fences, localized field names, stringly-typed booleans or no JSON
//! at all. This crate turns any such text into one of a small set of typed
//! records and never fails doing so.
//!
//! # Architecture
//!
//! ```text
//! raw text ──► cleaner ──► strict / lenient parse ──► canonicalizer ──► extract ──► record
//!                 │                                                        ▲
//!                 └──────────────► heuristic (regex over raw text) ────────┘
//!                                         │
//!                                         └──► canned default
//! ```
//!
//! The [`fallback`] module drives the four tiers; [`pipeline::Normalizer`]
//! is the single entry point. All stages are synchronous and pure; the only
//! shared state is the write-once [`synonyms::SynonymTable`].

pub mod canonicalizer;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod heuristic;
pub mod lenient;
pub mod pipeline;
pub mod synonyms;
pub mod types;

pub use error::{NormalizeError, Result};
pub use extract::Record;
pub use pipeline::{normalize, normalize_as, Normalizer};
pub use synonyms::SynonymTable;
pub use types::{
    AnalysisResult, AnyRecord, ExtractedData, GenericNode, OutcomeTag, ParseMode, ParseOutcome,
    PolishResult, ReplyResult, RiskLevel, SafetyCheckResult, TargetType, Tier,
};

/// Drop every process-wide cache (synonym table and shared normalizer).
///
/// The next call to [`normalize`] or [`SynonymTable::shared`] rebuilds from
/// the embedded configuration. Normalizations already in flight keep the
/// instance they started with.
pub fn clear_cache() {
    pipeline::clear_cache();
    synonyms::clear_cache();
}
