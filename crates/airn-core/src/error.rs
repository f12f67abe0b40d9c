//! Error types for the normalization pipeline.
//!
//! None of these ever reach a `normalize` caller: each tier returns them to the
//! fallback driver, which escalates to the next tier and finally folds the
//! chain into the `reason` of a `DefaultUsed` outcome.

use crate::types::Tier;

/// Internal fault raised by one pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// Text is not parseable, even after cleaning.
    #[error("syntax fault: {0}")]
    Syntax(String),

    /// Parsing succeeded but the root is not an object.
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// A required field stayed unresolved after extraction.
    #[error("required field `{0}` unresolved")]
    MissingField(&'static str),

    /// The heuristic tier found nothing it could attribute to a field.
    #[error("no recognisable fields in raw text")]
    NothingRecognised,

    /// Too few fields backed by evidence to trust the result.
    #[error("parse quality {score:.2} below {min:.2}")]
    LowQuality { score: f64, min: f64 },

    /// The tier is not enabled for the requested mode.
    #[error("{0} tier disabled in this mode")]
    TierDisabled(Tier),

    /// A tier panicked; the panic was contained.
    #[error("internal fault in {tier} tier: {message}")]
    Internal { tier: Tier, message: String },

    /// A synonym table failed validation.
    #[error("invalid synonym table: {0}")]
    SynonymTable(String),

    /// A field pattern failed to compile.
    #[error("invalid field pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration could not be loaded or deserialized.
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, NormalizeError>;
