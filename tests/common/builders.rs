//! Test builders: ergonomic constructors for model responses and normalizers.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use airn::config::NormalizerConfig;
use airn::Normalizer;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// ResponseBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for raw model responses.
///
/// # Example
///
/// ```rust
/// let raw = ResponseBuilder::new()
///     .field("回复建议", "你好")
///     .field("riskLevel", "SAFE")
///     .trailing_comma()
///     .fenced("json")
///     .prose("好的，结果如下：")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    fields: Map<String, Value>,
    fence: Option<String>,
    prose: Option<String>,
    trailing_comma: bool,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Wrap the JSON in a code fence with the given language tag (may be empty).
    pub fn fenced(mut self, tag: &str) -> Self {
        self.fence = Some(tag.to_string());
        self
    }

    /// Put a line of prose before the JSON.
    pub fn prose(mut self, text: &str) -> Self {
        self.prose = Some(text.to_string());
        self
    }

    pub fn trailing_comma(mut self) -> Self {
        self.trailing_comma = true;
        self
    }

    pub fn build(self) -> String {
        let mut json = serde_json::to_string_pretty(&Value::Object(self.fields)).unwrap();
        if self.trailing_comma {
            if let Some(close) = json.rfind('}') {
                let body = json[..close].trim_end().to_string();
                json = format!("{body},\n}}");
            }
        }
        if let Some(tag) = self.fence {
            json = format!("```{tag}\n{json}\n```");
        }
        match self.prose {
            Some(prose) => format!("{prose}\n{json}"),
            None => json,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalizer helpers
// ---------------------------------------------------------------------------

/// A fresh normalizer with `toml` layered over the built-in configuration.
pub fn normalizer_with(toml: &str) -> Normalizer {
    let config = NormalizerConfig::from_toml_str(toml).unwrap();
    Normalizer::new(config).unwrap()
}

/// A fresh normalizer on the built-in configuration, independent of the
/// process-wide instance.
pub fn fresh_normalizer() -> Normalizer {
    Normalizer::new(NormalizerConfig::defaults()).unwrap()
}
