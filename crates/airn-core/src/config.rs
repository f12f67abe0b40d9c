//! Configuration types for airn.
//!
//! [`NormalizerConfig::defaults`] builds the configuration from the embedded
//! [`DEFAULT_CONFIG`] document without touching the filesystem.
//! [`NormalizerConfig::load`] layers an optional user file (TOML, YAML or JSON,
//! chosen by extension) on top of the same defaults. Arrays in the user file
//! replace the default arrays wholesale.
//!
//! The `[[synonyms]]` tables are the static source of the process-wide
//! [`SynonymTable`](crate::synonyms::SynonymTable). The keyword lists are
//! heuristic data rather than code so deployments can tune them.

use crate::error::Result;
use crate::types::ParseMode;
use serde::Deserialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_CONFIG: &str = r#"
[pipeline]
default_mode    = "intelligent"
max_input_bytes = 262144
min_quality     = 0.3

[matching]
fuzzy           = false
fuzzy_threshold = 0.8

[[synonyms]]
canonical = "replySuggestion"
aliases   = ["回复建议", "建议回复", "话术建议", "具体的回复建议", "建议的回复内容", "回复内容", "reply suggestion"]

[[synonyms]]
canonical = "strategyAnalysis"
aliases   = ["策略分析", "心理分析", "军师分析", "对方当前的情绪和潜在意图", "关键洞察", "策略建议", "strategy analysis"]

[[synonyms]]
canonical = "riskLevel"
aliases   = ["风险等级", "风险级别", "风险程度", "risk level"]

[[synonyms]]
canonical = "isSafe"
aliases   = ["是否安全", "安全性", "安全状态"]

[[synonyms]]
canonical = "triggeredRisks"
aliases   = ["触发的风险", "风险列表", "雷区列表", "触发雷区", "triggered risks"]

[[synonyms]]
canonical = "suggestion"
aliases   = ["建议", "修改建议", "修正建议", "优化建议"]

[[synonyms]]
canonical = "facts"
aliases   = ["事实", "事实信息", "基本信息", "个人资料", "用户信息"]

[[synonyms]]
canonical = "redTags"
aliases   = ["红色标签", "雷区", "风险标签", "红标签", "不要做的事", "敏感话题", "red tags"]

[[synonyms]]
canonical = "greenTags"
aliases   = ["绿色标签", "策略标签", "绿标签", "推荐做法", "沟通技巧", "green tags"]

[[synonyms]]
canonical = "polishedText"
aliases   = ["润色结果", "润色后的文本", "润色文本", "polished"]

[[synonyms]]
canonical = "hasRisk"
aliases   = ["是否有风险", "存在风险"]

[[synonyms]]
canonical = "riskWarning"
aliases   = ["风险提示", "风险警告"]

[[synonyms]]
canonical = "suggestedReply"
aliases   = ["推荐回复", "回复文本"]

[[synonyms]]
canonical = "strategyNote"
aliases   = ["策略说明", "策略备注"]

[keywords]
danger  = ["高风险", "危险", "严重", "紧急", "立即", "禁止", "绝对不能", "severe", "immediate", "high risk", "dangerous", "critical"]
warning = ["风险", "注意", "谨慎", "小心", "避免", "不宜", "caution", "avoid", "be careful", "risky"]
unsafe  = ["不安全", "unsafe", "not safe", "危险", "高风险", "严重"]
safe    = ["安全", "无风险", "正常", "safe", "no risk"]
red_tag   = ["不要", "避免", "禁止", "风险", "警告", "敏感", "隐私", "前任", "收入", "don't", "avoid", "never", "risk", "warning"]
green_tag = ["推荐", "建议", "可以", "分享", "讨论", "兴趣", "旅行", "美食", "recommend", "suggest", "should", "good"]
fact      = ["生日", "爱好", "职业", "年龄", "性别", "地区", "birthday", "hobby", "profession", "age", "job", "location"]

[placeholders]
reply_suggestion  = "I understand what you mean, let's keep talking about it."
strategy_analysis = "Analysis complete. Keep a friendly tone and share your own view where it fits."
polished_text     = "The draft could not be polished automatically; please review it before sending."
suggested_reply   = "No reply suggestion is available right now."
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level normalizer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub synonyms: Vec<SynonymEntry>,
    pub keywords: KeywordConfig,
    pub placeholders: Placeholders,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub default_mode: ParseMode,
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
    /// Share of fields a lenient or heuristic result must back with evidence.
    #[serde(default = "default_min_quality")]
    pub min_quality: f64,
}

fn default_max_input_bytes() -> usize { 256 * 1024 }
fn default_min_quality() -> f64 { 0.3 }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_mode: ParseMode::default(),
            max_input_bytes: default_max_input_bytes(),
            min_quality: default_min_quality(),
        }
    }
}

/// `[matching]` section: how loosely keys are matched to canonical names.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub fuzzy: bool,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
}

fn default_fuzzy_threshold() -> f64 { 0.8 }

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy: false,
            fuzzy_threshold: default_fuzzy_threshold(),
        }
    }
}

/// One `[[synonyms]]` table: a canonical field and the spellings that map to it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SynonymEntry {
    pub canonical: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl SynonymEntry {
    pub fn new(canonical: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            canonical: canonical.into(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// `[keywords]` section. Matching is case-insensitive substring search.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordConfig {
    pub danger: Vec<String>,
    pub warning: Vec<String>,
    #[serde(rename = "unsafe")]
    pub unsafe_cues: Vec<String>,
    #[serde(rename = "safe")]
    pub safe_cues: Vec<String>,
    pub red_tag: Vec<String>,
    pub green_tag: Vec<String>,
    pub fact: Vec<String>,
}

/// `[placeholders]` section: text for required string fields nothing resolved.
#[derive(Debug, Clone, Deserialize)]
pub struct Placeholders {
    pub reply_suggestion: String,
    pub strategy_analysis: String,
    pub polished_text: String,
    pub suggested_reply: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl NormalizerConfig {
    /// Load the embedded defaults with `path` layered on top, if it exists.
    pub fn load(path: &Path) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path).required(false))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Layer a TOML document over the embedded defaults.
    pub fn from_toml_str(overrides: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from_str(overrides, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
