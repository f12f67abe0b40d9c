//! Static response corpora used across harnesses.
//!
//! Each corpus is a `&'static [&'static str]` of model responses in one
//! failure style. Every entry of the recoverable corpora carries a reply
//! suggestion, so harnesses can assert on it uniformly.

/// Well-formed JSON with canonical keys.
pub const CORPUS_CANONICAL: &[&str] = &[
    r#"{"replySuggestion":"周末一起去看展吧","strategyAnalysis":"对方对艺术感兴趣","riskLevel":"SAFE"}"#,
    r#"{"replySuggestion":"Sounds great, see you then","strategyAnalysis":"Positive tone","riskLevel":"WARNING"}"#,
    r#"{"riskLevel":"DANGER","replySuggestion":"先别回复","strategyAnalysis":"对方情绪激动"}"#,
];

/// JSON wrapped in fences, prose or both, sometimes with trailing commas.
pub const CORPUS_WRAPPED: &[&str] = &[
    "```json\n{\"replySuggestion\":\"你好\",\"riskLevel\":\"SAFE\"}\n```",
    "```\n{\"replySuggestion\":\"你好\",}\n```",
    "好的，以下是分析结果：\n{\"replySuggestion\":\"你好\",\"strategyAnalysis\":\"保持轻松\"}\n希望对你有帮助！",
    "```markdown\n```json\n{\"replySuggestion\":\"你好\"}\n```\n```",
    "Here you go:\n```JSON\n{\n  \"replySuggestion\": \"你好\",\n  \"riskLevel\": \"SAFE\",\n}\n```",
];

/// Valid JSON that uses localized or separator-variant keys.
pub const CORPUS_LOCALIZED: &[&str] = &[
    r#"{"回复建议":"你好","风险等级":"SAFE"}"#,
    r#"{"建议回复":"你好","心理分析":"对方有点紧张"}"#,
    r#"{"reply_suggestion":"你好","risk-level":"low"}"#,
    r#"{"Reply Suggestion":"你好"}"#,
];

/// Broken JSON the lenient parser repairs.
pub const CORPUS_MALFORMED: &[&str] = &[
    "{'replySuggestion': '你好', 'riskLevel': 'SAFE'}",
    "{replySuggestion: \"你好\", riskLevel: WARNING}",
    "{\"replySuggestion\"：\"你好\"}",
    "{\"replySuggestion\": \"你好\" \"riskLevel\": \"SAFE\"}",
    "{\"replySuggestion\": \"你好\", // trailing note\n}",
    "{\"replySuggestion\": \"你好\", \"strategyAnalysis\": \"对方",
];

/// No JSON object at all; fields are labelled in prose.
pub const CORPUS_PROSE: &[&str] = &[
    "分析如下：\n**回复建议**：你好\n**风险等级**：低",
    "回复建议：你好\n策略分析：保持轻松",
    "Reply suggestion: 你好\nRisk level: medium",
    "模型输出被截断 \"replySuggestion\": \"你好\", \"strategyAnalysis\": \"对",
];

/// Nothing recoverable for the analysis, safety-check and extracted targets.
pub const CORPUS_UNRECOVERABLE: &[&str] = &[
    "",
    "   ",
    "null",
    "[]",
    "[1, 2, 3]",
    "}{",
    "42",
    "Sorry, I can't help with that.",
];
