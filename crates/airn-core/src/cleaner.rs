//! TextCleaner: cuts the JSON object out of whatever the model wrapped it in.
//!
//! [`clean`] applies three steps, each exposed on its own:
//!
//! 1. [`strip_fences`]: remove leading markdown code fences (repeatedly).
//! 2. [`object_span`]: keep the first `{` through the last `}`.
//! 3. [`remove_trailing_commas`]: drop commas that only precede a closer.
//!
//! The result is trimmed. `clean(clean(x)) == clean(x)` for every input.

const FENCE: &str = "```";

/// Run every cleaning step. Never fails; returns the trimmed input when there
/// was nothing to clean.
pub fn clean(raw: &str) -> String {
    let unfenced = strip_fences(raw);
    let span = object_span(unfenced).unwrap_or(unfenced);
    trim_text(&remove_trailing_commas(span)).to_string()
}

// ---------------------------------------------------------------------------
// Fences
// ---------------------------------------------------------------------------

/// Strip leading code fences until none remain.
///
/// The opening fence may carry a language tag (` ```json `); the tag is only
/// consumed when a line break, an opening bracket or the end of input follows
/// it. Everything from the closing fence onward is discarded with it.
pub fn strip_fences(raw: &str) -> &str {
    let mut text = trim_text(raw);
    while let Some(after) = text.strip_prefix(FENCE) {
        let after = after.trim_start_matches('`');
        let body = trim_text(skip_language_tag(after));
        if body.starts_with(FENCE) {
            text = body;
            continue;
        }
        text = match body.find(FENCE) {
            Some(end) => trim_text(&body[..end]),
            None => body,
        };
    }
    text
}

fn skip_language_tag(s: &str) -> &str {
    let tag_len = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')))
        .map_or(s.len(), |(i, _)| i);
    if tag_len == 0 {
        return s;
    }
    let rest = &s[tag_len..];
    match rest.chars().next() {
        None | Some('\n' | '\r' | '{' | '[') => rest,
        _ => s,
    }
}

// ---------------------------------------------------------------------------
// Object span
// ---------------------------------------------------------------------------

/// The slice from the first `{` to the last `}`, if the closer comes later.
///
/// Internal syntax of the span is not checked.
pub fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

// ---------------------------------------------------------------------------
// Trailing commas
// ---------------------------------------------------------------------------

/// Remove every comma that is followed, after whitespace and further commas,
/// by `}` or `]`. Commas inside string literals are left alone.
pub fn remove_trailing_commas(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            out.push(c);
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            ',' if precedes_closer(&bytes[i + 1..]) => {}
            _ => out.push(c),
        }
    }
    out
}

fn precedes_closer(rest: &[u8]) -> bool {
    rest.iter()
        .find(|b| !(b.is_ascii_whitespace() || **b == b','))
        .is_some_and(|b| matches!(b, b'}' | b']'))
}

fn trim_text(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
