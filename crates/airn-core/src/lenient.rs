//! Lenient JSON parser used by the second fallback tier.
//!
//! Produces the same [`GenericNode`] tree as `serde_json`, but accepts the
//! near-JSON models tend to write:
//!
//! - `'single'` quoted strings and unquoted keys
//! - the full-width colon `：` as a separator
//! - missing or trailing commas
//! - `//`, `/* */` and `#` comments
//! - `True` / `False` / `None` / `undefined` literals and bare-word values
//! - input that stops mid-object (open strings and containers are closed)
//! - anything after the top-level value
//!
//! Every accepted irregularity is recorded as a [`Deviation`]. Nesting deeper
//! than [`MAX_DEPTH`] is rejected so hostile input cannot exhaust the stack.

use crate::error::{NormalizeError, Result};
use crate::types::GenericNode;
use serde_json::{Map, Number, Value};
use std::fmt;

/// Same limit `serde_json` applies by default.
pub const MAX_DEPTH: usize = 128;

/// One kind of irregularity the parser tolerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deviation {
    SingleQuotes,
    BareKey,
    FullWidthColon,
    MissingColon,
    MissingComma,
    TrailingComma,
    Comment,
    Literal(String),
    BareWord,
    Unterminated,
    TrailingContent,
    StrayCharacter(char),
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deviation::SingleQuotes => write!(f, "single-quoted strings"),
            Deviation::BareKey => write!(f, "unquoted keys"),
            Deviation::FullWidthColon => write!(f, "full-width colon separator"),
            Deviation::MissingColon => write!(f, "missing colon after key"),
            Deviation::MissingComma => write!(f, "missing comma between members"),
            Deviation::TrailingComma => write!(f, "trailing or repeated comma"),
            Deviation::Comment => write!(f, "comments"),
            Deviation::Literal(lit) => write!(f, "non-JSON literal `{lit}`"),
            Deviation::BareWord => write!(f, "unquoted string value"),
            Deviation::Unterminated => write!(f, "unterminated input closed automatically"),
            Deviation::TrailingContent => write!(f, "content after the top-level value ignored"),
            Deviation::StrayCharacter(c) => write!(f, "stray character `{c}` skipped"),
        }
    }
}

/// A parsed tree plus the irregularities accepted along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct LenientParse {
    pub node: GenericNode,
    /// Distinct deviations in order of first occurrence.
    pub deviations: Vec<Deviation>,
}

/// Parse `text` leniently. Fails only on empty input or excessive nesting.
pub fn parse_lenient(text: &str) -> Result<LenientParse> {
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
        deviations: Vec::new(),
    };
    parser.skip_trivia();
    if parser.peek().is_none() {
        return Err(NormalizeError::Syntax("empty input".into()));
    }
    let node = parser.value(0)?;
    parser.skip_trivia();
    if parser.peek().is_some() {
        parser.note(Deviation::TrailingContent);
    }
    Ok(LenientParse {
        node,
        deviations: parser.deviations,
    })
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    chars: Vec<char>,
    pos: usize,
    deviations: Vec<Deviation>,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn note(&mut self, deviation: Deviation) {
        if !self.deviations.contains(&deviation) {
            self.deviations.push(deviation);
        }
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() || c == '\u{feff}' => self.pos += 1,
                (Some('/'), Some('/')) | (Some('#'), _) => {
                    self.note(Deviation::Comment);
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    self.note(Deviation::Comment);
                    self.pos += 2;
                    while self.peek().is_some() && !(self.peek() == Some('*') && self.peek_at(1) == Some('/')) {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.chars.len());
                }
                _ => return,
            }
        }
    }

    /// Whitespace followed by a comment opener ends a bare word.
    fn comment_follows(&self, c: char) -> bool {
        c.is_whitespace()
            && matches!(
                (self.peek_at(1), self.peek_at(2)),
                (Some('#'), _) | (Some('/'), Some('/' | '*'))
            )
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        self.skip_trivia();
        match self.peek() {
            None => {
                self.note(Deviation::Unterminated);
                Ok(Value::Null)
            }
            Some('{') => self.object(depth + 1),
            Some('[') => self.array(depth + 1),
            Some(q @ ('"' | '\'')) => Ok(Value::String(self.string(q))),
            Some(_) => Ok(self.bare_value()),
        }
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(NormalizeError::Syntax(format!(
                "nesting deeper than {MAX_DEPTH} levels"
            )));
        }
        Ok(())
    }

    fn object(&mut self, depth: usize) -> Result<Value> {
        self.check_depth(depth)?;
        self.bump(); // '{'
        let mut map = Map::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => {
                    self.note(Deviation::Unterminated);
                    break;
                }
                Some('}') => {
                    self.bump();
                    break;
                }
                Some(',') => {
                    self.bump();
                    self.note(Deviation::TrailingComma);
                    continue;
                }
                _ => {}
            }

            let Some(key) = self.key() else {
                if let Some(c) = self.bump() {
                    self.note(Deviation::StrayCharacter(c));
                }
                continue;
            };

            self.skip_trivia();
            let value = match self.peek() {
                Some(':') => {
                    self.bump();
                    self.value(depth)?
                }
                Some('：') => {
                    self.bump();
                    self.note(Deviation::FullWidthColon);
                    self.value(depth)?
                }
                Some(',' | '}') | None => {
                    self.note(Deviation::MissingColon);
                    Value::Null
                }
                Some(_) => {
                    self.note(Deviation::MissingColon);
                    self.value(depth)?
                }
            };
            map.insert(key, value);

            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.bump();
                    self.skip_trivia();
                    if self.peek() == Some('}') {
                        self.note(Deviation::TrailingComma);
                    }
                }
                Some('}') | None => {}
                Some(_) => self.note(Deviation::MissingComma),
            }
        }
        Ok(Value::Object(map))
    }

    fn array(&mut self, depth: usize) -> Result<Value> {
        self.check_depth(depth)?;
        self.bump(); // '['
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => {
                    self.note(Deviation::Unterminated);
                    break;
                }
                Some(']') => {
                    self.bump();
                    break;
                }
                Some(',') => {
                    self.bump();
                    self.note(Deviation::TrailingComma);
                    continue;
                }
                Some('}') => {
                    self.bump();
                    self.note(Deviation::StrayCharacter('}'));
                    continue;
                }
                _ => {}
            }

            items.push(self.value(depth)?);

            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.bump();
                    self.skip_trivia();
                    if self.peek() == Some(']') {
                        self.note(Deviation::TrailingComma);
                    }
                }
                Some(']') | None => {}
                Some(_) => self.note(Deviation::MissingComma),
            }
        }
        Ok(Value::Array(items))
    }

    /// Quoted or bare object key. `None` when no key starts here.
    fn key(&mut self) -> Option<String> {
        match self.peek()? {
            q @ ('"' | '\'') => Some(self.string(q)),
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || matches!(c, ':' | '：' | ',' | '{' | '}' | '[' | ']' | '"' | '\'') {
                        break;
                    }
                    self.pos += 1;
                }
                if self.pos == start {
                    return None;
                }
                self.note(Deviation::BareKey);
                Some(self.chars[start..self.pos].iter().collect())
            }
        }
    }

    fn string(&mut self, quote: char) -> String {
        if quote == '\'' {
            self.note(Deviation::SingleQuotes);
        }
        self.bump(); // opening quote
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                self.note(Deviation::Unterminated);
                break;
            };
            match c {
                c if c == quote => break,
                '\\' => self.escape(&mut out),
                c => out.push(c),
            }
        }
        out
    }

    fn escape(&mut self, out: &mut String) {
        let Some(c) = self.bump() else {
            return;
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'u' => {
                let Some(high) = self.hex4() else {
                    out.push_str("\\u");
                    return;
                };
                let code = if (0xD800..0xDC00).contains(&high)
                    && self.peek() == Some('\\')
                    && self.peek_at(1) == Some('u')
                {
                    let save = self.pos;
                    self.pos += 2;
                    match self.hex4() {
                        Some(low) if (0xDC00..0xE000).contains(&low) => {
                            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                        }
                        _ => {
                            self.pos = save;
                            high
                        }
                    }
                } else {
                    high
                };
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            other => out.push(other),
        }
    }

    fn hex4(&mut self) -> Option<u32> {
        let digits: String = self.chars.get(self.pos..self.pos + 4)?.iter().collect();
        let code = u32::from_str_radix(&digits, 16).ok()?;
        self.pos += 4;
        Some(code)
    }

    /// Numbers, literals and unquoted words, read up to the next delimiter.
    fn bare_value(&mut self) -> Value {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '}' | ']' | '\n' | '\r') || self.comment_follows(c) {
                break;
            }
            self.pos += 1;
        }
        let token: String = self.chars[start..self.pos].iter().collect();
        let token = token.trim();

        match token {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            "null" => return Value::Null,
            "True" | "TRUE" => {
                self.note(Deviation::Literal(token.to_string()));
                return Value::Bool(true);
            }
            "False" | "FALSE" => {
                self.note(Deviation::Literal(token.to_string()));
                return Value::Bool(false);
            }
            "None" | "undefined" | "NULL" | "nil" => {
                self.note(Deviation::Literal(token.to_string()));
                return Value::Null;
            }
            _ => {}
        }
        if let Some(number) = parse_number(token) {
            return Value::Number(number);
        }
        if token.is_empty() {
            // missing value; the enclosing container deals with the delimiter
            return Value::Null;
        }
        self.note(Deviation::BareWord);
        Value::String(token.to_string())
    }
}

fn parse_number(token: &str) -> Option<Number> {
    let first = token.chars().next()?;
    if !(first.is_ascii_digit() || first == '-' || first == '+') {
        return None;
    }
    let token = token.strip_prefix('+').unwrap_or(token);
    if let Ok(n) = token.parse::<i64>() {
        return Some(n.into());
    }
    if let Ok(n) = token.parse::<u64>() {
        return Some(n.into());
    }
    token
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
