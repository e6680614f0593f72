//! Flat `.env` file model
//!
//! Keeps comments, blank lines and key order so a rewrite only touches the
//! values that changed.

use crate::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Blank,
    Comment(String),
    Entry {
        key: String,
        value: String,
        /// Inline comment after the value, with its leading whitespace
        trailing: Option<String>,
    },
}

/// Parsed environment file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    lines: Vec<Line>,
}

/// Check `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unquote(raw: &str) -> String {
    let bytes = raw.as_bytes();
    if raw.len() >= 2 {
        let (first, last) = (bytes[0], bytes[raw.len() - 1]);
        if first == b'\'' && last == b'\'' {
            return raw[1..raw.len() - 1].to_string();
        }
        if first == b'"' && last == b'"' {
            let inner = &raw[1..raw.len() - 1];
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    match chars.next() {
                        Some('n') => out.push('\n'),
                        Some(other) => out.push(other),
                        None => out.push('\\'),
                    }
                } else {
                    out.push(c);
                }
            }
            return out;
        }
    }
    raw.to_string()
}

/// Split a raw value into the value part and an inline ` # comment`.
///
/// In unquoted values `#` starts a comment only after whitespace, so
/// `pa#ss` stays intact. Quoted values end at their closing quote.
fn split_inline_comment(raw: &str) -> (&str, Option<&str>) {
    let end = match raw.chars().next() {
        Some(q @ ('"' | '\'')) => closing_quote(raw, q),
        _ => {
            let hash = raw.char_indices().find(|&(i, c)| {
                c == '#' && raw[..i].ends_with(|p: char| p.is_whitespace())
            });
            return match hash {
                Some((i, _)) => {
                    let value = raw[..i].trim_end();
                    (value, Some(&raw[value.len()..]))
                }
                None => (raw, None),
            };
        }
    };
    match end {
        Some(i) if raw[i + 1..].trim_start().starts_with('#') => {
            (&raw[..=i], Some(&raw[i + 1..]))
        }
        _ => (raw, None),
    }
}

/// Byte index of the quote closing the one at position 0.
fn closing_quote(raw: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in raw.char_indices().skip(1) {
        match c {
            '\\' if quote == '"' && !escaped => escaped = true,
            c if c == quote && !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

fn quote(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '$' | '\\'));
    if !needs_quotes {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

impl EnvFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse env file content.
    ///
    /// Accepts `KEY=value` and `export KEY=value`; values in matching single or
    /// double quotes are unquoted. An inline `# comment` after the value is
    /// kept for `render` but is not part of the value.
    pub fn parse(content: &str) -> Result<Self, DomainError> {
        let mut lines = Vec::new();
        for (idx, raw) in content.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                lines.push(Line::Blank);
                continue;
            }
            if trimmed.starts_with('#') {
                lines.push(Line::Comment(raw.to_string()));
                continue;
            }
            let assignment = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let (key, value) =
                assignment
                    .split_once('=')
                    .ok_or_else(|| DomainError::InvalidEnvLine {
                        line_no: idx + 1,
                        message: format!("expected KEY=value, got '{trimmed}'"),
                    })?;
            let key = key.trim();
            if !is_valid_key(key) {
                return Err(DomainError::InvalidEnvLine {
                    line_no: idx + 1,
                    message: format!("invalid key '{key}'"),
                });
            }
            let (value, trailing) = split_inline_comment(value.trim());
            lines.push(Line::Entry {
                key: key.to_string(),
                value: unquote(value),
                trailing: trailing.map(str::to_string),
            });
        }
        Ok(Self { lines })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|l| match l {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Value if present and not blank.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// Update an existing key in place or append it.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), DomainError> {
        if !is_valid_key(key) {
            return Err(DomainError::InvalidKey(key.to_string()));
        }
        let value = value.into();
        let existing = self.lines.iter_mut().rev().find_map(|l| match l {
            Line::Entry { key: k, value, .. } if k == key => Some(value),
            _ => None,
        });
        match existing {
            Some(slot) => *slot = value,
            None => self.lines.push(Line::Entry {
                key: key.to_string(),
                value,
                trailing: None,
            }),
        }
        Ok(())
    }

    pub fn push_comment(&mut self, text: &str) {
        self.lines.push(Line::Comment(format!("# {text}")));
    }

    pub fn keys(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                Line::Entry { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Serialize back to `KEY=value` lines with a trailing newline.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Blank => {}
                Line::Comment(c) => out.push_str(c),
                Line::Entry {
                    key,
                    value,
                    trailing,
                } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(&quote(value));
                    if let Some(comment) = trailing {
                        out.push_str(comment);
                    }
                }
            }
            out.push('\n');
        }
        out
    }
}
