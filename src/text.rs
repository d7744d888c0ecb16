//! Text normalization for AI output before it is shown, copied or pasted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static EXCESS_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid blank-line pattern"));

static HORIZONTAL_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("valid whitespace pattern"));

static THINKING_BLOCKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid thinking-block pattern"));

/// Text that has already been through [`normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize escaped or whitespace-irregular text.
///
/// 1. literal `\n`, `\r\n`, `\r` become a newline, `\t` a tab, `\"` and `\'`
///    the bare quote (some upstream layers double-escape);
/// 2. three or more newlines, optionally separated by spaces/tabs, become one
///    blank line;
/// 3. runs of spaces/tabs become a single space;
/// 4. leading and trailing whitespace is trimmed.
///
/// `normalize(&normalize(x)) == normalize(x)` for every `x`.
pub fn normalize(raw: &str) -> String {
    let unescaped = unescape(raw);
    let collapsed = EXCESS_BLANK_LINES.replace_all(&unescaped, "\n\n");
    let spaced = HORIZONTAL_RUNS.replace_all(&collapsed, " ");
    spaced.trim().to_string()
}

/// Remove `<think>…</think>` reasoning blocks some models prepend to answers.
pub fn strip_thinking_blocks(text: &str) -> String {
    THINKING_BLOCKS.replace_all(text, "").into_owned()
}

/// Post-process a model answer: drop reasoning blocks, then normalize.
pub fn process_response(raw: &str) -> NormalizedText {
    NormalizedText::new(&strip_thinking_blocks(raw))
}

// Single left-to-right pass. A doubled backslash is kept as-is so it can never
// pair up with the character after it on a later pass.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek().copied() {
                Some('\\') => {
                    chars.next();
                    out.push_str("\\\\");
                }
                Some('n') => {
                    chars.next();
                    out.push('\n');
                }
                Some('r') => {
                    chars.next();
                    // `\r\n` is one line break, not two.
                    let mut ahead = chars.clone();
                    if ahead.next() == Some('\\') && ahead.next() == Some('n') {
                        chars.next();
                        chars.next();
                    }
                    out.push('\n');
                }
                Some('t') => {
                    chars.next();
                    out.push('\t');
                }
                Some(q @ ('"' | '\'')) => {
                    chars.next();
                    out.push(q);
                }
                _ => out.push('\\'),
            },
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            other => out.push(other),
        }
    }

    out
}
