//! [`ToolCallParser`] – turns a memory-plan reply into [`ToolInvocation`]s.
//!
//! The planning model is asked for `{"tools": ["name(\"argument\")", ...]}`,
//! but it routinely forgets to escape the quotes around and inside the
//! argument, drops the commas between entries, or leaves a call unquoted.
//! Parsing therefore runs in two passes:
//!
//! 1. The payload is parsed as JSON as-is.
//! 2. If that fails, [`normalize`] rewrites every pseudo-call of the shape
//!    `name(<quote> argument <quote>)` into a correctly escaped JSON string
//!    and inserts missing commas between adjacent strings. The result is
//!    parsed again; if it still fails the reply is a
//!    [`NaoError::PlanFormat`].
//!
//! A missing `tools` key or an empty list yields no invocations. Entry order
//! is preserved.
//!
//! # Example
//!
//! ```rust
//! use nao_runtime::tool_parser::ToolCallParser;
//!
//! let reply = r#"{"tools": ["save_semantic_memory("He said "hi" today")"]}"#;
//! let calls = ToolCallParser::parse(reply).unwrap();
//! assert_eq!(calls[0].function_name, "save_semantic_memory");
//! assert_eq!(calls[0].argument, r#"He said "hi" today"#);
//! ```

use nao_types::{NaoError, ToolInvocation};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::payload::extract_payload;

#[derive(Deserialize)]
struct ToolList {
    #[serde(default)]
    tools: Option<Vec<String>>,
}

/// Parser for memory-plan replies.
pub struct ToolCallParser;

impl ToolCallParser {
    /// Parse `text` into an ordered list of tool invocations.
    ///
    /// # Errors
    ///
    /// [`NaoError::PlanFormat`] when the payload is not parseable even after
    /// normalisation.
    pub fn parse(text: &str) -> Result<Vec<ToolInvocation>, NaoError> {
        let payload = extract_payload(text);

        let list = match serde_json::from_str::<ToolList>(payload) {
            Ok(list) => list,
            Err(first) => {
                let normalized = normalize(payload);
                debug!(error = %first, normalized = %normalized, "tool list re-parsed after normalisation");
                serde_json::from_str::<ToolList>(&normalized)
                    .map_err(|e| NaoError::PlanFormat(format!("tool list is not valid JSON: {e}")))?
            }
        };

        Ok(list
            .tools
            .unwrap_or_default()
            .iter()
            .map(|entry| split_entry(entry))
            .collect())
    }
}

/// Split one list entry `name(argument)` into a [`ToolInvocation`].
///
/// The name is everything before the first `(`; the argument is everything
/// between that `(` and the last `)`, with one enclosing pair of matching
/// quotes removed.
fn split_entry(entry: &str) -> ToolInvocation {
    let entry = entry.trim();
    let Some(open) = entry.find('(') else {
        return ToolInvocation::new(entry, "");
    };
    let name = entry[..open].trim();
    let rest = &entry[open + 1..];
    let inner = match rest.rfind(')') {
        Some(close) => &rest[..close],
        None => rest,
    };
    ToolInvocation::new(name, strip_quotes(inner.trim()))
}

fn strip_quotes(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

// ─────────────────────────────────────────────────────────────────────────────
// Normaliser
// ─────────────────────────────────────────────────────────────────────────────

/// Where a pseudo-call was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    /// Inside a JSON string: `"name(...)"`.
    Quoted,
    /// Bare in the document: `name(...)`.
    Bare,
}

/// How the argument is opened (and must be closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opener {
    Double,
    Single,
    /// `\"`, i.e. an argument that was already escaped.
    Escaped,
    None,
}

struct Cursor<'a> {
    chars: &'a [char],
}

impl Cursor<'_> {
    fn at(&self, i: usize) -> Option<char> {
        self.chars.get(i).copied()
    }

    fn skip_ws(&self, mut i: usize) -> usize {
        while self.at(i).is_some_and(char::is_whitespace) {
            i += 1;
        }
        i
    }

    /// True when only whitespace separates `i` from a closing `]` or `}`.
    fn closes_after(&self, i: usize) -> bool {
        matches!(self.at(self.skip_ws(i)), Some(']' | '}'))
    }

    /// Index just past the JSON string starting at `start` (which holds `"`).
    fn skip_string(&self, start: usize) -> usize {
        let mut i = start + 1;
        while let Some(c) = self.at(i) {
            match c {
                '\\' => i += 2,
                '"' => return i + 1,
                _ => i += 1,
            }
        }
        self.chars.len()
    }

    /// Does a closing quote ending just before `i` terminate the call?
    ///
    /// Returns the index where normal scanning resumes.
    fn closes(&self, i: usize, ctx: Context) -> Option<usize> {
        let mut i = self.skip_ws(i);
        if self.at(i) != Some(')') {
            return None;
        }
        i = self.skip_ws(i + 1);
        if ctx == Context::Quoted {
            if self.at(i) != Some('"') {
                return None;
            }
            let resume = i + 1;
            let after = self.skip_ws(resume);
            return match self.at(after) {
                None | Some(',' | ']' | '}' | '"') => Some(resume),
                _ => None,
            };
        }
        match self.at(i) {
            None | Some(',' | ']' | '}' | '"') => Some(i),
            _ => None,
        }
    }

    /// Try to read `name(<quote> argument <quote>)` starting at `start`.
    fn call(&self, start: usize, ctx: Context) -> Option<(String, String, usize)> {
        let mut i = if ctx == Context::Quoted {
            self.skip_ws(start)
        } else {
            start
        };

        let name_start = i;
        if !self.at(i).is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
            return None;
        }
        while self.at(i).is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            i += 1;
        }
        let name: String = self.chars[name_start..i].iter().collect();

        i = self.skip_ws(i);
        if self.at(i) != Some('(') {
            return None;
        }
        i = self.skip_ws(i + 1);

        let opener = match (self.at(i), self.at(i + 1)) {
            (Some('\\'), Some('"')) => {
                i += 2;
                Opener::Escaped
            }
            (Some('"'), _) => {
                i += 1;
                Opener::Double
            }
            (Some('\''), _) => {
                i += 1;
                Opener::Single
            }
            _ => Opener::None,
        };

        let mut argument = String::new();
        while let Some(c) = self.at(i) {
            match (opener, c) {
                (Opener::Escaped, '\\') if self.at(i + 1) == Some('"') => {
                    if let Some(resume) = self.closes(i + 2, ctx) {
                        return Some((name, argument, resume));
                    }
                    argument.push('"');
                    i += 2;
                }
                (Opener::Double, '"') | (Opener::Single, '\'') => {
                    if let Some(resume) = self.closes(i + 1, ctx) {
                        return Some((name, argument, resume));
                    }
                    argument.push(c);
                    i += 1;
                }
                (Opener::None, ')') => {
                    if let Some(resume) = self.closes(i, ctx) {
                        return Some((name, argument.trim_end().to_string(), resume));
                    }
                    argument.push(c);
                    i += 1;
                }
                (_, '\\') => {
                    let (decoded, width) = self.escape(i);
                    argument.push_str(&decoded);
                    i += width;
                }
                _ => {
                    argument.push(c);
                    i += 1;
                }
            }
        }
        None
    }

    /// Decode the backslash escape at `i`. Returns the text and its width.
    fn escape(&self, i: usize) -> (String, usize) {
        let decoded = match self.at(i + 1) {
            Some('"') => '"',
            Some('\'') => '\'',
            Some('\\') => '\\',
            Some('/') => '/',
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some(other) => return (format!("\\{other}"), 2),
            None => return ("\\".to_string(), 1),
        };
        (decoded.to_string(), 2)
    }
}

/// Rewrite pseudo-calls in `payload` into well-formed JSON strings.
///
/// Text that is not a pseudo-call is copied through unchanged, except that a
/// comma is inserted between two adjacent string values and a trailing comma
/// before `]` or `}` is dropped.
///
/// ```rust
/// use nao_runtime::tool_parser::normalize;
///
/// let fixed = normalize(r#"{"tools": ["search_semantic_memory("Tamim's "favourite" color")" "save_semantic_memory('blue')"]}"#);
/// let v: serde_json::Value = serde_json::from_str(&fixed).unwrap();
/// assert_eq!(v["tools"][1], "save_semantic_memory(\"blue\")");
/// ```
pub fn normalize(payload: &str) -> String {
    let chars: Vec<char> = payload.chars().collect();
    let cur = Cursor { chars: &chars };
    let mut out = String::with_capacity(payload.len() + 16);
    let mut i = 0;

    while let Some(c) = cur.at(i) {
        if c == '"' {
            separate_strings(&mut out);
            if let Some((name, argument, resume)) = cur.call(i + 1, Context::Quoted) {
                out.push_str(&render_call(&name, &argument));
                i = resume;
            } else {
                let end = cur.skip_string(i);
                out.extend(&chars[i..end]);
                i = end;
            }
        } else if c.is_ascii_alphabetic() || c == '_' {
            if let Some((name, argument, resume)) = cur.call(i, Context::Bare) {
                separate_strings(&mut out);
                out.push_str(&render_call(&name, &argument));
                i = resume;
            } else {
                // Literals such as `true` / `null`.
                while cur.at(i).is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
                    out.push(chars[i]);
                    i += 1;
                }
            }
        } else if c == ',' && cur.closes_after(i + 1) {
            i += 1;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

/// Two JSON strings are never adjacent in valid JSON, so a string directly
/// after another one is missing its comma.
fn separate_strings(out: &mut String) {
    if out.trim_end().ends_with('"') {
        out.push(',');
    }
}

fn render_call(name: &str, argument: &str) -> String {
    Value::String(format!("{name}(\"{argument}\")")).to_string()
}
