//! Glob-style path patterns compiled to anchored regular expressions.
//!
//! Supported syntax:
//!
//! - `~` at the start expands to the home directory
//! - a leading `*/` matches at any depth
//! - a trailing `/*` matches the directory itself and anything beneath it
//! - `**` matches across path separators
//! - `*` matches within a single segment, `?` one character of a segment
//! - `[abc]`, `[a-z]` and `[!abc]` match one character of a segment
//!
//! A pattern without any `/` is matched against the final path component at
//! any depth, so `*.pem` and `.env` behave as expected.

use std::fmt;
use std::path::Path;

use regex::Regex;

use crate::errors::{SafetyError, SafetyResult};
use crate::paths::{expand_home, normalize_path};

#[derive(Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    pub fn new(pattern: &str) -> SafetyResult<Self> {
        let expression = glob_to_regex(pattern);
        let regex = Regex::new(&expression).map_err(|err| SafetyError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.regex.is_match(&path_to_match_string(path))
    }

    pub fn matches_str(&self, path: &str) -> bool {
        self.matches(Path::new(path))
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.source).finish()
    }
}

/// Compile many patterns, failing on the first invalid one.
pub fn compile_patterns<I, S>(patterns: I) -> SafetyResult<Vec<PathPattern>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|pattern| PathPattern::new(pattern.as_ref()))
        .collect()
}

pub fn any_match(patterns: &[PathPattern], path: &Path) -> bool {
    patterns.iter().any(|pattern| pattern.matches(path))
}

fn path_to_match_string(path: &Path) -> String {
    let normalized = normalize_path(path);
    let text = normalized.to_string_lossy();
    if cfg!(windows) {
        text.replace('\\', "/")
    } else {
        text.into_owned()
    }
}

/// Translate a glob pattern into an anchored regular expression.
pub fn glob_to_regex(pattern: &str) -> String {
    let mut body = pattern.trim().to_string();

    if body == "~" || body.starts_with("~/") {
        body = expand_home(&body).to_string_lossy().replace('\\', "/");
    }

    let mut prefix = String::from("^");
    let mut suffix = String::from("$");

    if let Some(rest) = body.strip_prefix("*/") {
        prefix.push_str("(?:.*/)?");
        body = rest.to_string();
    } else if !body.contains('/') {
        prefix.push_str("(?:.*/)?");
    }

    if let Some(rest) = body.strip_suffix("/*")
        && !rest.ends_with('*')
    {
        suffix = String::from("(?:/.*)?$");
        body = rest.to_string();
    } else if let Some(rest) = body.strip_suffix("/**") {
        suffix = String::from("(?:/.*)?$");
        body = rest.to_string();
    }

    let mut expression = prefix;
    let chars: Vec<char> = body.chars().collect();
    let mut index = 0;
    while let Some(&ch) = chars.get(index) {
        index += 1;
        match ch {
            '*' if chars.get(index) == Some(&'*') => {
                index += 1;
                expression.push_str(".*");
            }
            '*' => expression.push_str("[^/]*"),
            '?' => expression.push_str("[^/]"),
            '[' => match bracket_class(&chars, index) {
                Some((class, next)) => {
                    expression.push_str(&class);
                    index = next;
                }
                None => expression.push_str(r"\["),
            },
            other => {
                let mut buf = [0u8; 4];
                expression.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            }
        }
    }
    expression.push_str(&suffix);
    expression
}

/// Translate `[abc]`, `[a-z]` or `[!abc]` starting just after the `[` at
/// `start`. Returns the regex class and the index after the closing `]`, or
/// `None` when the bracket is unterminated and should be taken literally.
fn bracket_class(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut index = start;
    let negated = matches!(chars.get(index), Some('!' | '^'));
    if negated {
        index += 1;
    }
    let first = index;
    let mut class = String::from(if negated { "[^/" } else { "[" });
    while let Some(&ch) = chars.get(index) {
        match ch {
            ']' if index > first => {
                class.push(']');
                return Some((class, index + 1));
            }
            '/' => return None,
            '\\' | '[' | ']' | '^' | '&' | '~' => {
                class.push('\\');
                class.push(ch);
            }
            _ => class.push(ch),
        }
        index += 1;
    }
    None
}
