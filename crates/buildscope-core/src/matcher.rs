//! Named regular-expression matching over the change-set text.

use regex::Regex;

use crate::domain::error::{BuildScopeError, Result};

/// A compiled rule pattern.
///
/// `exclude` stands in for a negative lookahead: a candidate match that
/// begins with the exclusion is dropped and scanning resumes one character
/// after its start, so later matches inside the same path are still found.
#[derive(Debug, Clone)]
pub struct Pattern {
    name: String,
    regex: Regex,
    exclude: Option<Regex>,
}

impl Pattern {
    pub fn compile(name: &str, pattern: &str, exclude: Option<&str>) -> Result<Self> {
        let invalid = |source| BuildScopeError::InvalidPattern {
            rule: name.to_string(),
            source,
        };
        let regex = Regex::new(pattern).map_err(invalid)?;
        let exclude = exclude
            .map(|e| Regex::new(&format!("^(?:{e})")))
            .transpose()
            .map_err(invalid)?;
        Ok(Self {
            name: name.to_string(),
            regex,
            exclude,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// All non-overlapping matches, in order of appearance.
    ///
    /// Empty matches are kept; the scan then steps one character past them.
    pub fn find_all<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut found = Vec::new();
        let mut pos = 0;

        while pos <= text.len() {
            let Some(m) = self.regex.find_at(text, pos) else {
                break;
            };
            let excluded = self
                .exclude
                .as_ref()
                .is_some_and(|ex| ex.is_match(m.as_str()));

            if excluded {
                pos = m.start() + next_char_len(&text[m.start()..]);
                continue;
            }
            found.push(m.as_str());
            pos = if m.is_empty() {
                m.end() + next_char_len(&text[m.end()..])
            } else {
                m.end()
            };
        }
        found
    }

    pub fn is_match(&self, text: &str) -> bool {
        !self.find_all(text).is_empty()
    }
}

fn next_char_len(s: &str) -> usize {
    s.chars().next().map_or(1, char::len_utf8)
}
