//! Segment access for matched paths.

use crate::config::Universe;
use crate::domain::error::{BuildScopeError, Result};

/// A matched path split on `/`, with bounds-checked segment access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegments<'a> {
    rule: &'a str,
    path: &'a str,
    segments: Vec<String>,
}

impl<'a> PathSegments<'a> {
    pub fn split(rule: &'a str, path: &'a str) -> Self {
        Self {
            rule,
            path,
            segments: path.split('/').map(str::to_string).collect(),
        }
    }

    /// Fold `<vendor>/<framework>/...` into `<vendor>_<framework>/...` when
    /// the first segment is a known vendor prefix.
    pub fn fold_vendor_prefix(mut self, universe: &Universe) -> Self {
        if self.segments.len() >= 2 && universe.is_vendor_prefix(&self.segments[0]) {
            let sub = self.segments.remove(1);
            self.segments[0] = format!("{}_{}", self.segments[0], sub);
        }
        self
    }

    /// Segment at `index`, or `MalformedPath` when the path is too short.
    pub fn get(&self, index: usize) -> Result<&str> {
        self.segments
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| BuildScopeError::MalformedPath {
                rule: self.rule.to_string(),
                path: self.path.to_string(),
                index,
            })
    }

    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Text after the last `.` of the final segment (the whole segment if
    /// it has no dot).
    pub fn extension(&self) -> &str {
        let last = self.last();
        last.rsplit('.').next().unwrap_or(last)
    }
}
