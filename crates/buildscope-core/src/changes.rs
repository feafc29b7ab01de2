//! Change sets and the sources that produce them.
//!
//! Fetching a pull request's file list over the network is left to callers;
//! the sources here read a prepared list or ask a local git checkout.

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::PathBuf;
use std::process::Command;

use crate::domain::error::{BuildScopeError, Result};

/// Ordered list of changed file paths. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeSet {
    paths: Vec<String>,
}

impl ChangeSet {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(Into::into)
                .map(|p: String| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// One path per line; blank lines are dropped.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Newline-joined text the rule patterns run against.
    pub fn as_text(&self) -> String {
        self.paths.join("\n")
    }

    /// SHA-256 over the ordered paths.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for path in &self.paths {
            hasher.update(path.as_bytes());
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }
}

/// Something that can produce the change set for a run.
pub trait ChangeSource {
    fn changed_files(&self) -> Result<ChangeSet>;
}

/// Reads a newline-separated list from a file, or stdin for `-`.
#[derive(Debug, Clone)]
pub struct ListFileSource {
    path: PathBuf,
}

impl ListFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ChangeSource for ListFileSource {
    fn changed_files(&self) -> Result<ChangeSet> {
        let text = if self.path.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            std::fs::read_to_string(&self.path).map_err(|e| {
                BuildScopeError::ChangeSource(format!("read {}: {e}", self.path.display()))
            })?
        };
        let changes = ChangeSet::from_text(&text);
        tracing::debug!(source = %self.path.display(), files = changes.len(), "read change list");
        Ok(changes)
    }
}

/// Runs `git diff --name-only <base>...HEAD` in a local checkout.
#[derive(Debug, Clone)]
pub struct GitDiffSource {
    repo_dir: PathBuf,
    base: String,
}

impl GitDiffSource {
    pub fn new(repo_dir: impl Into<PathBuf>, base: impl Into<String>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            base: base.into(),
        }
    }
}

impl ChangeSource for GitDiffSource {
    fn changed_files(&self) -> Result<ChangeSet> {
        let range = format!("{}...HEAD", self.base);
        let output = Command::new("git")
            .args(["diff", "--name-only", &range])
            .current_dir(&self.repo_dir)
            .output()
            .map_err(|e| BuildScopeError::ChangeSource(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildScopeError::ChangeSource(format!(
                "git diff {range} failed: {stderr}"
            )));
        }

        let changes = ChangeSet::from_text(&String::from_utf8_lossy(&output.stdout));
        tracing::debug!(range = %range, files = changes.len(), "collected git diff");
        Ok(changes)
    }
}
