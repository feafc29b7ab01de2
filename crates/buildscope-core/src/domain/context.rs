//! Build context and pull request identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{BuildScopeError, Result};

/// Why the pipeline is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildContext {
    Pr,
    Mainline,
    Nightly,
    #[default]
    Dev,
}

impl BuildContext {
    pub fn is_pr(&self) -> bool {
        matches!(self, BuildContext::Pr)
    }
}

impl fmt::Display for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildContext::Pr => "PR",
            BuildContext::Mainline => "MAINLINE",
            BuildContext::Nightly => "NIGHTLY",
            BuildContext::Dev => "DEV",
        };
        f.write_str(s)
    }
}

impl FromStr for BuildContext {
    type Err = BuildScopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PR" => Ok(BuildContext::Pr),
            "MAINLINE" => Ok(BuildContext::Mainline),
            "NIGHTLY" => Ok(BuildContext::Nightly),
            "DEV" | "" => Ok(BuildContext::Dev),
            _ => Err(BuildScopeError::InvalidBuildContext(s.to_string())),
        }
    }
}

/// Owner and name of the repository a pull request targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRepo {
    pub owner: String,
    pub name: String,
}

impl SourceRepo {
    /// Parse a clone URL such as `https://github.com/aws/deep-learning-containers.git`.
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

        let mut parts = trimmed.rsplitn(3, '/');
        let name = parts.next().unwrap_or_default();
        let owner = parts.next().unwrap_or_default();
        // The remainder must exist (scheme + host), otherwise this is not a URL.
        if parts.next().is_none() || owner.is_empty() || name.is_empty() {
            return Err(BuildScopeError::InvalidSourceRepo(url.to_string()));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for SourceRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A concrete pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
    pub repo: SourceRepo,
}

impl PullRequestRef {
    /// Resolve from the raw CI inputs. Both values are required.
    pub fn resolve(pr_number: Option<&str>, repo_url: Option<&str>) -> Result<Self> {
        let raw = pr_number
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(BuildScopeError::MissingPrNumber)?;
        let number = raw
            .strip_prefix("pr/")
            .unwrap_or(raw)
            .parse::<u64>()
            .map_err(|_| BuildScopeError::InvalidPrNumber(raw.to_string()))?;

        let url = repo_url
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(BuildScopeError::MissingSourceRepo)?;
        let repo = SourceRepo::parse(url)?;

        Ok(Self { number, repo })
    }
}
