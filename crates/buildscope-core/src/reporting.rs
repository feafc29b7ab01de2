//! Persisted artifacts consumed by later pipeline stages.
//!
//! - `build_plan.json`: the classification result, read back by `aggregate`.
//! - build flags: `NAME=true` lines for the image build stage.
//! - `test_type_images.json`: the test manifest.
//! - `test_env.json`: extra environment entries for test runners.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::aggregate::TestManifest;
use crate::domain::{BuildContext, PullRequestRef, ScopeState};
use crate::matrix::BuildMatrix;

pub const PLAN_SCHEMA_VERSION: &str = "1.0";

/// Classification output carried from the classify stage to aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub framework: String,
    pub build_context: BuildContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestRef>,
    pub changeset_digest: String,
    pub scope: ScopeState,
    pub matrix: BuildMatrix,
}

/// Value type tag understood by the test orchestration tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvValueType {
    Plaintext,
}

/// One auxiliary environment entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEnvEntry {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: EnvValueType,
}

impl TestEnvEntry {
    pub fn plaintext(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            value_type: EnvValueType::Plaintext,
        }
    }

    /// Parse a `KEY=VALUE` argument. The value may itself contain `=`.
    pub fn parse_assignment(raw: &str) -> Result<Self> {
        let (name, value) = raw
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got {raw:?}"))?;
        anyhow::ensure!(!name.trim().is_empty(), "empty key in {raw:?}");
        Ok(Self::plaintext(name.trim(), value))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).context("serialize artifact")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parse {:?}", path))
}

pub fn write_build_plan(path: &Path, plan: &BuildPlan) -> Result<()> {
    write_json(path, plan)
}

pub fn read_build_plan(path: &Path) -> Result<BuildPlan> {
    let plan: BuildPlan = read_json(path)?;
    anyhow::ensure!(
        plan.schema_version == PLAN_SCHEMA_VERSION,
        "unsupported build plan schema {} in {:?}",
        plan.schema_version,
        path
    );
    Ok(plan)
}

pub fn read_image_descriptors(path: &Path) -> Result<Vec<crate::domain::ImageDescriptor>> {
    read_json(path)
}

pub fn write_build_flags(path: &Path, matrix: &BuildMatrix) -> Result<()> {
    std::fs::write(path, matrix.render_env_file()).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

pub fn write_test_manifest(path: &Path, manifest: &TestManifest) -> Result<()> {
    write_json(path, manifest)
}

pub fn write_test_env(path: &Path, entries: &[TestEnvEntry]) -> Result<()> {
    write_json(path, &entries)
}
