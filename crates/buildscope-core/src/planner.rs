//! Classify stage orchestration.
//!
//! Pull request builds derive their scope from the change set. Other builds
//! start from a universal scope, optionally narrowed by explicit overrides.

use chrono::Utc;
use tracing::info;

use crate::changes::ChangeSet;
use crate::classifier::Classifier;
use crate::config::MatrixConfig;
use crate::domain::error::{BuildScopeError, Result};
use crate::domain::{BuildContext, DimensionScope, PullRequestRef, ScopeState};
use crate::matrix::{build_enabled, BuildMatrix};
use crate::reporting::{BuildPlan, PLAN_SCHEMA_VERSION};

/// Explicit dimension values for non-PR builds. `None` means universal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeOverrides {
    pub device_types: Option<Vec<String>>,
    pub image_types: Option<Vec<String>>,
    pub python_versions: Option<Vec<String>>,
}

impl ScopeOverrides {
    pub fn is_empty(&self) -> bool {
        self.device_types.is_none() && self.image_types.is_none() && self.python_versions.is_none()
    }

    /// Starting scope for a non-PR build.
    pub fn seed(&self) -> ScopeState {
        let scope = |values: &Option<Vec<String>>| {
            values
                .clone()
                .map_or(DimensionScope::Universal, DimensionScope::Explicit)
        };
        ScopeState {
            device_types: scope(&self.device_types),
            image_types: scope(&self.image_types),
            py_versions: scope(&self.python_versions),
            ..ScopeState::default()
        }
    }
}

/// Inputs for one framework's classify stage.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub framework: String,
    pub build_context: BuildContext,
    pub enable_build: bool,
    pub pull_request: Option<PullRequestRef>,
    pub overrides: ScopeOverrides,
}

/// Produces [`BuildPlan`]s from a compiled rule table.
#[derive(Debug, Clone)]
pub struct BuildPlanner {
    classifier: Classifier,
}

impl BuildPlanner {
    pub fn new(config: &MatrixConfig) -> Result<Self> {
        Ok(Self {
            classifier: Classifier::new(config)?,
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Build the plan for `request`.
    ///
    /// PR builds require both a resolved pull request and its change set.
    pub fn plan(&self, request: &PlanRequest, changes: Option<&ChangeSet>) -> Result<BuildPlan> {
        let empty = ChangeSet::default();
        let (scope, changes) = if request.build_context.is_pr() {
            if request.pull_request.is_none() {
                return Err(BuildScopeError::MissingPrNumber);
            }
            let changes = changes.ok_or_else(|| {
                BuildScopeError::ChangeSource("no change list for pull request build".to_string())
            })?;
            let scope = self.classifier.classify(changes, &request.framework)?;
            (scope, changes)
        } else {
            if !request.overrides.is_empty() {
                info!(overrides = ?request.overrides, "using explicit scope overrides");
            }
            (request.overrides.seed(), changes.unwrap_or(&empty))
        };

        let enabled = build_enabled(request.enable_build, request.build_context);
        let matrix = BuildMatrix::resolve(
            &request.framework,
            &scope,
            self.classifier.universe(),
            enabled,
        );

        Ok(BuildPlan {
            schema_version: PLAN_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            framework: request.framework.clone(),
            build_context: request.build_context,
            pull_request: request.pull_request.clone(),
            changeset_digest: changes.digest(),
            scope,
            matrix,
        })
    }
}
