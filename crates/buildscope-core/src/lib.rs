//! buildscope core library
//!
//! Decides which container image variants a change must rebuild and which
//! test suites must run against them:
//!
//! - [`classifier`]: applies the rule table to a [`ChangeSet`], accumulating a
//!   per-run [`ScopeState`] (dimensions plus build-key → test-set mapping).
//! - [`matrix`]: intersects the scope with the supported universe and emits
//!   one activation flag per `(framework, device, image, python)` variant.
//! - [`aggregate`]: after the builds, groups image references by test type
//!   into a [`TestManifest`].
//! - [`reporting`]: the JSON artifacts passed between pipeline stages.

pub mod aggregate;
pub mod changes;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod matcher;
pub mod matrix;
pub mod planner;
pub mod reporting;
pub mod telemetry;

pub use aggregate::{aggregate_test_images, AggregateOptions, TestManifest};
pub use changes::{ChangeSet, ChangeSource, GitDiffSource, ListFileSource};
pub use classifier::{ClassificationRule, Classifier};
pub use config::{MatrixConfig, RuleConfig, RuleKind, Universe};
pub use domain::{
    BuildContext, BuildKey, BuildScopeError, BuildStatus, Dimension, DimensionScope,
    ImageDescriptor, ImageInfo, PullRequestRef, Requirement, Result, ScopeState, SourceRepo,
    TestRequirements, TestSet, TestType,
};
pub use matcher::Pattern;
pub use matrix::{build_enabled, BuildMatrix, BuildVariant, ResolvedDimensions};
pub use planner::{BuildPlanner, PlanRequest, ScopeOverrides};
pub use reporting::{BuildPlan, EnvValueType, TestEnvEntry};
pub use telemetry::init_tracing;

/// buildscope version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
