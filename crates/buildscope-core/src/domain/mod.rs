//! Domain types for change classification and test aggregation.

pub mod build_key;
pub mod context;
pub mod error;
pub mod image;
pub mod requirements;
pub mod scope;

pub use build_key::BuildKey;
pub use context::{BuildContext, PullRequestRef, SourceRepo};
pub use error::{BuildScopeError, Result};
pub use image::{BuildStatus, ImageDescriptor, ImageInfo};
pub use requirements::{Requirement, RequirementEntry, TestRequirements, TestSet, TestType};
pub use scope::{Dimension, DimensionScope, ScopeState};
