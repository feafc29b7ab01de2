//! Image descriptors produced by the external build stage.

use serde::{Deserialize, Serialize};

/// Outcome of an image build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Success,
    NotBuilt,
    Failed,
}

/// Classification metadata attached to a built image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    pub image_type: String,
    pub device_type: String,
    pub python_version: String,
}

/// One image as reported by the build stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub build_status: BuildStatus,
    /// Repository URI without a tag.
    pub repository: String,
    /// Canonical `repository:tag` reference.
    pub image_uri: String,
    #[serde(default)]
    pub additional_tags: Vec<String>,
    #[serde(default)]
    pub test_promotion_enabled: bool,
    pub info: ImageInfo,
}

impl ImageDescriptor {
    /// Reference to report for testing.
    ///
    /// With `use_latest_additional_tag`, the last additional tag wins when
    /// one exists.
    pub fn reportable_uri(&self, use_latest_additional_tag: bool) -> String {
        match self.additional_tags.last() {
            Some(tag) if use_latest_additional_tag => format!("{}:{}", self.repository, tag),
            _ => self.image_uri.clone(),
        }
    }
}
