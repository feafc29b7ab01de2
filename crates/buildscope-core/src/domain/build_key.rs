//! Keys under which test requirements are recorded.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which images a test requirement applies to.
///
/// The three shapes never subsume one another; aggregation looks up each
/// shape independently for every image.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum BuildKey {
    /// Every image built in this run.
    Universal,
    /// Every image of one image type (`training`, `inference`, ...).
    ImageType { image_type: String },
    /// A single `(image_type, device_type, python_version)` variant.
    Variant {
        image_type: String,
        device_type: String,
        python_version: String,
    },
}

impl BuildKey {
    pub fn image_type(image_type: impl Into<String>) -> Self {
        Self::ImageType {
            image_type: image_type.into(),
        }
    }

    pub fn variant(
        image_type: impl Into<String>,
        device_type: impl Into<String>,
        python_version: impl Into<String>,
    ) -> Self {
        Self::Variant {
            image_type: image_type.into(),
            device_type: device_type.into(),
            python_version: python_version.into(),
        }
    }
}

impl fmt::Display for BuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildKey::Universal => write!(f, "all"),
            BuildKey::ImageType { image_type } => write!(f, "{image_type}"),
            BuildKey::Variant {
                image_type,
                device_type,
                python_version,
            } => write!(f, "{image_type}_{device_type}_{python_version}"),
        }
    }
}
