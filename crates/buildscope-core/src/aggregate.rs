//! Post-build aggregation of images into per-test-type buckets.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::domain::{BuildKey, BuildStatus, ImageDescriptor, TestRequirements, TestType};

/// Options for [`aggregate_test_images`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateOptions {
    /// Whether image builds ran in this pipeline.
    pub build_enabled: bool,
    /// Report `repository:<last additional tag>` instead of the canonical URI.
    pub use_latest_additional_tag: bool,
}

/// Test type → deduplicated image references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestManifest {
    buckets: BTreeMap<TestType, BTreeSet<String>>,
}

impl Default for TestManifest {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::from([(TestType::Sanity, BTreeSet::new())]),
        }
    }
}

impl TestManifest {
    fn add(&mut self, test_type: TestType, uri: &str) {
        self.buckets
            .entry(test_type)
            .or_default()
            .insert(uri.to_string());
    }

    /// Images in a bucket; empty when the bucket is absent.
    pub fn images(&self, test_type: TestType) -> Vec<&str> {
        self.buckets
            .get(&test_type)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_bucket(&self, test_type: TestType) -> bool {
        self.buckets.contains_key(&test_type)
    }

    pub fn test_types(&self) -> impl Iterator<Item = TestType> + '_ {
        self.buckets.keys().copied()
    }
}

/// Group promotable images by the test types they must run.
///
/// Every successful image (or, with builds disabled, every not-built image
/// reused from the registry) lands in `sanity`. It is then added to the
/// buckets recorded under the universal key, its image type, and its full
/// variant key; the lookups are independent and additive.
pub fn aggregate_test_images(
    images: &[ImageDescriptor],
    requirements: &TestRequirements,
    options: AggregateOptions,
) -> TestManifest {
    let mut manifest = TestManifest::default();

    for image in images {
        if !image.test_promotion_enabled {
            debug!(image = %image.image_uri, "test promotion disabled, skipping");
            continue;
        }

        let reuse_existing = !options.build_enabled && image.build_status == BuildStatus::NotBuilt;
        if image.build_status != BuildStatus::Success && !reuse_existing {
            warn!(
                image = %image.image_uri,
                status = ?image.build_status,
                "image not available for testing, skipping"
            );
            continue;
        }

        let uri = image.reportable_uri(options.use_latest_additional_tag);
        manifest.add(TestType::Sanity, &uri);

        let info = &image.info;
        let keys = [
            BuildKey::Universal,
            BuildKey::image_type(info.image_type.as_str()),
            BuildKey::variant(
                info.image_type.as_str(),
                info.device_type.as_str(),
                info.python_version.as_str(),
            ),
        ];
        for key in &keys {
            if let Some(tests) = requirements.get(key) {
                for test_type in tests.expand() {
                    debug!(image = %uri, key = %key, test = %test_type, "adding image to bucket");
                    manifest.add(test_type, &uri);
                }
            }
        }
    }

    manifest
}
