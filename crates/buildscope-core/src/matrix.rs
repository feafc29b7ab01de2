//! Build matrix resolution and activation flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::Universe;
use crate::domain::{BuildContext, DimensionScope, ScopeState};

/// Whether activation flags are emitted for a resolved matrix.
///
/// Non-PR builds always build; PR builds only when builds are enabled.
pub fn build_enabled(enable_build: bool, context: BuildContext) -> bool {
    enable_build || !context.is_pr()
}

/// Intersect an accumulated dimension with its supported superset.
///
/// Values that were appended without validation (device types parsed from
/// file extensions, for instance) are dropped here.
pub fn resolve_dimension(scope: &DimensionScope, superset: &BTreeSet<String>) -> BTreeSet<String> {
    match scope {
        DimensionScope::Universal => superset.clone(),
        DimensionScope::Explicit(values) => values
            .iter()
            .filter(|v| superset.contains(v.as_str()))
            .cloned()
            .collect(),
    }
}

/// Final, deduplicated value sets for each dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDimensions {
    pub device_types: BTreeSet<String>,
    pub image_types: BTreeSet<String>,
    pub python_versions: BTreeSet<String>,
}

/// One image variant to build.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildVariant {
    pub framework: String,
    pub device_type: String,
    pub image_type: String,
    pub python_version: String,
}

impl BuildVariant {
    /// `{FRAMEWORK}_{DEVICE}_{IMAGE}_{PYTHON}`, uppercased.
    pub fn flag_name(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.framework, self.device_type, self.image_type, self.python_version
        )
        .to_uppercase()
    }
}

/// Cartesian build matrix for one framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMatrix {
    pub framework: String,
    pub dimensions: ResolvedDimensions,
    pub variants: Vec<BuildVariant>,
    pub enabled: bool,
}

impl BuildMatrix {
    /// Resolve `scope` against `universe` for `framework`.
    pub fn resolve(framework: &str, scope: &ScopeState, universe: &Universe, enabled: bool) -> Self {
        let dimensions = ResolvedDimensions {
            device_types: resolve_dimension(&scope.device_types, &universe.device_types),
            image_types: resolve_dimension(&scope.image_types, &universe.image_types),
            python_versions: resolve_dimension(&scope.py_versions, &universe.python_versions),
        };

        let mut variants = Vec::new();
        for device_type in &dimensions.device_types {
            for image_type in &dimensions.image_types {
                for python_version in &dimensions.python_versions {
                    variants.push(BuildVariant {
                        framework: framework.to_string(),
                        device_type: device_type.clone(),
                        image_type: image_type.clone(),
                        python_version: python_version.clone(),
                    });
                }
            }
        }

        tracing::info!(
            framework,
            variants = variants.len(),
            enabled,
            "resolved build matrix"
        );

        Self {
            framework: framework.to_string(),
            dimensions,
            variants,
            enabled,
        }
    }

    /// Activation flag names; empty when building is disabled.
    pub fn flags(&self) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }
        self.variants.iter().map(BuildVariant::flag_name).collect()
    }

    /// `NAME=true` lines suitable for sourcing from a shell.
    pub fn render_env_file(&self) -> String {
        self.flags()
            .iter()
            .map(|flag| format!("{flag}=true\n"))
            .collect()
    }
}
