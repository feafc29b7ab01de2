//! Per-run scope accumulator.
//!
//! A [`ScopeState`] is created by the caller for one framework evaluation,
//! mutated monotonically by the rule handlers, then handed to the matrix
//! builder. Once a dimension is widened to [`DimensionScope::Universal`] it
//! stays universal for the rest of the run.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::build_key::BuildKey;
use super::requirements::{Requirement, TestRequirements};

/// One axis of the build matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    DeviceType,
    ImageType,
    PythonVersion,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [
        Dimension::DeviceType,
        Dimension::ImageType,
        Dimension::PythonVersion,
    ];
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::DeviceType => write!(f, "device_types"),
            Dimension::ImageType => write!(f, "image_types"),
            Dimension::PythonVersion => write!(f, "py_versions"),
        }
    }
}

/// Either an explicit list of discovered values or every supported value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum DimensionScope {
    /// Values may repeat; duplicates collapse when the matrix is resolved.
    Explicit(Vec<String>),
    Universal,
}

impl Default for DimensionScope {
    fn default() -> Self {
        DimensionScope::Explicit(Vec::new())
    }
}

impl DimensionScope {
    pub fn is_universal(&self) -> bool {
        matches!(self, DimensionScope::Universal)
    }

    fn push(&mut self, value: &str) {
        if let DimensionScope::Explicit(values) = self {
            values.push(value.to_string());
        }
    }
}

/// Accumulated build scope and test requirements for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeState {
    pub device_types: DimensionScope,
    pub image_types: DimensionScope,
    pub py_versions: DimensionScope,
    pub test_requirements: TestRequirements,
}

impl ScopeState {
    /// Empty scope, as used at the start of a pull request classification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope with every dimension already universal (non-PR builds).
    pub fn universal() -> Self {
        let mut state = Self::new();
        state.widen_all();
        state
    }

    pub fn dimension(&self, dimension: Dimension) -> &DimensionScope {
        match dimension {
            Dimension::DeviceType => &self.device_types,
            Dimension::ImageType => &self.image_types,
            Dimension::PythonVersion => &self.py_versions,
        }
    }

    fn dimension_mut(&mut self, dimension: Dimension) -> &mut DimensionScope {
        match dimension {
            Dimension::DeviceType => &mut self.device_types,
            Dimension::ImageType => &mut self.image_types,
            Dimension::PythonVersion => &mut self.py_versions,
        }
    }

    /// Record a discovered value. No-op once the dimension is universal.
    pub fn narrow_append(&mut self, dimension: Dimension, value: &str) {
        self.dimension_mut(dimension).push(value);
    }

    /// Replace the dimension with the universal sentinel. Idempotent.
    pub fn widen_to_all(&mut self, dimension: Dimension) {
        *self.dimension_mut(dimension) = DimensionScope::Universal;
    }

    pub fn widen_all(&mut self) {
        for dimension in Dimension::ALL {
            self.widen_to_all(dimension);
        }
    }

    /// Widen device types and python versions, leaving image types as-is.
    pub fn widen_devices_and_python(&mut self) {
        self.widen_to_all(Dimension::DeviceType);
        self.widen_to_all(Dimension::PythonVersion);
    }

    /// Informational only; classification never stops early on this.
    pub fn is_fully_universal(&self) -> bool {
        Dimension::ALL
            .iter()
            .all(|d| self.dimension(*d).is_universal())
    }

    pub fn require(&mut self, key: BuildKey, requirement: Requirement) {
        self.test_requirements.merge(key, requirement);
    }
}
