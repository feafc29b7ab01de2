//! Supported-value universe and the classification rule table.
//!
//! Loaded from TOML; every section falls back to the built-in defaults.
//!
//! ```toml
//! [universe]
//! device_types = ["cpu", "gpu"]
//!
//! [[rules]]
//! name = "dockerfile"
//! kind = "dockerfile"
//! pattern = '\S+Dockerfile\S+'
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::domain::error::{BuildScopeError, Result};

/// Every supported value per dimension, plus path-folding knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Universe {
    pub frameworks: BTreeSet<String>,
    pub device_types: BTreeSet<String>,
    pub image_types: BTreeSet<String>,
    pub python_versions: BTreeSet<String>,
    /// Top-level directories whose first two segments fold into one framework.
    pub vendor_prefixes: Vec<String>,
    /// Frameworks whose `<name><major>_training` test dirs mean `training`.
    pub training_alias_frameworks: Vec<String>,
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for Universe {
    fn default() -> Self {
        Self {
            frameworks: set(&[
                "mxnet",
                "pytorch",
                "tensorflow",
                "huggingface_mxnet",
                "huggingface_pytorch",
                "huggingface_tensorflow",
                "habana_pytorch",
                "habana_tensorflow",
            ]),
            device_types: set(&["cpu", "gpu", "eia", "neuron", "hpu"]),
            image_types: set(&["training", "inference"]),
            python_versions: set(&["py2", "py3", "py36", "py37", "py38"]),
            vendor_prefixes: vec!["huggingface".to_string(), "habana".to_string()],
            training_alias_frameworks: vec!["tensorflow".to_string()],
        }
    }
}

impl Universe {
    pub fn is_framework(&self, name: &str) -> bool {
        self.frameworks.contains(name)
    }

    pub fn is_image_type(&self, name: &str) -> bool {
        self.image_types.contains(name)
    }

    pub fn is_vendor_prefix(&self, name: &str) -> bool {
        self.vendor_prefixes.iter().any(|p| p == name)
    }

    pub fn aliases_training(&self, framework: &str) -> bool {
        self.training_alias_frameworks.iter().any(|f| f == framework)
    }
}

/// Which handler a rule dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Dockerfile,
    SagemakerTest,
    DlcTest,
    Buildspec,
    Root,
}

/// One row of the declarative rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    pub kind: RuleKind,
    pub pattern: String,
    /// Matches that start with this pattern are skipped and the scan resumes
    /// one character later.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
}

impl RuleConfig {
    pub fn new(name: &str, kind: RuleKind, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            pattern: pattern.to_string(),
            exclude: None,
        }
    }

    pub fn with_exclude(mut self, exclude: &str) -> Self {
        self.exclude = Some(exclude.to_string());
        self
    }
}

/// Built-in rule table, in evaluation order.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig::new("dockerfile", RuleKind::Dockerfile, r"\S+Dockerfile\S+"),
        RuleConfig::new("sagemaker_tests", RuleKind::SagemakerTest, r"sagemaker_tests/\S+"),
        RuleConfig::new("dlc_tests", RuleKind::DlcTest, r"dlc_tests/\S+"),
        RuleConfig::new("buildspec", RuleKind::Buildspec, r"\S+/buildspec.*yml"),
        RuleConfig::new("src", RuleKind::Root, r"src/\S+"),
        RuleConfig::new("shared_tests", RuleKind::Root, r"test/\S+")
            .with_exclude(r"test/(dlc_tests|sagemaker_tests)"),
        RuleConfig::new("testspec", RuleKind::Root, r"testspec\.yml"),
    ]
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixConfig {
    #[serde(default)]
    pub universe: Universe,
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            universe: Universe::default(),
            rules: default_rules(),
        }
    }
}

impl MatrixConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MatrixConfig =
            toml::from_str(content).map_err(|e| BuildScopeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), rules = config.rules.len(), "loaded config");
        Ok(config)
    }

    /// Reject configurations that could never produce a build.
    pub fn validate(&self) -> Result<()> {
        let u = &self.universe;
        for (name, values) in [
            ("frameworks", &u.frameworks),
            ("device_types", &u.device_types),
            ("image_types", &u.image_types),
            ("python_versions", &u.python_versions),
        ] {
            if values.is_empty() {
                return Err(BuildScopeError::Config(format!(
                    "universe.{name} must not be empty"
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.name.as_str()) {
                return Err(BuildScopeError::Config(format!(
                    "duplicate rule name '{}'",
                    rule.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule_order() {
        let kinds: Vec<RuleKind> = default_rules().iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RuleKind::Dockerfile,
                RuleKind::SagemakerTest,
                RuleKind::DlcTest,
                RuleKind::Buildspec,
                RuleKind::Root,
                RuleKind::Root,
                RuleKind::Root,
            ]
        );
    }

    #[test]
    fn test_default_config_validates() {
        MatrixConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = MatrixConfig::from_toml_str(
            r#"
            [universe]
            device_types = ["cpu", "gpu"]
            "#,
        )
        .unwrap();
        assert_eq!(config.universe.device_types, set(&["cpu", "gpu"]));
        assert_eq!(config.universe.image_types, set(&["training", "inference"]));
        assert_eq!(config.rules, default_rules());
    }

    #[test]
    fn test_toml_rules_override() {
        let config = MatrixConfig::from_toml_str(
            r#"
            [[rules]]
            name = "docs"
            kind = "root"
            pattern = 'docs/\S+'
            "#,
        )
        .unwrap();
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].kind, RuleKind::Root);
        assert!(config.rules[0].exclude.is_none());
    }

    #[test]
    fn test_empty_universe_rejected() {
        let err = MatrixConfig::from_toml_str(
            r#"
            [universe]
            image_types = []
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("image_types"));
    }

    #[test]
    fn test_duplicate_rule_names_rejected() {
        let mut config = MatrixConfig::default();
        config.rules.push(RuleConfig::new("src", RuleKind::Root, "x"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buildscope.toml");
        std::fs::write(&path, "[universe]\npython_versions = [\"py3\"]\n").unwrap();
        let config = MatrixConfig::load(&path).unwrap();
        assert_eq!(config.universe.python_versions, set(&["py3"]));
    }
}
