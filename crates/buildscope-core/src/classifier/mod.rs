//! Rule-driven change classification.
//!
//! A [`Classifier`] compiles the configured rule table once and can then be
//! run for any number of frameworks. Every run gets its own [`ScopeState`];
//! rules are applied in table order and all of them always run, even when
//! the scope is already fully universal, because later rules can still add
//! test requirements.

pub mod path;
pub mod rules;

use tracing::{debug, info};

use crate::changes::ChangeSet;
use crate::config::{MatrixConfig, RuleKind, Universe};
use crate::domain::error::Result;
use crate::domain::ScopeState;
use crate::matcher::Pattern;

pub use path::PathSegments;
pub use rules::{RuleContext, DLC_TEST_ROOT, SAGEMAKER_TEST_ROOT};

/// A compiled rule: pattern plus handler.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub kind: RuleKind,
    pub pattern: Pattern,
}

impl ClassificationRule {
    pub fn name(&self) -> &str {
        self.pattern.name()
    }

    /// Match `text` and hand the matches to this rule's handler.
    pub fn apply(
        &self,
        text: &str,
        framework: &str,
        universe: &Universe,
        state: &mut ScopeState,
    ) -> Result<()> {
        let matches = self.pattern.find_all(text);
        debug!(rule = self.name(), matches = matches.len(), "applying rule");
        let ctx = RuleContext {
            rule: self.name(),
            framework,
            universe,
        };
        rules::apply(self.kind, ctx, &matches, state)
    }
}

/// Compiled rule table and universe.
#[derive(Debug, Clone)]
pub struct Classifier {
    universe: Universe,
    rules: Vec<ClassificationRule>,
}

impl Classifier {
    /// Compile every rule pattern. Any invalid pattern fails the whole table.
    pub fn new(config: &MatrixConfig) -> Result<Self> {
        let rules = config
            .rules
            .iter()
            .map(|r| {
                Ok(ClassificationRule {
                    kind: r.kind,
                    pattern: Pattern::compile(&r.name, &r.pattern, r.exclude.as_deref())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            universe: config.universe.clone(),
            rules,
        })
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Classify `changes` for one framework into a fresh scope.
    pub fn classify(&self, changes: &ChangeSet, framework: &str) -> Result<ScopeState> {
        let mut state = ScopeState::new();
        self.classify_into(changes, framework, &mut state)?;
        Ok(state)
    }

    /// Apply every rule, in order, to a caller-owned scope.
    pub fn classify_into(
        &self,
        changes: &ChangeSet,
        framework: &str,
        state: &mut ScopeState,
    ) -> Result<()> {
        let text = changes.as_text();
        for rule in &self.rules {
            rule.apply(&text, framework, &self.universe, state)?;
        }

        info!(
            framework,
            files = changes.len(),
            fully_universal = state.is_fully_universal(),
            requirements = state.test_requirements.len(),
            "classified change set"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;
    use crate::domain::error::BuildScopeError;

    #[test]
    fn test_invalid_pattern_fails_construction() {
        let mut config = MatrixConfig::default();
        config
            .rules
            .push(RuleConfig::new("broken", RuleKind::Root, "src/(\\S+"));
        let err = Classifier::new(&config).unwrap_err();
        assert!(matches!(err, BuildScopeError::InvalidPattern { ref rule, .. } if rule == "broken"));
    }

    #[test]
    fn test_root_rule_fires_on_empty_match() {
        let config = MatrixConfig {
            rules: vec![RuleConfig::new("always", RuleKind::Root, r"(src/\S+)?")],
            ..MatrixConfig::default()
        };
        let classifier = Classifier::new(&config).unwrap();
        let state = classifier
            .classify(&ChangeSet::new(["README.md"]), "mxnet")
            .unwrap();
        assert!(state.is_fully_universal());
    }

    #[test]
    fn test_rules_keep_table_order() {
        let classifier = Classifier::new(&MatrixConfig::default()).unwrap();
        let names: Vec<&str> = classifier.rules().iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec![
                "dockerfile",
                "sagemaker_tests",
                "dlc_tests",
                "buildspec",
                "src",
                "shared_tests",
                "testspec"
            ]
        );
    }

    #[test]
    fn test_empty_change_set_leaves_scope_empty() {
        let classifier = Classifier::new(&MatrixConfig::default()).unwrap();
        let state = classifier.classify(&ChangeSet::default(), "pytorch").unwrap();
        assert_eq!(state, ScopeState::new());
    }

    #[test]
    fn test_rules_keep_running_after_full_widen() {
        let classifier = Classifier::new(&MatrixConfig::default()).unwrap();
        // the sagemaker rule widens everything before the dlc rule runs
        let changes = ChangeSet::new([
            "test/sagemaker_tests/conftest.py",
            "test/dlc_tests/ecs/pytorch/training/test_ecs.py",
        ]);
        let state = classifier.classify(&changes, "pytorch").unwrap();
        assert!(state.is_fully_universal());
        assert!(state.test_requirements.contains(&crate::domain::BuildKey::Universal));
        assert!(state
            .test_requirements
            .contains(&crate::domain::BuildKey::image_type("training")));
    }
}
