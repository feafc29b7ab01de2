//! Test types and the build-key → test-set mapping.
//!
//! [`TestRequirements::merge`] implements the resolution rules:
//!
//! - an unseen key starts with the incoming requirement;
//! - a concrete suite is unioned in unless the key already runs everything;
//! - an incoming [`Requirement::All`] replaces whatever was recorded.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::build_key::BuildKey;
use super::error::BuildScopeError;

/// Legacy token for "every test type".
pub const ALL_TOKEN: &str = "all";

/// A downstream test suite (or manifest bucket).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Sanity,
    Ec2,
    Ecs,
    Eks,
    Sagemaker,
}

impl TestType {
    /// Suites a universal requirement expands to. Sanity is not a suite; it
    /// covers every image unconditionally.
    pub const SUITES: [TestType; 4] = [
        TestType::Ec2,
        TestType::Ecs,
        TestType::Eks,
        TestType::Sagemaker,
    ];

    /// The DLC integration suites, which double as test directory names.
    pub const DLC_SUITES: [TestType; 3] = [TestType::Ec2, TestType::Ecs, TestType::Eks];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Sanity => "sanity",
            TestType::Ec2 => "ec2",
            TestType::Ecs => "ecs",
            TestType::Eks => "eks",
            TestType::Sagemaker => "sagemaker",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestType {
    type Err = BuildScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sanity" => Ok(TestType::Sanity),
            "ec2" => Ok(TestType::Ec2),
            "ecs" => Ok(TestType::Ecs),
            "eks" => Ok(TestType::Eks),
            "sagemaker" => Ok(TestType::Sagemaker),
            other => Err(BuildScopeError::Config(format!("unknown test type '{other}'"))),
        }
    }
}

/// A single requirement observed by a classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    All,
    Suite(TestType),
}

/// The tests recorded for one build key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub enum TestSet {
    /// Run every suite; expanded at aggregation time.
    Universal,
    Only(BTreeSet<TestType>),
}

impl TestSet {
    fn from_requirement(requirement: Requirement) -> Self {
        match requirement {
            Requirement::All => TestSet::Universal,
            Requirement::Suite(t) => TestSet::Only(BTreeSet::from([t])),
        }
    }

    pub fn is_universal(&self) -> bool {
        matches!(self, TestSet::Universal)
    }

    /// Concrete suites this set stands for.
    pub fn expand(&self) -> Vec<TestType> {
        match self {
            TestSet::Universal => TestType::SUITES.to_vec(),
            TestSet::Only(set) => set.iter().copied().collect(),
        }
    }
}

impl From<TestSet> for Vec<String> {
    fn from(set: TestSet) -> Self {
        match set {
            TestSet::Universal => vec![ALL_TOKEN.to_string()],
            TestSet::Only(set) => set.iter().map(|t| t.as_str().to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for TestSet {
    type Error = BuildScopeError;

    fn try_from(values: Vec<String>) -> Result<Self, Self::Error> {
        if values.iter().any(|v| v == ALL_TOKEN) {
            return Ok(TestSet::Universal);
        }
        let set = values
            .iter()
            .map(|v| v.parse())
            .collect::<Result<BTreeSet<TestType>, _>>()?;
        Ok(TestSet::Only(set))
    }
}

/// Serialized form of one mapping entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementEntry {
    pub key: BuildKey,
    pub tests: TestSet,
}

/// Mapping from build key to the tests its images must run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<RequirementEntry>", from = "Vec<RequirementEntry>")]
pub struct TestRequirements {
    entries: BTreeMap<BuildKey, TestSet>,
}

impl TestRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a newly observed requirement for `key`.
    pub fn merge(&mut self, key: BuildKey, requirement: Requirement) {
        tracing::debug!(key = %key, ?requirement, "merging test requirement");
        match self.entries.get_mut(&key) {
            None => {
                self.entries
                    .insert(key, TestSet::from_requirement(requirement));
            }
            Some(existing) => match requirement {
                Requirement::All => *existing = TestSet::Universal,
                Requirement::Suite(t) => {
                    if let TestSet::Only(set) = existing {
                        set.insert(t);
                    }
                }
            },
        }
    }

    pub fn get(&self, key: &BuildKey) -> Option<&TestSet> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &BuildKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BuildKey, &TestSet)> {
        self.entries.iter()
    }
}

impl From<TestRequirements> for Vec<RequirementEntry> {
    fn from(reqs: TestRequirements) -> Self {
        reqs.entries
            .into_iter()
            .map(|(key, tests)| RequirementEntry { key, tests })
            .collect()
    }
}

impl From<Vec<RequirementEntry>> for TestRequirements {
    fn from(entries: Vec<RequirementEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.key, e.tests)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_key_created() {
        let mut reqs = TestRequirements::new();
        reqs.merge(BuildKey::image_type("training"), Requirement::Suite(TestType::Ecs));
        assert_eq!(
            reqs.get(&BuildKey::image_type("training")),
            Some(&TestSet::Only(BTreeSet::from([TestType::Ecs])))
        );
    }

    #[test]
    fn test_suites_union() {
        let mut reqs = TestRequirements::new();
        let key = BuildKey::image_type("inference");
        reqs.merge(key.clone(), Requirement::Suite(TestType::Ecs));
        reqs.merge(key.clone(), Requirement::Suite(TestType::Eks));
        reqs.merge(key.clone(), Requirement::Suite(TestType::Ecs));
        assert_eq!(
            reqs.get(&key).unwrap().expand(),
            vec![TestType::Ecs, TestType::Eks]
        );
    }

    #[test]
    fn test_all_overrides_existing_suites() {
        let mut reqs = TestRequirements::new();
        reqs.merge(BuildKey::Universal, Requirement::Suite(TestType::Sagemaker));
        reqs.merge(BuildKey::Universal, Requirement::All);
        assert_eq!(reqs.get(&BuildKey::Universal), Some(&TestSet::Universal));
    }

    #[test]
    fn test_suite_after_all_is_ignored() {
        let mut reqs = TestRequirements::new();
        reqs.merge(BuildKey::Universal, Requirement::All);
        reqs.merge(BuildKey::Universal, Requirement::Suite(TestType::Ec2));
        assert_eq!(reqs.get(&BuildKey::Universal), Some(&TestSet::Universal));
    }

    #[test]
    fn test_universal_expands_to_every_suite() {
        assert_eq!(
            TestSet::Universal.expand(),
            vec![
                TestType::Ec2,
                TestType::Ecs,
                TestType::Eks,
                TestType::Sagemaker
            ]
        );
    }

    #[test]
    fn test_requirements_serialize_as_entry_list() {
        let mut reqs = TestRequirements::new();
        reqs.merge(BuildKey::Universal, Requirement::All);
        reqs.merge(BuildKey::image_type("training"), Requirement::Suite(TestType::Ecs));

        let json = serde_json::to_value(&reqs).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["tests"], serde_json::json!(["all"]));
        assert_eq!(entries[1]["tests"], serde_json::json!(["ecs"]));

        let back: TestRequirements = serde_json::from_value(json).unwrap();
        assert_eq!(back, reqs);
    }

    #[test]
    fn test_unknown_test_type_rejected() {
        assert!("unit".parse::<TestType>().is_err());
        let parsed: Result<TestSet, _> = TestSet::try_from(vec!["unit".to_string()]);
        assert!(parsed.is_err());
    }
}
