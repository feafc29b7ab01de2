//! Rule handlers: turn matched paths into scope changes.
//!
//! Each handler receives every match of its rule's pattern, in order, and
//! mutates the run's [`ScopeState`]. Paths for other frameworks are ignored.
//! Test-tree handlers stop at the first path they cannot attribute to a
//! specific image type, after widening the whole scope.

use tracing::{debug, info};

use super::path::PathSegments;
use crate::config::{RuleKind, Universe};
use crate::domain::error::Result;
use crate::domain::{BuildKey, Dimension, Requirement, ScopeState, TestType};

/// First segment of matches produced by the sagemaker test rule.
pub const SAGEMAKER_TEST_ROOT: &str = "sagemaker_tests";
/// First segment of matches produced by the DLC integration test rule.
pub const DLC_TEST_ROOT: &str = "dlc_tests";

/// Inputs shared by every handler invocation.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub rule: &'a str,
    pub framework: &'a str,
    pub universe: &'a Universe,
}

/// Dispatch `matches` to the handler for `kind`.
pub fn apply(
    kind: RuleKind,
    ctx: RuleContext<'_>,
    matches: &[&str],
    state: &mut ScopeState,
) -> Result<()> {
    match kind {
        RuleKind::Dockerfile => apply_dockerfile(ctx, matches, state),
        RuleKind::Buildspec => apply_buildspec(ctx, matches, state),
        RuleKind::Root => {
            apply_root(ctx, matches, state);
            Ok(())
        }
        RuleKind::SagemakerTest => apply_sagemaker_tests(ctx, matches, state),
        RuleKind::DlcTest => apply_dlc_tests(ctx, matches, state),
    }
}

/// `<framework>/<image_type>/docker/<version>/<python>/.../Dockerfile.<device>`
fn apply_dockerfile(ctx: RuleContext<'_>, matches: &[&str], state: &mut ScopeState) -> Result<()> {
    for path in matches {
        let segments = PathSegments::split(ctx.rule, path).fold_vendor_prefix(ctx.universe);
        if segments.get(0)? != ctx.framework {
            continue;
        }

        let image_type = segments.get(1)?;
        let python_version = segments.get(4)?;
        let device_type = segments.extension();
        info!(
            path = %path,
            image_type,
            device_type,
            python_version,
            "building dockerfile"
        );

        state.narrow_append(Dimension::DeviceType, device_type);
        state.narrow_append(Dimension::ImageType, image_type);
        state.narrow_append(Dimension::PythonVersion, python_version);
        state.require(
            BuildKey::variant(image_type, device_type, python_version),
            Requirement::All,
        );
    }
    Ok(())
}

/// `<framework>/buildspec*.yml` rebuilds every image of the framework.
fn apply_buildspec(ctx: RuleContext<'_>, matches: &[&str], state: &mut ScopeState) -> Result<()> {
    for path in matches {
        let segments = PathSegments::split(ctx.rule, path).fold_vendor_prefix(ctx.universe);
        if segments.get(0)? == ctx.framework {
            info!(path = %path, "buildspec changed, building all images");
            widen_everything(state, &[Requirement::All]);
        }
    }
    Ok(())
}

/// Shared build code or test config: any match rebuilds everything.
fn apply_root(ctx: RuleContext<'_>, matches: &[&str], state: &mut ScopeState) {
    if let Some(first) = matches.first() {
        info!(rule = ctx.rule, path = %first, count = matches.len(), "shared files changed, building all images");
        widen_everything(state, &[Requirement::All]);
    }
}

/// `sagemaker_tests/<framework>/<job>/...`
fn apply_sagemaker_tests(
    ctx: RuleContext<'_>,
    matches: &[&str],
    state: &mut ScopeState,
) -> Result<()> {
    let suite = Requirement::Suite(TestType::Sagemaker);

    for path in matches {
        let segments = PathSegments::split(ctx.rule, path);
        if segments.get(0)? != SAGEMAKER_TEST_ROOT {
            continue;
        }

        let framework_changed = segments.get(1)?;
        if framework_changed == ctx.framework {
            let mut job_name = segments.get(2)?;
            if ctx.universe.aliases_training(framework_changed) && job_name.contains("training") {
                job_name = "training";
            }
            if !scope_to_image_type(ctx, job_name, suite, state) {
                debug!(path = %path, job_name, "unrecognized sagemaker job, widening");
                widen_everything(state, &[suite]);
                break;
            }
        } else if !ctx.universe.is_framework(framework_changed) {
            debug!(path = %path, "shared sagemaker test file, widening");
            widen_everything(state, &[suite]);
            break;
        }
    }
    Ok(())
}

/// `dlc_tests/<ec2|ecs|eks>/<framework>/<job>/...`
fn apply_dlc_tests(ctx: RuleContext<'_>, matches: &[&str], state: &mut ScopeState) -> Result<()> {
    for path in matches {
        let segments = PathSegments::split(ctx.rule, path);
        if segments.get(0)? != DLC_TEST_ROOT {
            continue;
        }

        let test_dir = segments.get(1)?;
        let Some(test_type) = TestType::DLC_SUITES
            .into_iter()
            .find(|t| t.as_str() == test_dir)
        else {
            // sanity, container_tests, conftest and friends
            debug!(path = %path, "shared dlc test file, widening");
            let all_dlc = TestType::DLC_SUITES.map(Requirement::Suite);
            widen_everything(state, &all_dlc);
            break;
        };
        let suite = Requirement::Suite(test_type);

        let framework_changed = segments.get(2)?;
        if framework_changed == ctx.framework {
            let job_name = segments.get(3)?;
            if !scope_to_image_type(ctx, job_name, suite, state) {
                debug!(path = %path, job_name, "unrecognized dlc job, widening");
                widen_everything(state, &[suite]);
                break;
            }
        } else if !ctx.universe.is_framework(framework_changed) {
            debug!(path = %path, "shared {} test file, widening", test_type);
            widen_everything(state, &[suite]);
            break;
        }
    }
    Ok(())
}

/// Record a test change under one image type. Returns false when `job_name`
/// is not a supported image type.
fn scope_to_image_type(
    ctx: RuleContext<'_>,
    job_name: &str,
    requirement: Requirement,
    state: &mut ScopeState,
) -> bool {
    if !ctx.universe.is_image_type(job_name) {
        return false;
    }
    state.narrow_append(Dimension::ImageType, job_name);
    state.widen_devices_and_python();
    state.require(BuildKey::image_type(job_name), requirement);
    true
}

fn widen_everything(state: &mut ScopeState, requirements: &[Requirement]) {
    state.widen_all();
    for requirement in requirements {
        state.require(BuildKey::Universal, *requirement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DimensionScope, TestSet};
    use std::collections::BTreeSet;

    fn run(kind: RuleKind, framework: &str, matches: &[&str]) -> Result<ScopeState> {
        let universe = Universe::default();
        let ctx = RuleContext {
            rule: "test-rule",
            framework,
            universe: &universe,
        };
        let mut state = ScopeState::new();
        apply(kind, ctx, matches, &mut state)?;
        Ok(state)
    }

    fn explicit(values: &[&str]) -> DimensionScope {
        DimensionScope::Explicit(values.iter().map(|v| v.to_string()).collect())
    }

    fn only(types: &[TestType]) -> TestSet {
        TestSet::Only(types.iter().copied().collect::<BTreeSet<_>>())
    }

    #[test]
    fn test_dockerfile_for_framework() {
        let state = run(
            RuleKind::Dockerfile,
            "pytorch",
            &["pytorch/training/docker/1.9/py3/cu111/Dockerfile.gpu"],
        )
        .unwrap();
        assert_eq!(state.device_types, explicit(&["gpu"]));
        assert_eq!(state.image_types, explicit(&["training"]));
        assert_eq!(state.py_versions, explicit(&["py3"]));
        assert_eq!(
            state
                .test_requirements
                .get(&BuildKey::variant("training", "gpu", "py3")),
            Some(&TestSet::Universal)
        );
    }

    #[test]
    fn test_dockerfile_other_framework_ignored() {
        let state = run(
            RuleKind::Dockerfile,
            "mxnet",
            &["pytorch/training/docker/1.9/py3/cu111/Dockerfile.gpu"],
        )
        .unwrap();
        assert_eq!(state, ScopeState::new());
    }

    #[test]
    fn test_dockerfile_vendor_prefix_folds() {
        let path = "huggingface/pytorch/inference/docker/1.9/py3/Dockerfile.cpu";
        let state = run(RuleKind::Dockerfile, "huggingface_pytorch", &[path]).unwrap();
        assert_eq!(state.image_types, explicit(&["inference"]));
        assert_eq!(state.device_types, explicit(&["cpu"]));

        let state = run(RuleKind::Dockerfile, "pytorch", &[path]).unwrap();
        assert_eq!(state, ScopeState::new());
    }

    #[test]
    fn test_dockerfile_too_short_is_malformed() {
        let err = run(RuleKind::Dockerfile, "pytorch", &["pytorch/training/Dockerfile.gpu"])
            .unwrap_err();
        assert!(err.to_string().contains("no segment 4"));
    }

    #[test]
    fn test_buildspec_widens_for_framework_only() {
        let state = run(RuleKind::Buildspec, "pytorch", &["pytorch/buildspec.yml"]).unwrap();
        assert!(state.is_fully_universal());
        assert_eq!(
            state.test_requirements.get(&BuildKey::Universal),
            Some(&TestSet::Universal)
        );

        let state = run(RuleKind::Buildspec, "mxnet", &["pytorch/buildspec.yml"]).unwrap();
        assert!(!state.is_fully_universal());
    }

    #[test]
    fn test_buildspec_vendor_prefix() {
        let state = run(
            RuleKind::Buildspec,
            "habana_tensorflow",
            &["habana/tensorflow/buildspec-2-5.yml"],
        )
        .unwrap();
        assert!(state.is_fully_universal());
    }

    #[test]
    fn test_root_any_match_widens() {
        let state = run(RuleKind::Root, "anything", &["src/utils.py"]).unwrap();
        assert!(state.is_fully_universal());

        let state = run(RuleKind::Root, "anything", &[]).unwrap();
        assert_eq!(state, ScopeState::new());
    }

    #[test]
    fn test_sagemaker_image_type() {
        let state = run(
            RuleKind::SagemakerTest,
            "mxnet",
            &["sagemaker_tests/mxnet/training/integration/test_foo.py"],
        )
        .unwrap();
        assert_eq!(state.image_types, explicit(&["training"]));
        assert!(state.device_types.is_universal());
        assert!(state.py_versions.is_universal());
        assert_eq!(
            state.test_requirements.get(&BuildKey::image_type("training")),
            Some(&only(&[TestType::Sagemaker]))
        );
    }

    #[test]
    fn test_sagemaker_tensorflow_training_alias() {
        let state = run(
            RuleKind::SagemakerTest,
            "tensorflow",
            &["sagemaker_tests/tensorflow/tensorflow2_training/test_mnist.py"],
        )
        .unwrap();
        assert_eq!(state.image_types, explicit(&["training"]));
    }

    #[test]
    fn test_sagemaker_unknown_job_short_circuits() {
        let state = run(
            RuleKind::SagemakerTest,
            "mxnet",
            &[
                "sagemaker_tests/mxnet/utils/helpers.py",
                "sagemaker_tests/mxnet/inference/test_x.py",
            ],
        )
        .unwrap();
        assert!(state.is_fully_universal());
        assert_eq!(
            state.test_requirements.get(&BuildKey::Universal),
            Some(&only(&[TestType::Sagemaker]))
        );
        // the second path was never evaluated
        assert!(!state
            .test_requirements
            .contains(&BuildKey::image_type("inference")));
    }

    #[test]
    fn test_sagemaker_shared_file_widens() {
        let state = run(RuleKind::SagemakerTest, "mxnet", &["sagemaker_tests/conftest.py"]).unwrap();
        assert!(state.is_fully_universal());
    }

    #[test]
    fn test_sagemaker_other_framework_ignored() {
        let state = run(
            RuleKind::SagemakerTest,
            "mxnet",
            &["sagemaker_tests/pytorch/training/test_x.py"],
        )
        .unwrap();
        assert_eq!(state, ScopeState::new());
    }

    #[test]
    fn test_dlc_image_type() {
        let state = run(
            RuleKind::DlcTest,
            "pytorch",
            &[
                "dlc_tests/ecs/pytorch/inference/test_ecs.py",
                "dlc_tests/eks/pytorch/inference/test_eks.py",
            ],
        )
        .unwrap();
        assert_eq!(state.image_types, explicit(&["inference", "inference"]));
        assert!(state.device_types.is_universal());
        assert_eq!(
            state.test_requirements.get(&BuildKey::image_type("inference")),
            Some(&only(&[TestType::Ecs, TestType::Eks]))
        );
    }

    #[test]
    fn test_dlc_unknown_job_widens_with_suite() {
        let state = run(
            RuleKind::DlcTest,
            "pytorch",
            &["dlc_tests/ec2/pytorch/test_utils.py"],
        )
        .unwrap();
        assert!(state.is_fully_universal());
        assert_eq!(
            state.test_requirements.get(&BuildKey::Universal),
            Some(&only(&[TestType::Ec2]))
        );
    }

    #[test]
    fn test_dlc_suite_level_conftest_widens() {
        let state = run(RuleKind::DlcTest, "pytorch", &["dlc_tests/eks/conftest.py"]).unwrap();
        assert!(state.is_fully_universal());
        assert_eq!(
            state.test_requirements.get(&BuildKey::Universal),
            Some(&only(&[TestType::Eks]))
        );
    }

    #[test]
    fn test_dlc_sanity_widens_all_dlc_suites() {
        let state = run(
            RuleKind::DlcTest,
            "pytorch",
            &["dlc_tests/sanity/test_pre_release.py"],
        )
        .unwrap();
        assert!(state.is_fully_universal());
        assert_eq!(
            state.test_requirements.get(&BuildKey::Universal),
            Some(&only(&[TestType::Ec2, TestType::Ecs, TestType::Eks]))
        );
    }

    #[test]
    fn test_dlc_malformed() {
        let err = run(RuleKind::DlcTest, "pytorch", &["dlc_tests/ecs/pytorch"]).unwrap_err();
        assert!(err.to_string().contains("no segment 3"));
    }
}
