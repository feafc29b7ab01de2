//! buildscope - build and test scope selection for container image CI
//!
//! ## Commands
//!
//! - `classify`: turn a change list into a build plan and build flags
//! - `aggregate`: group built images into per-test-type buckets
//! - `rules`: show the effective rule table

use anyhow::{Context, Result};
use clap::builder::FalseyValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

use buildscope_core::reporting::{
    read_build_plan, read_image_descriptors, write_build_flags, write_build_plan, write_test_env,
    write_test_manifest,
};
use buildscope_core::{
    aggregate_test_images, AggregateOptions, BuildContext, BuildPlan, BuildPlanner,
    ChangeSet, ChangeSource, DimensionScope, GitDiffSource, ListFileSource, MatrixConfig,
    PlanRequest, PullRequestRef, ScopeOverrides, TestEnvEntry,
};

#[derive(Parser)]
#[command(name = "buildscope")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Select image variants to build and test suites to run", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify changed files into a build plan
    Classify(ClassifyArgs),

    /// Bucket built images by the test types they must run
    Aggregate(AggregateArgs),

    /// List the effective rule table
    Rules {
        /// TOML matrix configuration (default: built-in table)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Values normally provided by the CI environment.
#[derive(Args, Debug, Clone)]
struct CiEnv {
    /// Build context: PR, MAINLINE, NIGHTLY or DEV
    #[arg(long, env = "BUILD_CONTEXT")]
    build_context: Option<BuildContext>,

    /// Pull request number, optionally prefixed with `pr/`
    #[arg(long, env = "PR_NUMBER")]
    pr_number: Option<String>,

    /// Source repository URL
    #[arg(long, env = "CODEBUILD_SOURCE_REPO_URL")]
    source_repo_url: Option<String>,

    /// Whether images are built in this pipeline
    #[arg(long, env = "ENABLE_BUILD", value_parser = FalseyValueParser::new())]
    enable_build: bool,

    /// CI build id, `<project>:<uuid>`
    #[arg(long, env = "CODEBUILD_BUILD_ID", default_value = "local_test")]
    build_id: String,
}

impl CiEnv {
    fn context(&self) -> BuildContext {
        self.build_context.unwrap_or_default()
    }

    fn project_name(&self) -> &str {
        self.build_id.split(':').next().unwrap_or_default()
    }
}

#[derive(Args, Debug, Clone)]
struct ClassifyArgs {
    /// Framework whose variants are being selected
    #[arg(long)]
    framework: String,

    /// Newline-separated change list (`-` for stdin)
    #[arg(long, conflicts_with = "git_base")]
    changes: Option<PathBuf>,

    /// Compute the change list with `git diff <REF>...HEAD`
    #[arg(long)]
    git_base: Option<String>,

    /// Repository checkout used with --git-base
    #[arg(long, default_value = ".")]
    repo_dir: PathBuf,

    /// TOML matrix configuration (default: built-in table)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the build plan
    #[arg(long, default_value = "build_plan.json")]
    plan_out: PathBuf,

    /// Where to write the build flags
    #[arg(long, default_value = "build_flags.env")]
    flags_out: PathBuf,

    /// Explicit device types for non-PR builds
    #[arg(long, value_delimiter = ',')]
    device_types: Option<Vec<String>>,

    /// Explicit image types for non-PR builds
    #[arg(long, value_delimiter = ',')]
    image_types: Option<Vec<String>>,

    /// Explicit python versions for non-PR builds
    #[arg(long, value_delimiter = ',')]
    python_versions: Option<Vec<String>>,

    #[command(flatten)]
    ci: CiEnv,
}

#[derive(Args, Debug, Clone)]
struct AggregateArgs {
    /// Build plan written by `classify`
    #[arg(long)]
    plan: PathBuf,

    /// JSON list of image descriptors from the build stage
    #[arg(long)]
    images: PathBuf,

    /// Report `repository:<latest additional tag>` instead of the image URI
    #[arg(long)]
    use_latest_tag: bool,

    /// Where to write the test manifest
    #[arg(long, default_value = "test_type_images.json")]
    manifest_out: PathBuf,

    /// Where to write the test environment entries
    #[arg(long, default_value = "test_env.json")]
    env_out: PathBuf,

    /// Extra environment entry for test runners (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE")]
    env: Vec<String>,

    #[command(flatten)]
    ci: CiEnv,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    buildscope_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Classify(args) => cmd_classify(&args).map(|_| ()),
        Commands::Aggregate(args) => cmd_aggregate(&args),
        Commands::Rules { config } => cmd_rules(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<MatrixConfig> {
    match path {
        Some(path) => MatrixConfig::load(path).with_context(|| format!("load config {:?}", path)),
        None => Ok(MatrixConfig::default()),
    }
}

fn load_changes(args: &ClassifyArgs) -> Result<Option<ChangeSet>> {
    let source: Box<dyn ChangeSource> = match (&args.changes, &args.git_base) {
        (Some(path), _) => Box::new(ListFileSource::new(path)),
        (None, Some(base)) => Box::new(GitDiffSource::new(&args.repo_dir, base.as_str())),
        (None, None) => return Ok(None),
    };
    let changes = source
        .changed_files()
        .context("Failed to read changed files")?;
    Ok(Some(changes))
}

fn describe(scope: &DimensionScope) -> String {
    match scope {
        DimensionScope::Universal => "all".to_string(),
        DimensionScope::Explicit(values) if values.is_empty() => "-".to_string(),
        DimensionScope::Explicit(values) => values.join(","),
    }
}

fn cmd_classify(args: &ClassifyArgs) -> Result<BuildPlan> {
    let config = load_config(args.config.as_deref())?;
    let planner = BuildPlanner::new(&config).context("Failed to compile rule table")?;
    let context = args.ci.context();

    let pull_request = if context.is_pr() {
        let pr = PullRequestRef::resolve(
            args.ci.pr_number.as_deref(),
            args.ci.source_repo_url.as_deref(),
        )
        .context("Failed to resolve pull request")?;
        Some(pr)
    } else {
        None
    };

    let overrides = ScopeOverrides {
        device_types: args.device_types.clone(),
        image_types: args.image_types.clone(),
        python_versions: args.python_versions.clone(),
    };
    if context.is_pr() && !overrides.is_empty() {
        warn!("scope overrides are ignored for pull request builds");
    }

    let changes = if context.is_pr() {
        load_changes(args)?
    } else {
        None
    };

    info!(
        framework = %args.framework,
        context = %context,
        project = args.ci.project_name(),
        "classifying"
    );
    let request = PlanRequest {
        framework: args.framework.clone(),
        build_context: context,
        enable_build: args.ci.enable_build,
        pull_request,
        overrides,
    };
    let plan = planner.plan(&request, changes.as_ref())?;

    write_build_plan(&args.plan_out, &plan)?;
    write_build_flags(&args.flags_out, &plan.matrix)?;

    println!("Framework:  {}", plan.framework);
    println!("Context:    {}", plan.build_context);
    if let Some(pr) = &plan.pull_request {
        println!("PR:         {}/{}#{}", pr.repo.owner, pr.repo.name, pr.number);
    }
    println!("Devices:    {}", describe(&plan.scope.device_types));
    println!("Images:     {}", describe(&plan.scope.image_types));
    println!("Python:     {}", describe(&plan.scope.py_versions));
    println!(
        "Variants:   {} ({})",
        plan.matrix.variants.len(),
        if plan.matrix.enabled {
            "build enabled"
        } else {
            "build disabled"
        }
    );
    println!("Plan:       {:?}", args.plan_out);
    println!("Flags:      {:?}", args.flags_out);

    Ok(plan)
}

fn cmd_aggregate(args: &AggregateArgs) -> Result<()> {
    let plan = read_build_plan(&args.plan)?;
    let images = read_image_descriptors(&args.images)?;
    let env = args
        .env
        .iter()
        .map(|raw| TestEnvEntry::parse_assignment(raw))
        .collect::<Result<Vec<_>>>()?;

    // image reuse follows the global build switch, not the flag policy
    let options = AggregateOptions {
        build_enabled: args.ci.enable_build,
        use_latest_additional_tag: args.use_latest_tag,
    };
    info!(
        framework = %plan.framework,
        images = images.len(),
        project = args.ci.project_name(),
        "aggregating test images"
    );
    let manifest = aggregate_test_images(&images, &plan.scope.test_requirements, options);

    write_test_manifest(&args.manifest_out, &manifest)?;
    write_test_env(&args.env_out, &env)?;

    for test_type in manifest.test_types() {
        println!("{:<10} {}", test_type.as_str(), manifest.images(test_type).len());
    }
    println!("Manifest:   {:?}", args.manifest_out);
    println!("Env:        {:?}", args.env_out);
    Ok(())
}

fn cmd_rules(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    config.validate()?;

    for (idx, rule) in config.rules.iter().enumerate() {
        let kind = serde_json::to_value(rule.kind)?;
        print!(
            "{:>2}. {:<16} {:<15} {}",
            idx + 1,
            rule.name,
            kind.as_str().unwrap_or_default(),
            rule.pattern
        );
        match &rule.exclude {
            Some(exclude) => println!("  (not at {})", exclude),
            None => println!(),
        }
    }

    let universe = &config.universe;
    let join = |values: &std::collections::BTreeSet<String>| {
        values.iter().cloned().collect::<Vec<_>>().join(",")
    };
    println!();
    println!("Frameworks: {}", join(&universe.frameworks));
    println!("Devices:    {}", join(&universe.device_types));
    println!("Images:     {}", join(&universe.image_types));
    println!("Python:     {}", join(&universe.python_versions));
    Ok(())
}
