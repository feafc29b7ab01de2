//! Tracing setup for the `buildscope` binary.
//!
//! Rule decisions (which path widened the scope, which image landed in
//! which bucket) are logged at info and debug level, so a CI log shows why
//! a variant was or was not built.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber; repeat calls are no-ops.
///
/// `RUST_LOG` overrides `level`. Logs go to stderr: stdout carries the
/// classify and aggregate summaries, which CI steps capture.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .ok();
    }
}
