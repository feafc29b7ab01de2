//! Error taxonomy for classification and aggregation runs.

/// Errors produced by buildscope.
///
/// Pattern and path errors indicate a defect in the rule table or in a
/// handler's structural assumptions; they abort the run rather than being
/// treated as bad input.
#[derive(Debug, thiserror::Error)]
pub enum BuildScopeError {
    #[error("invalid pattern for rule '{rule}': {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("malformed path for rule '{rule}': '{path}' has no segment {index}")]
    MalformedPath {
        rule: String,
        path: String,
        index: usize,
    },

    #[error("pull request number is not set")]
    MissingPrNumber,

    #[error("invalid pull request number: {0}")]
    InvalidPrNumber(String),

    #[error("source repository URL is not set")]
    MissingSourceRepo,

    #[error("invalid source repository URL: {0}")]
    InvalidSourceRepo(String),

    #[error("invalid build context: {0}")]
    InvalidBuildContext(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("change source error: {0}")]
    ChangeSource(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for buildscope operations.
pub type Result<T> = std::result::Result<T, BuildScopeError>;
