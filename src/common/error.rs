//! Failure taxonomy for one status poll. Every variant is scoped to a single
//! instrument except `Io`/`Config`, which concern the store root itself.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusError {
    /// `RunInfo.xml` is absent or cannot be parsed: the run is still initializing
    #[error("run metadata unavailable in {}: {reason}", path.display())]
    MetadataUnavailable { path: PathBuf, reason: String },

    /// The summary has no reads or the Q-score histogram has no bins yet
    #[error("metrics not ready: {0}")]
    MetricsNotReady(String),

    /// Anything else that went wrong while reading the binary metrics
    #[error("error reading metrics in {}: {source}", path.display())]
    AdapterFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A completion marker exists but could not be understood
    #[error("malformed completion marker {}: {reason}", path.display())]
    MarkerParseFailure { path: PathBuf, reason: String },

    /// The run parameters file exists but lacks what the report needs
    #[error("malformed run parameters {}: {reason}", path.display())]
    ParametersParseFailure { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StatusError {
    /// True for the two "not ready yet" signals that map to `Initializing`
    pub fn is_initializing(&self) -> bool {
        matches!(
            self,
            StatusError::MetadataUnavailable { .. } | StatusError::MetricsNotReady(_)
        )
    }
}
