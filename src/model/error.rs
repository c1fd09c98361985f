use std::path::PathBuf;

use thiserror::Error;

/// Problems loading or validating fitted model artifacts. All of these are
/// fatal at startup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read model artifact {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact {path} is not valid JSON for its kind")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid token pattern: {0}")]
    TokenPattern(#[from] regex::Error),
    #[error("token pattern may have at most one capture group, found {0}")]
    TokenGroups(usize),
    #[error("invalid vocabulary: {0}")]
    Vocabulary(String),
    #[error("invalid classifier: {0}")]
    Classifier(String),
    #[error("extractor produces {extractor} features but the classifier expects {classifier}")]
    DimensionMismatch { extractor: usize, classifier: usize },
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("feature vector has {actual} columns but the classifier was fitted on {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
