use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing {kind} for culture '{culture}' at {path}: run agroqa-build to regenerate the index artifacts")]
    MissingArtifact {
        kind: &'static str,
        culture: String,
        path: PathBuf,
    },

    #[error("invalid data in {path}: {reason}")]
    DataFormat { path: PathBuf, reason: String },

    #[error("nothing to evaluate: {0}")]
    Evaluation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
