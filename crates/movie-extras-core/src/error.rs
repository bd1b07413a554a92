use std::path::PathBuf;
use thiserror::Error;

use crate::retriever::RetrievalError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Extra config '{}' is invalid: {source}", path.display())]
    ExtraConfig {
        path: PathBuf,
        source: config::ConfigError,
    },

    #[error("Invalid rule '{0}'")]
    InvalidRule(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No metadata match: {0}")]
    MetadataNotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Errors that end the whole run instead of the current folder.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ServiceUnavailable(_))
    }
}
