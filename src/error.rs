//! Error types for multibuild.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for multibuild.
#[derive(Error, Debug)]
pub enum MultibuildError {
    #[error("Please add a path to the configuration file")]
    MissingConfigPath,

    #[error("Failure loading configurations from {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file {path} is not valid JSON: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("File {0} should contain an array of build configurations")]
    NotASequence(PathBuf),

    #[error("File {0} contains no build configurations")]
    EmptyConfiguration(PathBuf),

    #[error("Configuration index {index} is out of range (set has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid watch options: {0}")]
    InvalidWatchOptions(String),

    #[error("Compiler error: {0}")]
    Compiler(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MultibuildError {
    /// Whether this error comes from loading the configuration set.
    ///
    /// These errors are fatal: there is no work to distribute, so no retry applies.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingConfigPath
                | Self::ConfigLoad { .. }
                | Self::ConfigParse { .. }
                | Self::NotASequence(_)
                | Self::EmptyConfiguration(_)
        )
    }
}

/// Result type alias for multibuild operations.
pub type Result<T> = std::result::Result<T, MultibuildError>;
