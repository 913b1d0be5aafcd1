use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for the path length LAI estimator
#[derive(Error, Debug)]
pub enum LaiPathError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error on line {line}: {message}")]
    Parse {
        line: usize,
        message: String,
    },

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

impl LaiPathError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        LaiPathError::InvalidInput(message.into())
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, LaiPathError>;
