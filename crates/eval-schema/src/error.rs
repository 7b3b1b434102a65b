//! Error types for eval-schema

use std::path::PathBuf;

/// Result type for eval-schema operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, saving or typing configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} config for {path}: {message}")]
    ConfigSerialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error("Invalid model type: {value}")]
    InvalidModelType { value: String },

    #[error("Metric not registered: {class_name}")]
    UnknownMetric { class_name: String },

    #[error("Invalid parameter '{param}' for {class_name}: {message}")]
    InvalidParam {
        class_name: String,
        param: String,
        message: String,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_param(
        class_name: &str,
        param: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParam {
            class_name: class_name.to_string(),
            param: param.to_string(),
            message: message.into(),
        }
    }
}
