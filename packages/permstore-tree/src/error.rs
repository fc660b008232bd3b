//! Error types for permstore-tree

use thiserror::Error;

/// Tree error type
#[derive(Debug, Error)]
pub enum TreeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing/rendering error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing/rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A codec could not decode a node into a typed value
    #[error("Invalid value at '{path}': {message}")]
    Codec { path: String, message: String },

    /// No loader for the given file extension
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

impl TreeError {
    /// Create a codec error for the node at `path`
    pub fn codec(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Codec {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Tree result type
pub type TreeResult<T> = Result<T, TreeError>;
