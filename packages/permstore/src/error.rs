//! Error types for permstore

use std::fmt;

use permstore_tree::TreeError;
use thiserror::Error;

/// Backend error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing configuration; fatal at construction
    Configuration,
    /// Reading persisted state failed
    Load,
    /// Writing persisted state failed
    Storage,
    /// A matcher group could not be created as requested
    InvalidGroup,
    /// Several child backends failed at once
    Aggregate,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Load => "load",
            ErrorKind::Storage => "storage",
            ErrorKind::InvalidGroup => "invalid_group",
            ErrorKind::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backend error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct BackendError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn load(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Load, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn invalid_group(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidGroup, message)
    }

    /// One error naming every failed backend, in the order given
    pub fn aggregate(failures: Vec<(String, BackendError)>) -> Self {
        let details = failures
            .iter()
            .map(|(identifier, err)| format!("{}: {}", identifier, err))
            .collect::<Vec<_>>()
            .join("; ");
        Self::new(
            ErrorKind::Aggregate,
            format!("{} backend(s) failed: {}", failures.len(), details),
        )
    }

    pub fn is_configuration(&self) -> bool {
        self.kind == ErrorKind::Configuration
    }
}

impl From<TreeError> for BackendError {
    fn from(err: TreeError) -> Self {
        let kind = match err {
            TreeError::Codec { .. } | TreeError::UnsupportedFormat(_) => ErrorKind::Configuration,
            _ => ErrorKind::Load,
        };
        BackendError::new(kind, err.to_string()).with_source(err)
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::storage(format!("IO error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_includes_kind() {
        let err = BackendError::configuration("backends list is empty");
        assert_eq!(err.to_string(), "[configuration] backends list is empty");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_aggregate_lists_every_failure() {
        let err = BackendError::aggregate(vec![
            ("file".to_string(), BackendError::load("missing")),
            ("sql".to_string(), BackendError::storage("locked")),
        ]);
        assert_eq!(err.kind, ErrorKind::Aggregate);
        assert!(err.message.contains("2 backend(s) failed"));
        assert!(err.message.contains("file: [load] missing"));
        assert!(err.message.contains("sql: [storage] locked"));
    }

    #[test]
    fn test_tree_codec_error_is_configuration() {
        let err: BackendError = TreeError::codec("backends", "expected a list").into();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_error_is_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: BackendError = io.into();
        assert_eq!(err.kind, ErrorKind::Storage);
    }
}
