//! Error types for the document model.

use std::io;
use thiserror::Error;

/// Errors that can occur working with G-code documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Project JSON could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Project payload is structurally invalid.
    #[error("Invalid project: {0}")]
    InvalidProject(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_error_display() {
        let err = DocumentError::InvalidProject("missing lines array".to_string());
        assert_eq!(err.to_string(), "Invalid project: missing lines array");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: DocumentError = io_err.into();
        assert!(matches!(err, DocumentError::Io(_)));
    }
}
