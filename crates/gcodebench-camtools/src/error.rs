//! Error types for DXF import.

use std::io;
use thiserror::Error;

/// Errors that can occur while loading and converting DXF geometry.
///
/// Geometry loading is fatal on failure: an unreadable or malformed file
/// surfaces one of these and no partial document is returned. Degenerate
/// geometry inside a readable file is silently skipped instead.
#[derive(Error, Debug)]
pub enum DxfImportError {
    /// The DXF file could not be read or parsed.
    #[error("DXF parse error: {0}")]
    Parse(#[from] dxf::DxfError),

    /// I/O error during file reading.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file contains no convertible entities.
    #[error("Empty file: {0}")]
    EmptyFile(String),
}

/// Result type alias for DXF import operations.
pub type DxfImportResult<T> = Result<T, DxfImportError>;
