//! Error types for temp file storage

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while staging uploads or serving results
#[derive(Error, Debug)]
pub enum StorageError {
    /// File name rejected by the allow-list
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    /// Well-formed name with no file behind it
    #[error("File not found: {0}")]
    NotFound(String),

    /// Image MIME type with no stored format
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
