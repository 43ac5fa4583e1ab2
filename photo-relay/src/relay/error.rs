//! Error types for the upload relay

use thiserror::Error;

use crate::generation::GenerationError;
use crate::storage::StorageError;

/// Errors that can occur while relaying one upload
#[derive(Error, Debug)]
pub enum RelayError {
    /// Upload carried no bytes
    #[error("uploaded image is empty")]
    EmptyImage,

    /// Upload is not an `image/*` type
    #[error("unsupported content type: {0}")]
    NotAnImage(String),

    /// Staging or storing failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// External generation failed
    #[error(transparent)]
    Generation(#[from] GenerationError),
}
