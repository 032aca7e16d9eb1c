//! Error types for session metadata, remote label sync and label export.

use thiserror::Error;

/// Errors raised while reading or validating session metadata.
#[derive(Error, Debug)]
pub enum SessionError {
    /// JSON parsing error
    #[error("Failed to parse session: {0}")]
    Json(#[from] serde_json::Error),

    /// Shape array too short or with zero dimensions
    #[error("Invalid image shape {0:?}")]
    InvalidShape(Vec<u32>),

    /// Neither `image_shape` nor `seg_shape` present
    #[error("Session '{image_id}' has no image shape")]
    MissingShape { image_id: String },

    /// Empty or whitespace-only image id
    #[error("Image id must not be blank")]
    BlankImageId,
}

/// Errors talking to the remote label store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Request could not be sent or the connection failed
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("Server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Requested image/session does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local storage backend failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(e: std::io::Error) -> Self {
        SyncError::Storage(e.to_string())
    }
}

impl From<SessionError> for SyncError {
    fn from(e: SessionError) -> Self {
        SyncError::Decode(e.to_string())
    }
}

/// Errors exporting or importing a label document.
#[derive(Error, Debug)]
pub enum ExportError {
    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error writing or reading the document
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing to export or import into
    #[error("No session loaded")]
    NoSession,

    /// The document belongs to another image
    #[error("Label file is for image '{found}', expected '{expected}'")]
    ImageMismatch { expected: String, found: String },
}
