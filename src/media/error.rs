use thiserror::Error;

/// Failures reported by the capture platform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("No matching capture device: {0}")]
    NotFound(String),

    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    #[error("Capture platform error: {0}")]
    Platform(String),

    #[error("Superseded by a newer media request")]
    Superseded,
}
