use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Malformed relay packet: {0}")]
    Malformed(String),

    #[error("Unexpected payload for '{event}': {reason}")]
    Payload { event: String, reason: String },

    #[error("Relay connection closed")]
    Closed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
