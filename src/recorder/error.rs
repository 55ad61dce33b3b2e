use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("No remote stream to record")]
    NoRemoteStream,

    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("Recording is not available on this host")]
    Unavailable,

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Saving the recording failed: {0}")]
    Flush(String),
}
