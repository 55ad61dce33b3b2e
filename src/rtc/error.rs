use thiserror::Error;

use crate::relay::RelayError;

#[derive(Error, Debug)]
pub enum RtcError {
    #[error("Peer connection error: {0}")]
    Platform(String),

    #[error("Invalid session description: {0}")]
    InvalidDescription(String),

    #[error("Signaling failed: {0}")]
    Signaling(#[from] RelayError),
}
