use thiserror::Error;

use crate::media::MediaError;
use crate::recorder::RecorderError;
use crate::relay::RelayError;
use crate::rtc::RtcError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Please enter a room number")]
    BlankRoom,

    #[error("Already in room {0}")]
    AlreadyJoined(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Negotiation failed: {0}")]
    Negotiation(#[from] RtcError),

    #[error("Relay error: {0}")]
    Signaling(#[from] RelayError),

    #[error("Recording error: {0}")]
    Recording(#[from] RecorderError),

    #[error("No frame could be captured")]
    Capture,
}
