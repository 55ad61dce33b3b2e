use serde::Serialize;

use crate::media::DeviceInventory;
use crate::recorder::RecorderState;
use crate::rtc::{NegotiationRole, NegotiationState};

/// Which stream a display slot shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    Local,
    Remote,
}

/// Point-in-time view of the session, as the UI layer renders it
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub room: String,
    pub joined: bool,
    pub has_local_stream: bool,
    pub has_remote_video: bool,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub devices: DeviceInventory,
    pub swapped: bool,
    pub big: StreamSource,
    pub small: StreamSource,
    pub negotiation: NegotiationState,
    pub role: NegotiationRole,
    pub recording: RecorderState,
    pub recording_available: bool,
    pub elapsed_secs: u64,
}
