//! Signaling relay: event vocabulary, Socket.IO framing, WebSocket client

pub mod client;
pub mod error;
pub mod events;
pub mod frame;

pub use client::{RelayClient, SignalingChannel};
pub use error::RelayError;
pub use events::{CandidatePayload, ClientEvent, RelayEvent, SdpKind, SessionDescription};
