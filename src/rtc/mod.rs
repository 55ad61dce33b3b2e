//! Peer connection negotiation
//!
//! The platform's real-time stack sits behind [`PeerConnector`] /
//! [`PeerConnection`]; [`NegotiationOrchestrator`] drives it from relay
//! events and turns its callbacks into [`PeerEvent`] messages.

pub mod error;
pub mod native;
pub mod orchestrator;
pub mod peer;

pub use error::RtcError;
pub use native::WebRtcConnector;
pub use orchestrator::{NegotiationOrchestrator, NegotiationRole, NegotiationState};
pub use peer::{
    IceConnectionState, IceServer, PeerConfig, PeerConnection, PeerConnector, PeerEvent,
    PeerEventEnvelope, PeerEventSink, TransceiverDirection, DEFAULT_STUN_SERVER,
};
