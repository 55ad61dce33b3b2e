use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::error::RtcError;
use crate::media::{MediaStream, MediaTrack, TrackKind};
use crate::relay::{CandidatePayload, SessionDescription};

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
}

/// Peer connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub ice_servers: Vec<IceServer>,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServer {
                urls: vec![DEFAULT_STUN_SERVER.to_string()],
            }],
        }
    }
}

impl PeerConfig {
    pub fn from_urls(urls: &[String]) -> Self {
        Self {
            ice_servers: urls
                .iter()
                .map(|url| IceServer {
                    urls: vec![url.clone()],
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransceiverDirection {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

/// Something the peer connection reported
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// A local ICE candidate was gathered
    LocalCandidate(CandidatePayload),
    IceStateChanged(IceConnectionState),
    /// A remote track arrived, with the streams it belongs to
    RemoteTrack { streams: Vec<MediaStream> },
}

/// A [`PeerEvent`] stamped with the connection that produced it
#[derive(Debug, Clone)]
pub struct PeerEventEnvelope {
    pub generation: u64,
    pub event: PeerEvent,
}

/// Where a connection delivers its callbacks
///
/// Callbacks are turned into messages so the session applies them one at a
/// time, in order, next to relay events.
#[derive(Debug, Clone)]
pub struct PeerEventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<PeerEventEnvelope>,
}

impl PeerEventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<PeerEventEnvelope>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the session stopped listening
    pub fn emit(&self, event: PeerEvent) -> bool {
        self.tx
            .send(PeerEventEnvelope {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// One negotiation object (the platform's peer connection)
#[async_trait::async_trait]
pub trait PeerConnection: Send + Sync {
    /// Send a local track to the peer
    async fn add_track(&self, track: &MediaTrack, stream: &MediaStream) -> Result<(), RtcError>;

    /// Reserve a media slot without a local track
    async fn add_transceiver(
        &self,
        kind: TrackKind,
        direction: TransceiverDirection,
    ) -> Result<(), RtcError>;

    async fn create_offer(&self) -> Result<SessionDescription, RtcError>;

    async fn create_answer(&self) -> Result<SessionDescription, RtcError>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<(), RtcError>;

    /// The applied local description, once set
    async fn local_description(&self) -> Option<SessionDescription>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<(), RtcError>;

    async fn add_ice_candidate(&self, candidate: CandidatePayload) -> Result<(), RtcError>;

    async fn close(&self) -> Result<(), RtcError>;
}

/// Creates peer connections wired to an event sink
#[async_trait::async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(
        &self,
        config: &PeerConfig,
        events: PeerEventSink,
    ) -> Result<Box<dyn PeerConnection>, RtcError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
