use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::error::RtcError;
use super::peer::{
    IceConnectionState, PeerConfig, PeerConnection, PeerConnector, PeerEvent, PeerEventEnvelope,
    PeerEventSink, TransceiverDirection,
};
use crate::media::{MediaStream, TrackKind};
use crate::relay::{CandidatePayload, ClientEvent, SessionDescription, SignalingChannel};

/// Lifecycle of the single peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegotiationState {
    Uninitialized,
    Configured,
    Negotiating,
    Connected,
    Closed,
}

/// Which side of the offer/answer exchange we are on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegotiationRole {
    Unknown,
    Offerer,
    Answerer,
}

/// Owns the peer connection and drives offer/answer/candidate exchange
pub struct NegotiationOrchestrator {
    connector: Arc<dyn PeerConnector>,
    signaling: Arc<dyn SignalingChannel>,
    config: PeerConfig,
    events_tx: mpsc::UnboundedSender<PeerEventEnvelope>,

    connection: Option<Box<dyn PeerConnection>>,
    /// Bumped for every new connection; events from older ones are dropped
    generation: u64,
    state: NegotiationState,
    role: NegotiationRole,
    remote_stream: Option<MediaStream>,
}

impl NegotiationOrchestrator {
    pub fn new(
        connector: Arc<dyn PeerConnector>,
        signaling: Arc<dyn SignalingChannel>,
        config: PeerConfig,
        events_tx: mpsc::UnboundedSender<PeerEventEnvelope>,
    ) -> Self {
        Self {
            connector,
            signaling,
            config,
            events_tx,
            connection: None,
            generation: 0,
            state: NegotiationState::Uninitialized,
            role: NegotiationRole::Unknown,
            remote_stream: None,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn role(&self) -> NegotiationRole {
        self.role
    }

    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn remote_stream(&self) -> Option<&MediaStream> {
        self.remote_stream.as_ref()
    }

    /// Create the connection and attach local media
    ///
    /// Kinds without a local track get a receive-only transceiver so remote
    /// media of that kind can still arrive. An existing connection is closed
    /// first.
    pub async fn initialize(&mut self, local: Option<&MediaStream>) -> Result<(), RtcError> {
        if self.connection.is_some() {
            warn!("Peer connection already exists, replacing it");
            self.reset().await;
        }
        // Each connection negotiates its own role
        self.role = NegotiationRole::Unknown;

        self.generation += 1;
        let sink = PeerEventSink::new(self.generation, self.events_tx.clone());

        info!(
            "Creating peer connection #{} via {}",
            self.generation,
            self.connector.name()
        );
        let connection = self.connector.connect(&self.config, sink).await?;

        for kind in [TrackKind::Video, TrackKind::Audio] {
            let has_track = local.map(|s| s.has_kind(kind)).unwrap_or(false);
            if !has_track {
                debug!("No local {} track, adding receive-only transceiver", kind);
                connection
                    .add_transceiver(kind, TransceiverDirection::RecvOnly)
                    .await?;
            }
        }

        if let Some(stream) = local {
            for track in stream.tracks() {
                connection.add_track(track, stream).await?;
                debug!("Attached local {} track {}", track.kind, track.id);
            }
        }

        self.connection = Some(connection);
        self.state = NegotiationState::Configured;

        Ok(())
    }

    /// Produce a local description and send it to the relay
    ///
    /// No-op without a connection. Failures propagate to the caller.
    pub async fn negotiate(&mut self, room: &str, is_offer: bool) -> Result<(), RtcError> {
        let Some(connection) = self.connection.as_ref() else {
            info!("No peer connection yet, skipping negotiation");
            return Ok(());
        };

        let description = if is_offer {
            connection.create_offer().await?
        } else {
            connection.create_answer().await?
        };

        connection.set_local_description(description.clone()).await?;
        let local = connection.local_description().await.unwrap_or(description);

        let event = if is_offer {
            ClientEvent::Offer {
                room: room.to_string(),
                description: local,
            }
        } else {
            ClientEvent::Answer {
                room: room.to_string(),
                description: local,
            }
        };

        info!("Sending {} for room {}", event.name(), room);
        self.signaling.emit(event)?;

        if self.state != NegotiationState::Connected {
            self.state = NegotiationState::Negotiating;
        }

        Ok(())
    }

    /// Apply a description delivered by the relay; no-op without a connection
    pub async fn handle_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), RtcError> {
        match self.connection.as_ref() {
            Some(connection) => {
                debug!("Applying remote {:?}", description.kind);
                connection.set_remote_description(description).await?;
                if self.state == NegotiationState::Configured {
                    self.state = NegotiationState::Negotiating;
                }
                Ok(())
            }
            None => {
                debug!("Remote description arrived without a peer connection, ignored");
                Ok(())
            }
        }
    }

    /// Apply a candidate delivered by the relay; ignored before `initialize`
    pub async fn handle_remote_candidate(
        &mut self,
        candidate: CandidatePayload,
    ) -> Result<(), RtcError> {
        match self.connection.as_ref() {
            Some(connection) => {
                debug!("Adding remote ICE candidate (m-line {:?})", candidate.label);
                connection.add_ice_candidate(candidate).await
            }
            None => {
                debug!("Remote candidate arrived without a peer connection, ignored");
                Ok(())
            }
        }
    }

    /// Set the role once; a conflicting assignment is refused
    pub fn assign_role(&mut self, role: NegotiationRole) -> bool {
        match self.role {
            NegotiationRole::Unknown => {
                info!("Negotiation role: {:?}", role);
                self.role = role;
                true
            }
            current if current == role => true,
            current => {
                warn!("Ignoring {:?} role, already {:?}", role, current);
                false
            }
        }
    }

    /// Relay says the second peer arrived: we make the offer
    pub async fn on_ready(&mut self, room: &str) -> Result<(), RtcError> {
        if !self.assign_role(NegotiationRole::Offerer) {
            return Ok(());
        }
        self.negotiate(room, true).await
    }

    /// Peer made an offer: apply it and answer
    pub async fn on_offer(
        &mut self,
        room: &str,
        description: SessionDescription,
    ) -> Result<(), RtcError> {
        if !self.assign_role(NegotiationRole::Answerer) {
            return Ok(());
        }
        self.handle_remote_description(description).await?;
        self.negotiate(room, false).await
    }

    pub async fn on_answer(&mut self, description: SessionDescription) -> Result<(), RtcError> {
        self.handle_remote_description(description).await
    }

    /// Apply a connection callback
    ///
    /// Events from a connection that was reset or replaced are dropped.
    pub fn handle_peer_event(
        &mut self,
        room: &str,
        envelope: PeerEventEnvelope,
    ) -> Result<(), RtcError> {
        if self.connection.is_none() || envelope.generation != self.generation {
            debug!(
                "Dropping event from stale peer connection #{} (current #{})",
                envelope.generation, self.generation
            );
            return Ok(());
        }

        match envelope.event {
            PeerEvent::LocalCandidate(candidate) => {
                debug!("Forwarding local ICE candidate");
                self.signaling.emit(ClientEvent::IceCandidate {
                    room: room.to_string(),
                    candidate,
                })?;
            }
            PeerEvent::IceStateChanged(state) => {
                info!("ICE connection state: {:?}", state);
                match state {
                    IceConnectionState::Connected | IceConnectionState::Completed => {
                        self.state = NegotiationState::Connected;
                    }
                    IceConnectionState::Disconnected => {
                        // The connection itself is kept; ICE may recover
                        self.remote_stream = None;
                    }
                    IceConnectionState::Failed => {
                        error!("ICE failed; leave and rejoin to retry");
                    }
                    _ => {}
                }
            }
            PeerEvent::RemoteTrack { streams } => match streams.into_iter().next() {
                Some(stream) => {
                    info!(
                        "Remote stream {} ({} tracks)",
                        stream.id,
                        stream.tracks().len()
                    );
                    self.remote_stream = Some(stream);
                }
                None => debug!("Remote track without a stream, ignored"),
            },
        }

        Ok(())
    }

    /// Close and drop the connection, clear remote media; idempotent
    pub async fn reset(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                error!("Failed to close peer connection: {}", e);
            }
            info!("Peer connection #{} closed", self.generation);
            self.state = NegotiationState::Closed;
        }

        self.role = NegotiationRole::Unknown;
        self.remote_stream = None;
    }
}
