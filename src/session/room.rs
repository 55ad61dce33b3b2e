use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::SessionError;
use crate::media::MediaStream;
use crate::notify::Notifier;
use crate::relay::{ClientEvent, RelayEvent, SignalingChannel};
use crate::rtc::{NegotiationOrchestrator, PeerEventEnvelope};

pub const PEER_LEFT_NOTICE: &str = "The peer left the room";
pub const LEFT_ROOM_NOTICE: &str = "You left the room";

/// Room membership and the relay-driven side of negotiation
pub struct RoomSession {
    room: String,
    joined: bool,
    signaling: Arc<dyn SignalingChannel>,
    orchestrator: NegotiationOrchestrator,
    notifier: Notifier,
}

impl RoomSession {
    pub fn new(
        signaling: Arc<dyn SignalingChannel>,
        orchestrator: NegotiationOrchestrator,
        notifier: Notifier,
    ) -> Self {
        Self {
            room: String::new(),
            joined: false,
            signaling,
            orchestrator,
            notifier,
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Set the room to join next; ignored while joined
    pub fn set_room(&mut self, room: impl Into<String>) {
        if self.joined {
            warn!("Cannot change room while in room {}", self.room);
            return;
        }
        self.room = room.into();
    }

    pub fn orchestrator(&self) -> &NegotiationOrchestrator {
        &self.orchestrator
    }

    /// Enter `room`
    ///
    /// The joined flag flips as soon as `join` is emitted, without waiting
    /// for the relay. A blank room is refused with a notice and no side
    /// effects.
    pub async fn join(
        &mut self,
        room: &str,
        local: Option<&MediaStream>,
    ) -> Result<(), SessionError> {
        let room = room.trim();
        if room.is_empty() {
            self.notifier.error(SessionError::BlankRoom.to_string());
            return Err(SessionError::BlankRoom);
        }
        if self.joined {
            return Err(SessionError::AlreadyJoined(self.room.clone()));
        }

        self.orchestrator.initialize(local).await?;

        self.signaling.emit(ClientEvent::Join {
            room: room.to_string(),
        })?;

        self.room = room.to_string();
        self.joined = true;
        info!("Joined room {}", self.room);

        Ok(())
    }

    /// Leave the current room and tear down the connection
    pub async fn leave(&mut self) -> Result<(), SessionError> {
        let emitted = if self.room.is_empty() {
            debug!("No room set, nothing to announce");
            Ok(())
        } else {
            self.signaling.emit(ClientEvent::Leave {
                room: self.room.clone(),
            })
        };

        self.joined = false;
        self.orchestrator.reset().await;
        self.notifier.warning(LEFT_ROOM_NOTICE);
        info!("Left room {}", self.room);

        emitted.map_err(SessionError::from)
    }

    pub async fn handle_relay_event(&mut self, event: RelayEvent) -> Result<(), SessionError> {
        debug!("Relay event: {}", event.name());

        match event {
            RelayEvent::Ready { room } => {
                info!("Room {} is ready, sending offer", room);
                self.orchestrator.on_ready(&self.room).await?;
            }
            RelayEvent::Offer(description) => {
                self.orchestrator.on_offer(&self.room, description).await?;
            }
            RelayEvent::Answer(description) => {
                self.orchestrator.on_answer(description).await?;
            }
            RelayEvent::IceCandidate(candidate) => {
                self.orchestrator.handle_remote_candidate(candidate).await?;
            }
            RelayEvent::Leaved { room, peer_id } => {
                info!("Peer {} left room {}", peer_id, room);
                self.orchestrator.reset().await;
            }
            RelayEvent::Bye { room, peer_id } => {
                info!("Peer {} dropped out of room {}", peer_id, room);
                self.joined = false;
                self.notifier.error(PEER_LEFT_NOTICE);
                self.orchestrator.reset().await;
            }
            RelayEvent::Connected => info!("Relay connected"),
            RelayEvent::Disconnected { reason } => warn!("Relay disconnected: {}", reason),
        }

        Ok(())
    }

    pub fn handle_peer_event(&mut self, envelope: PeerEventEnvelope) -> Result<(), SessionError> {
        self.orchestrator.handle_peer_event(&self.room, envelope)?;
        Ok(())
    }
}
