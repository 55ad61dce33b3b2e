//! Relay event vocabulary
//!
//! | Event           | Direction      | Arguments                          |
//! |-----------------|----------------|------------------------------------|
//! | `join`/`leave`  | client → relay | room                               |
//! | `ready`         | relay → client | room                               |
//! | `offer`/`answer`| both           | (room,) description                |
//! | `ice_candidate` | both           | (room,) `{label, id, candidate}`   |
//! | `leaved`/`bye`  | relay → client | room, peer id                      |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::RelayError;

/// SDP role of a session description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// Session description as exchanged through the relay: `{type, sdp}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// One ICE candidate: `label` is the m-line index, `id` the media id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePayload {
    #[serde(default)]
    pub label: Option<u16>,
    #[serde(default)]
    pub id: Option<String>,
    pub candidate: String,
}

/// Events delivered by the relay
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Second peer joined; the receiver becomes the offerer
    Ready { room: String },
    Offer(SessionDescription),
    Answer(SessionDescription),
    IceCandidate(CandidatePayload),
    /// Peer left cleanly
    Leaved { room: String, peer_id: String },
    /// Peer left abruptly
    Bye { room: String, peer_id: String },
    /// Transport-level: the relay accepted our connection
    Connected,
    /// Transport-level: the relay connection ended
    Disconnected { reason: String },
}

impl RelayEvent {
    /// Decode a Socket.IO event; unknown names yield `None`
    pub fn from_socket_event(name: &str, args: Vec<Value>) -> Result<Option<Self>, RelayError> {
        let mut args = args.into_iter();

        let event = match name {
            "ready" => RelayEvent::Ready {
                room: arg_string(name, args.next())?,
            },
            "offer" => RelayEvent::Offer(arg_object(name, args.next())?),
            "answer" => RelayEvent::Answer(arg_object(name, args.next())?),
            "ice_candidate" => RelayEvent::IceCandidate(arg_object(name, args.next())?),
            "leaved" => RelayEvent::Leaved {
                room: arg_string(name, args.next())?,
                peer_id: arg_string(name, args.next()).unwrap_or_default(),
            },
            "bye" => RelayEvent::Bye {
                room: arg_string(name, args.next())?,
                peer_id: arg_string(name, args.next()).unwrap_or_default(),
            },
            _ => return Ok(None),
        };

        Ok(Some(event))
    }

    pub fn name(&self) -> &'static str {
        match self {
            RelayEvent::Ready { .. } => "ready",
            RelayEvent::Offer(_) => "offer",
            RelayEvent::Answer(_) => "answer",
            RelayEvent::IceCandidate(_) => "ice_candidate",
            RelayEvent::Leaved { .. } => "leaved",
            RelayEvent::Bye { .. } => "bye",
            RelayEvent::Connected => "connect",
            RelayEvent::Disconnected { .. } => "disconnect",
        }
    }
}

/// Room ids may arrive as strings or numbers
fn arg_string(event: &str, value: Option<Value>) -> Result<String, RelayError> {
    match value {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(RelayError::Payload {
            event: event.to_string(),
            reason: format!("expected a string, got {}", other),
        }),
        None => Err(RelayError::Payload {
            event: event.to_string(),
            reason: "missing argument".to_string(),
        }),
    }
}

fn arg_object<T: serde::de::DeserializeOwned>(
    event: &str,
    value: Option<Value>,
) -> Result<T, RelayError> {
    let value = value.ok_or_else(|| RelayError::Payload {
        event: event.to_string(),
        reason: "missing argument".to_string(),
    })?;

    serde_json::from_value(value).map_err(|e| RelayError::Payload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

/// Events sent to the relay; every one is tagged with the room
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Join { room: String },
    Leave { room: String },
    Offer { room: String, description: SessionDescription },
    Answer { room: String, description: SessionDescription },
    IceCandidate { room: String, candidate: CandidatePayload },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Join { .. } => "join",
            ClientEvent::Leave { .. } => "leave",
            ClientEvent::Offer { .. } => "offer",
            ClientEvent::Answer { .. } => "answer",
            ClientEvent::IceCandidate { .. } => "ice_candidate",
        }
    }

    pub fn room(&self) -> &str {
        match self {
            ClientEvent::Join { room }
            | ClientEvent::Leave { room }
            | ClientEvent::Offer { room, .. }
            | ClientEvent::Answer { room, .. }
            | ClientEvent::IceCandidate { room, .. } => room,
        }
    }

    pub fn args(&self) -> Result<Vec<Value>, RelayError> {
        let room = Value::String(self.room().to_string());
        Ok(match self {
            ClientEvent::Join { .. } | ClientEvent::Leave { .. } => vec![room],
            ClientEvent::Offer { description, .. } | ClientEvent::Answer { description, .. } => {
                vec![room, serde_json::to_value(description)?]
            }
            ClientEvent::IceCandidate { candidate, .. } => {
                vec![room, serde_json::to_value(candidate)?]
            }
        })
    }
}
