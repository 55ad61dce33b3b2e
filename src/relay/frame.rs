//! Engine.IO v4 / Socket.IO v5 text framing
//!
//! Only what the relay needs: text packets on the default namespace, no
//! binary attachments, no acknowledgements.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::RelayError;

/// Handshake carried by the Engine.IO `open` packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// Transport-level packet
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(text: &str) -> Result<Self, RelayError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| RelayError::Malformed("empty engine packet".to_string()))?;
        let body = chars.as_str();

        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(body)?)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(body.to_string())),
            '3' => Ok(EnginePacket::Pong(body.to_string())),
            '4' => Ok(EnginePacket::Message(body.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(RelayError::Malformed(format!(
                "unknown engine packet type '{}'",
                other
            ))),
        }
    }

    pub fn encode(&self) -> Result<String, RelayError> {
        Ok(match self {
            EnginePacket::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(data) => format!("4{}", data),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        })
    }
}

/// Socket.IO packet carried inside an Engine.IO message
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    ConnectError(Value),
    /// Acks and binary packets, which the relay vocabulary never uses
    Unsupported(char),
}

impl SocketPacket {
    pub fn event(name: impl Into<String>, args: Vec<Value>) -> Self {
        SocketPacket::Event {
            name: name.into(),
            args,
        }
    }

    pub fn decode(text: &str) -> Result<Self, RelayError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| RelayError::Malformed("empty socket packet".to_string()))?;
        let mut rest = chars.as_str();

        // Namespace prefix such as "/chat,"; only the default namespace is joined
        if rest.starts_with('/') {
            rest = match rest.find(',') {
                Some(idx) => &rest[idx + 1..],
                None => "",
            };
        }

        // Ack id
        let payload = rest.trim_start_matches(|c: char| c.is_ascii_digit());

        match kind {
            '0' => {
                if payload.is_empty() {
                    Ok(SocketPacket::Connect(None))
                } else {
                    Ok(SocketPacket::Connect(Some(serde_json::from_str(payload)?)))
                }
            }
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let mut items = match serde_json::from_str::<Value>(payload)? {
                    Value::Array(items) => items,
                    other => {
                        return Err(RelayError::Malformed(format!(
                            "event payload is not an array: {}",
                            other
                        )))
                    }
                };
                if items.is_empty() {
                    return Err(RelayError::Malformed("event without a name".to_string()));
                }
                let name = match items.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(RelayError::Malformed(format!(
                            "event name is not a string: {}",
                            other
                        )))
                    }
                };
                Ok(SocketPacket::Event { name, args: items })
            }
            '4' => Ok(SocketPacket::ConnectError(if payload.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(payload)?
            })),
            '3' | '5' | '6' => Ok(SocketPacket::Unsupported(kind)),
            other => Err(RelayError::Malformed(format!(
                "unknown socket packet type '{}'",
                other
            ))),
        }
    }

    pub fn encode(&self) -> Result<String, RelayError> {
        Ok(match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(auth)) => format!("0{}", serde_json::to_string(auth)?),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                format!("2{}", serde_json::to_string(&items)?)
            }
            SocketPacket::ConnectError(data) => format!("4{}", serde_json::to_string(data)?),
            SocketPacket::Unsupported(kind) => {
                return Err(RelayError::Malformed(format!(
                    "cannot encode packet type '{}'",
                    kind
                )))
            }
        })
    }

    /// Wrap into the Engine.IO message that carries it on the wire
    pub fn to_wire(&self) -> Result<String, RelayError> {
        EnginePacket::Message(self.encode()?).encode()
    }
}

/// WebSocket endpoint for a relay base URL
///
/// `http://host:8080` becomes `ws://host:8080/socket.io/?EIO=4&transport=websocket`.
pub fn websocket_endpoint(relay_url: &str) -> String {
    let trimmed = relay_url.trim_end_matches('/');
    let base = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        trimmed.to_string()
    } else {
        format!("ws://{}", trimmed)
    };

    format!("{}/socket.io/?EIO=4&transport=websocket", base)
}
