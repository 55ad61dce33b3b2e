use anyhow::{Context, Result};
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::error::RelayError;
use super::events::{ClientEvent, RelayEvent};
use super::frame::{websocket_endpoint, EnginePacket, SocketPacket};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSender = SplitSink<Ws, Message>;

/// Outbound half of the signaling channel
///
/// Events are delivered to the relay in emission order. Inbound events are
/// not part of the trait: they arrive on the receiver handed out when the
/// channel is created.
pub trait SignalingChannel: Send + Sync {
    fn emit(&self, event: ClientEvent) -> Result<(), RelayError>;
}

/// Socket.IO relay connection over a WebSocket
pub struct RelayClient {
    outgoing: mpsc::UnboundedSender<ClientEvent>,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// What the pump must do after reading one frame
#[derive(Default)]
struct FrameAction {
    reply: Option<String>,
    flush_pending: bool,
    close: bool,
}

impl RelayClient {
    /// Connect to the relay
    ///
    /// Returns the client and the receiver of relay events, in arrival order.
    pub async fn connect(relay_url: &str) -> Result<(Self, mpsc::UnboundedReceiver<RelayEvent>)> {
        let endpoint = websocket_endpoint(relay_url);
        info!("Connecting to relay at {}", endpoint);

        let (ws, _) = connect_async(endpoint.as_str())
            .await
            .context("Failed to connect to relay")?;

        info!("Relay socket open");

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(Self::pump(
            ws,
            outgoing_rx,
            events_tx,
            Arc::clone(&connected),
        ));

        Ok((
            Self {
                outgoing: outgoing_tx,
                connected,
                task,
            },
            events_rx,
        ))
    }

    /// Whether the relay acknowledged our namespace connection
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Disconnect and wait for the socket task to finish
    pub async fn close(self) -> Result<()> {
        info!("Closing relay connection");
        let Self { outgoing, task, .. } = self;
        drop(outgoing);
        task.await.context("Relay task panicked")?;
        Ok(())
    }

    async fn pump(
        ws: Ws,
        mut outgoing: mpsc::UnboundedReceiver<ClientEvent>,
        events: mpsc::UnboundedSender<RelayEvent>,
        connected: Arc<AtomicBool>,
    ) {
        let (mut write, mut read) = ws.split();
        // Events emitted before the relay acknowledged the connection
        let mut pending: VecDeque<ClientEvent> = VecDeque::new();

        let reason = loop {
            tokio::select! {
                msg = read.next() => {
                    let text = match msg {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) => break "relay closed the socket".to_string(),
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => break format!("socket error: {}", e),
                        None => break "socket ended".to_string(),
                    };

                    let action = match Self::on_frame(&text, &events, &connected) {
                        Ok(action) => action,
                        Err(e) => {
                            warn!("Dropping relay frame {:?}: {}", text, e);
                            continue;
                        }
                    };

                    if let Some(reply) = action.reply {
                        if let Err(e) = write.send(Message::Text(reply)).await {
                            break format!("socket error: {}", e);
                        }
                    }

                    if action.flush_pending {
                        while let Some(event) = pending.pop_front() {
                            Self::send_event(&mut write, &event).await;
                        }
                    }

                    if action.close {
                        break "relay disconnected us".to_string();
                    }
                }
                out = outgoing.recv() => {
                    let Some(event) = out else {
                        if let Ok(bye) = SocketPacket::Disconnect.to_wire() {
                            let _ = write.send(Message::Text(bye)).await;
                        }
                        let _ = write.close().await;
                        break "client closed".to_string();
                    };

                    if connected.load(Ordering::SeqCst) {
                        Self::send_event(&mut write, &event).await;
                    } else {
                        debug!("Queueing '{}' until the relay acknowledges us", event.name());
                        pending.push_back(event);
                    }
                }
            }
        };

        connected.store(false, Ordering::SeqCst);
        info!("Relay connection ended: {}", reason);
        let _ = events.send(RelayEvent::Disconnected { reason });
    }

    fn on_frame(
        text: &str,
        events: &mpsc::UnboundedSender<RelayEvent>,
        connected: &AtomicBool,
    ) -> Result<FrameAction, RelayError> {
        let mut action = FrameAction::default();

        match EnginePacket::decode(text)? {
            EnginePacket::Open(handshake) => {
                info!(
                    "Relay handshake: sid={} ping={}ms",
                    handshake.sid, handshake.ping_interval
                );
                action.reply = Some(SocketPacket::Connect(None).to_wire()?);
            }
            EnginePacket::Ping(data) => {
                action.reply = Some(EnginePacket::Pong(data).encode()?);
            }
            EnginePacket::Close => action.close = true,
            EnginePacket::Message(body) => match SocketPacket::decode(&body)? {
                SocketPacket::Connect(_) => {
                    info!("Relay accepted the connection");
                    connected.store(true, Ordering::SeqCst);
                    action.flush_pending = true;
                    let _ = events.send(RelayEvent::Connected);
                }
                SocketPacket::Event { name, args } => {
                    match RelayEvent::from_socket_event(&name, args)? {
                        Some(event) => {
                            debug!("Relay event '{}'", name);
                            let _ = events.send(event);
                        }
                        None => debug!("Ignoring unknown relay event '{}'", name),
                    }
                }
                SocketPacket::Disconnect => action.close = true,
                SocketPacket::ConnectError(data) => {
                    error!("Relay refused the connection: {}", data);
                    action.close = true;
                }
                SocketPacket::Unsupported(kind) => {
                    debug!("Ignoring socket packet type '{}'", kind);
                }
            },
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
        }

        Ok(action)
    }

    async fn send_event(write: &mut WsSender, event: &ClientEvent) {
        let frame = match event
            .args()
            .and_then(|args| SocketPacket::event(event.name(), args).to_wire())
        {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode '{}': {}", event.name(), e);
                return;
            }
        };

        match write.send(Message::Text(frame)).await {
            Ok(()) => debug!("Sent '{}' for room {}", event.name(), event.room()),
            Err(e) => error!("Failed to send '{}': {}", event.name(), e),
        }
    }
}

impl SignalingChannel for RelayClient {
    fn emit(&self, event: ClientEvent) -> Result<(), RelayError> {
        self.outgoing.send(event).map_err(|_| RelayError::Closed)
    }
}
