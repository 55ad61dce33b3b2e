use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

use super::chat::ChatSession;
use crate::relay::RelayEvent;
use crate::rtc::PeerEventEnvelope;

/// Apply relay and peer events to the session, one at a time
///
/// Negotiation failures are logged and not retried; leaving and joining
/// again starts over. Runs until both queues are closed.
pub async fn run_event_loop(
    session: Arc<Mutex<ChatSession>>,
    mut relay_rx: mpsc::UnboundedReceiver<RelayEvent>,
    mut peer_rx: mpsc::UnboundedReceiver<PeerEventEnvelope>,
) {
    info!("Session event loop started");

    loop {
        tokio::select! {
            Some(event) = relay_rx.recv() => {
                let name = event.name();
                let mut session = session.lock().await;
                if let Err(e) = session.handle_relay_event(event).await {
                    error!("Handling relay event {} failed: {}", name, e);
                }
            }
            Some(envelope) = peer_rx.recv() => {
                let mut session = session.lock().await;
                if let Err(e) = session.handle_peer_event(envelope) {
                    error!("Handling peer event failed: {}", e);
                }
            }
            else => break,
        }
    }

    info!("Session event loop stopped");
}
