use crate::session::ChatSession;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one chat session, shared with the event loop
    pub session: Arc<Mutex<ChatSession>>,
}

impl AppState {
    pub fn new(session: Arc<Mutex<ChatSession>>) -> Self {
        Self { session }
    }
}
