//! The chat session: room membership, local media, recording and capture
//! wired together around one negotiation orchestrator

mod chat;
mod error;
mod event_loop;
mod room;
mod snapshot;

pub use chat::{ChatSession, SessionParts};
pub use error::SessionError;
pub use event_loop::run_event_loop;
pub use room::{RoomSession, LEFT_ROOM_NOTICE, PEER_LEFT_NOTICE};
pub use snapshot::{SessionSnapshot, StreamSource};
