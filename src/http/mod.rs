//! HTTP control API standing in for the UI layer
//!
//! - GET /health, GET /session
//! - POST /room/join, POST /room/leave
//! - POST /media/acquire, /media/audio/toggle, /media/video/toggle, /media/device
//! - GET /media/devices
//! - POST /view/swap, /recording/start, /recording/stop, /capture

mod handlers;
mod routes;
mod state;

pub use handlers::ErrorResponse;
pub use routes::create_router;
pub use state::AppState;
