use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/session", get(handlers::get_session))
        // Room
        .route("/room/join", post(handlers::join_room))
        .route("/room/leave", post(handlers::leave_room))
        // Local media
        .route("/media/acquire", post(handlers::acquire_media))
        .route("/media/audio/toggle", post(handlers::toggle_audio))
        .route("/media/video/toggle", post(handlers::toggle_video))
        .route("/media/device", post(handlers::switch_device))
        .route("/media/devices", get(handlers::list_devices))
        // View, recording, capture
        .route("/view/swap", post(handlers::swap_view))
        .route("/recording/start", post(handlers::start_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        .route("/capture", post(handlers::capture))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
