use super::state::AppState;
use crate::media::{MediaConstraints, MediaError, TrackKind};
use crate::recorder::RecorderError;
use crate::session::SessionError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub room: String,
}

#[derive(Debug, Deserialize)]
pub struct AcquireRequest {
    #[serde(default = "enabled")]
    pub audio: bool,
    #[serde(default = "enabled")]
    pub video: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SwitchDeviceRequest {
    pub kind: TrackKind,
    pub device_id: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub kind: TrackKind,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct SwapResponse {
    pub swapped: bool,
}

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub file_name: String,
    pub data_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

// ============================================================================
// Error mapping
// ============================================================================

fn classify(err: &SessionError) -> (StatusCode, &'static str) {
    match err {
        SessionError::BlankRoom => (StatusCode::BAD_REQUEST, "blank_room"),
        SessionError::AlreadyJoined(_) => (StatusCode::CONFLICT, "already_joined"),
        SessionError::Media(MediaError::PermissionDenied(_)) => {
            (StatusCode::BAD_REQUEST, "permission_denied")
        }
        SessionError::Media(MediaError::NotFound(_)) => {
            (StatusCode::BAD_REQUEST, "device_not_found")
        }
        SessionError::Media(MediaError::Superseded) => (StatusCode::CONFLICT, "superseded"),
        SessionError::Media(_) => (StatusCode::INTERNAL_SERVER_ERROR, "media_error"),
        SessionError::Recording(RecorderError::NoRemoteStream) => {
            (StatusCode::CONFLICT, "no_remote_stream")
        }
        SessionError::Recording(RecorderError::AlreadyRecording) => {
            (StatusCode::CONFLICT, "already_recording")
        }
        SessionError::Recording(RecorderError::Unavailable) => {
            (StatusCode::CONFLICT, "recording_unavailable")
        }
        SessionError::Recording(_) => (StatusCode::INTERNAL_SERVER_ERROR, "recording_failed"),
        SessionError::Capture => (StatusCode::CONFLICT, "capture_failed"),
        SessionError::Negotiation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "negotiation_failed"),
        SessionError::Signaling(_) => (StatusCode::INTERNAL_SERVER_ERROR, "relay_error"),
    }
}

fn error_response(err: SessionError) -> Response {
    let (status, code) = classify(&err);
    if status.is_server_error() {
        error!("{}: {}", code, err);
    }
    (
        status,
        Json(ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }),
    )
        .into_response()
}

fn respond<T: Serialize>(result: Result<T, SessionError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /session
pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    let snapshot = session.snapshot().await;
    Json(snapshot)
}

/// POST /room/join
pub async fn join_room(State(state): State<AppState>, Json(req): Json<JoinRequest>) -> Response {
    info!("Join requested for room {:?}", req.room);
    let mut session = state.session.lock().await;
    let result = match session.join(&req.room).await {
        Ok(()) => Ok(session.snapshot().await),
        Err(e) => Err(e),
    };
    respond(result)
}

/// POST /room/leave
pub async fn leave_room(State(state): State<AppState>) -> Response {
    let mut session = state.session.lock().await;
    let result = match session.leave().await {
        Ok(()) => Ok(session.snapshot().await),
        Err(e) => Err(e),
    };
    respond(result)
}

/// POST /media/acquire
///
/// The platform call runs with the session unlocked; a newer request
/// started meanwhile wins.
pub async fn acquire_media(
    State(state): State<AppState>,
    Json(req): Json<AcquireRequest>,
) -> Response {
    let request = {
        let mut session = state.session.lock().await;
        session.begin_media_request(MediaConstraints::new(req.audio, req.video))
    };
    let response = request.execute().await;

    let mut session = state.session.lock().await;
    let result = match session.finish_media_request(response).await {
        Ok(()) => Ok(session.snapshot().await),
        Err(e) => Err(e),
    };
    respond(result)
}

/// POST /media/audio/toggle
pub async fn toggle_audio(State(state): State<AppState>) -> impl IntoResponse {
    let enabled = state.session.lock().await.toggle_audio();
    Json(ToggleResponse {
        kind: TrackKind::Audio,
        enabled,
    })
}

/// POST /media/video/toggle
pub async fn toggle_video(State(state): State<AppState>) -> impl IntoResponse {
    let enabled = state.session.lock().await.toggle_video();
    Json(ToggleResponse {
        kind: TrackKind::Video,
        enabled,
    })
}

/// POST /media/device
pub async fn switch_device(
    State(state): State<AppState>,
    Json(req): Json<SwitchDeviceRequest>,
) -> Response {
    let request = {
        let mut session = state.session.lock().await;
        session.begin_device_switch(req.kind, &req.device_id)
    };
    let response = request.execute().await;

    let mut session = state.session.lock().await;
    let result = match session.finish_media_request(response).await {
        Ok(()) => Ok(session.snapshot().await),
        Err(e) => Err(e),
    };
    respond(result)
}

/// GET /media/devices
pub async fn list_devices(State(state): State<AppState>) -> Response {
    let mut session = state.session.lock().await;
    let result = session.list_devices().await;
    respond(result)
}

/// POST /view/swap
pub async fn swap_view(State(state): State<AppState>) -> impl IntoResponse {
    let swapped = state.session.lock().await.toggle_view_swap();
    Json(SwapResponse { swapped })
}

/// POST /recording/start
pub async fn start_recording(State(state): State<AppState>) -> Response {
    let mut session = state.session.lock().await;
    let result = match session.start_recording().await {
        Ok(()) => Ok(session.snapshot().await),
        Err(e) => Err(e),
    };
    respond(result)
}

/// POST /recording/stop
///
/// Returns the saved file, or `null` when nothing was recording.
pub async fn stop_recording(State(state): State<AppState>) -> Response {
    let mut session = state.session.lock().await;
    let result = session.stop_recording().await;
    respond(result)
}

/// POST /capture
pub async fn capture(State(state): State<AppState>) -> Response {
    let session = state.session.lock().await;
    let result = session
        .capture_screenshot()
        .await
        .map(|shot| CaptureResponse {
            file_name: shot.file_name,
            data_url: shot.data_url,
        })
        .ok_or(SessionError::Capture);
    respond(result)
}
