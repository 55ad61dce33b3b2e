use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::error::SessionError;
use super::room::RoomSession;
use super::snapshot::{SessionSnapshot, StreamSource};
use crate::capture::{self, Screenshot, SurfaceRegistry, VideoSurface};
use crate::download::DownloadSink;
use crate::media::{
    DeviceInventory, LocalMediaController, MediaConstraints, MediaDevices, MediaError, MediaRequest,
    MediaResponse, MediaStream, RequestPurpose, TrackKind,
};
use crate::notify::Notifier;
use crate::recorder::{MediaCapture, Recorder, RecordingSettings, SavedRecording};
use crate::relay::{RelayEvent, SignalingChannel};
use crate::rtc::{NegotiationOrchestrator, PeerConfig, PeerConnector, PeerEventEnvelope};

/// Collaborators a session is built from
pub struct SessionParts {
    pub devices: Arc<dyn MediaDevices>,
    pub connector: Arc<dyn PeerConnector>,
    pub signaling: Arc<dyn SignalingChannel>,
    /// None when the host cannot record
    pub capture: Option<Box<dyn MediaCapture>>,
    pub downloads: Arc<dyn DownloadSink>,
    pub peer_config: PeerConfig,
    pub recording: RecordingSettings,
    pub notifier: Notifier,
}

/// Everything one chat client owns
///
/// Callers serialize access (the event loop and the control API share it
/// behind one async mutex), so every handler runs to completion before the
/// next one starts.
pub struct ChatSession {
    room: RoomSession,
    media: LocalMediaController,
    recorder: Recorder,
    surfaces: SurfaceRegistry,
    downloads: Arc<dyn DownloadSink>,
    swapped: bool,
    notifier: Notifier,
}

impl ChatSession {
    /// Build a session; the receiver yields the peer connection's events
    pub fn new(parts: SessionParts) -> (Self, mpsc::UnboundedReceiver<PeerEventEnvelope>) {
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();

        let orchestrator = NegotiationOrchestrator::new(
            parts.connector,
            Arc::clone(&parts.signaling),
            parts.peer_config,
            peer_tx,
        );

        let session = Self {
            room: RoomSession::new(parts.signaling, orchestrator, parts.notifier.clone()),
            media: LocalMediaController::new(parts.devices),
            recorder: Recorder::new(
                parts.capture,
                Arc::clone(&parts.downloads),
                parts.notifier.clone(),
                parts.recording,
            ),
            surfaces: SurfaceRegistry::default(),
            downloads: parts.downloads,
            swapped: false,
            notifier: parts.notifier,
        };

        (session, peer_rx)
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn room(&self) -> &str {
        self.room.room()
    }

    pub fn is_joined(&self) -> bool {
        self.room.is_joined()
    }

    pub fn room_session(&self) -> &RoomSession {
        &self.room
    }

    pub fn media(&self) -> &LocalMediaController {
        &self.media
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    // Room

    pub fn set_room(&mut self, room: impl Into<String>) {
        self.room.set_room(room);
    }

    pub async fn join(&mut self, room: &str) -> Result<(), SessionError> {
        self.room.join(room, self.media.stream()).await
    }

    /// Join the room set with [`ChatSession::set_room`]
    pub async fn join_current(&mut self) -> Result<(), SessionError> {
        let room = self.room.room().to_string();
        self.join(&room).await
    }

    pub async fn leave(&mut self) -> Result<(), SessionError> {
        self.room.leave().await
    }

    pub async fn handle_relay_event(&mut self, event: RelayEvent) -> Result<(), SessionError> {
        self.room.handle_relay_event(event).await
    }

    pub fn handle_peer_event(&mut self, envelope: PeerEventEnvelope) -> Result<(), SessionError> {
        self.room.handle_peer_event(envelope)
    }

    // Local media

    /// Acquire a local stream and refresh the device inventory
    pub async fn acquire_media(
        &mut self,
        constraints: MediaConstraints,
    ) -> Result<(), SessionError> {
        let response = self.begin_media_request(constraints).execute().await;
        self.finish_media_request(response).await
    }

    /// Start an acquisition without holding the session
    ///
    /// Run [`MediaRequest::execute`] with the session unlocked, then hand the
    /// response to [`ChatSession::finish_media_request`]. A response
    /// superseded by a later request is discarded.
    pub fn begin_media_request(&mut self, constraints: MediaConstraints) -> MediaRequest {
        self.media.begin_acquire(constraints)
    }

    pub fn begin_device_switch(&mut self, kind: TrackKind, device_id: &str) -> MediaRequest {
        self.media.begin_switch(kind, device_id)
    }

    pub async fn finish_media_request(
        &mut self,
        response: MediaResponse,
    ) -> Result<(), SessionError> {
        let refresh = matches!(response.purpose(), RequestPurpose::Acquire);

        if let Err(e) = self.media.apply(response) {
            if e != MediaError::Superseded {
                self.notifier.error(format!("Could not access media devices: {}", e));
            }
            return Err(e.into());
        }

        if refresh {
            self.media.refresh_devices().await?;
        }
        Ok(())
    }

    pub async fn switch_device(
        &mut self,
        kind: TrackKind,
        device_id: &str,
    ) -> Result<(), SessionError> {
        let response = self.begin_device_switch(kind, device_id).execute().await;
        self.finish_media_request(response).await
    }

    pub async fn list_devices(&mut self) -> Result<DeviceInventory, SessionError> {
        self.media.refresh_devices().await?;
        Ok(self.media.inventory().clone())
    }

    pub fn toggle_audio(&mut self) -> bool {
        self.media.toggle_audio()
    }

    pub fn toggle_video(&mut self) -> bool {
        self.media.toggle_video()
    }

    // View

    pub fn is_swapped(&self) -> bool {
        self.swapped
    }

    pub fn toggle_view_swap(&mut self) -> bool {
        self.swapped = !self.swapped;
        info!("View swapped: {}", self.swapped);
        self.swapped
    }

    fn source_of(&self, big: bool) -> StreamSource {
        if big != self.swapped {
            StreamSource::Remote
        } else {
            StreamSource::Local
        }
    }

    fn stream_of(&self, source: StreamSource) -> Option<&MediaStream> {
        match source {
            StreamSource::Local => self.media.stream(),
            StreamSource::Remote => self.room.orchestrator().remote_stream(),
        }
    }

    pub fn big_stream(&self) -> Option<&MediaStream> {
        self.stream_of(self.source_of(true))
    }

    pub fn small_stream(&self) -> Option<&MediaStream> {
        self.stream_of(self.source_of(false))
    }

    pub fn register_big_surface(&mut self, surface: Option<Arc<dyn VideoSurface>>) {
        self.surfaces.register_big(surface);
    }

    pub fn register_small_surface(&mut self, surface: Option<Arc<dyn VideoSurface>>) {
        self.surfaces.register_small(surface);
    }

    // Recording and capture

    pub async fn start_recording(&mut self) -> Result<(), SessionError> {
        let remote = self.room.orchestrator().remote_stream();
        self.recorder.start(remote).await?;
        Ok(())
    }

    pub async fn stop_recording(&mut self) -> Result<Option<SavedRecording>, SessionError> {
        Ok(self.recorder.stop().await?)
    }

    pub async fn capture_screenshot(&self) -> Option<Screenshot> {
        capture::capture_screenshot(
            &self.surfaces,
            self.swapped,
            self.downloads.as_ref(),
            &self.notifier,
        )
        .await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let toggles = self.media.toggles();
        let orchestrator = self.room.orchestrator();

        SessionSnapshot {
            room: self.room.room().to_string(),
            joined: self.room.is_joined(),
            has_local_stream: self.media.stream().is_some(),
            has_remote_video: orchestrator.remote_stream().is_some(),
            audio_enabled: toggles.audio,
            video_enabled: toggles.video,
            devices: self.media.inventory().clone(),
            swapped: self.swapped,
            big: self.source_of(true),
            small: self.source_of(false),
            negotiation: orchestrator.state(),
            role: orchestrator.role(),
            recording: self.recorder.state().await,
            recording_available: self.recorder.is_available(),
            elapsed_secs: self.recorder.elapsed_secs(),
        }
    }

    /// Stop recording, leave the room and release local media
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.recorder.stop().await {
            warn!("Recording did not stop cleanly: {}", e);
        }
        if self.room.is_joined() {
            if let Err(e) = self.room.leave().await {
                warn!("Leave on shutdown failed: {}", e);
            }
        }
        self.media.release();
    }
}
