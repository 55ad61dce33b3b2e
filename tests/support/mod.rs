// In-memory stand-ins for the platform collaborators
#![allow(dead_code)]

use peercall::capture::{VideoFrame, VideoSurface};
use peercall::download::{DownloadError, DownloadSink};
use peercall::media::{
    DeviceInfo, DeviceKind, MediaConstraints, MediaDevices, MediaError, MediaStream, MediaTrack,
    TrackConstraint, TrackKind,
};
use peercall::notify::{Notice, Notifier};
use peercall::recorder::{CaptureEvent, MediaCapture, RecorderError, RecordingSettings};
use peercall::relay::{
    CandidatePayload, ClientEvent, RelayError, SessionDescription, SignalingChannel,
};
use peercall::rtc::{
    PeerConfig, PeerConnection, PeerConnector, PeerEventSink, RtcError, TransceiverDirection,
};
use peercall::session::{ChatSession, SessionParts};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

// ============================================================================
// Media devices
// ============================================================================

/// Scripted capture platform
#[derive(Default)]
pub struct FakeDevices {
    pub devices: Mutex<Vec<DeviceInfo>>,
    /// Failures returned by the next `get_user_media` calls, in order
    pub failures: Mutex<VecDeque<MediaError>>,
    pub requests: Mutex<Vec<MediaConstraints>>,
    counter: AtomicUsize,
}

impl FakeDevices {
    pub fn with_devices(devices: Vec<DeviceInfo>) -> Self {
        Self {
            devices: Mutex::new(devices),
            ..Default::default()
        }
    }

    pub fn fail_next(&self, error: MediaError) {
        self.failures.lock().unwrap().push_back(error);
    }
}

pub fn device(kind: DeviceKind, id: &str) -> DeviceInfo {
    DeviceInfo {
        device_id: id.to_string(),
        kind,
        label: format!("{} {}", id, kind_label(kind)),
    }
}

fn kind_label(kind: DeviceKind) -> &'static str {
    match kind {
        DeviceKind::AudioInput => "mic",
        DeviceKind::VideoInput => "camera",
        DeviceKind::AudioOutput => "speaker",
    }
}

#[async_trait::async_trait]
impl MediaDevices for FakeDevices {
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, MediaError> {
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaStream, MediaError> {
        self.requests.lock().unwrap().push(constraints.clone());
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let mut tracks = Vec::new();
        if constraints.audio != TrackConstraint::Off {
            tracks.push(MediaTrack::new(format!("audio-{}", n), TrackKind::Audio, "mic"));
        }
        if constraints.video != TrackConstraint::Off {
            tracks.push(MediaTrack::new(format!("video-{}", n), TrackKind::Video, "camera"));
        }
        Ok(MediaStream::new(format!("local-{}", n), tracks))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

// ============================================================================
// Signaling
// ============================================================================

/// Records every emitted client event
#[derive(Default)]
pub struct RecordingChannel {
    pub emitted: Mutex<Vec<ClientEvent>>,
}

impl RecordingChannel {
    pub fn events(&self) -> Vec<ClientEvent> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.name()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.emitted.lock().unwrap().clear();
    }
}

impl SignalingChannel for RecordingChannel {
    fn emit(&self, event: ClientEvent) -> Result<(), RelayError> {
        self.emitted.lock().unwrap().push(event);
        Ok(())
    }
}

// ============================================================================
// Peer connections
// ============================================================================

/// Everything done to the fake connections
#[derive(Debug, Default)]
pub struct PeerLog {
    pub connections: usize,
    pub transceivers: Vec<(TrackKind, TransceiverDirection)>,
    pub tracks: Vec<String>,
    pub local_descriptions: Vec<SessionDescription>,
    pub remote_descriptions: Vec<SessionDescription>,
    pub candidates: Vec<CandidatePayload>,
    pub closed: usize,
}

#[derive(Default)]
pub struct FakeConnector {
    pub log: Arc<Mutex<PeerLog>>,
    /// Sink of the latest connection, to inject callbacks
    pub sinks: Mutex<Vec<PeerEventSink>>,
    pub fail_offers: Mutex<bool>,
}

impl FakeConnector {
    pub fn log(&self) -> std::sync::MutexGuard<'_, PeerLog> {
        self.log.lock().unwrap()
    }

    pub fn sink(&self, index: usize) -> PeerEventSink {
        self.sinks.lock().unwrap()[index].clone()
    }

    pub fn last_sink(&self) -> Option<PeerEventSink> {
        self.sinks.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl PeerConnector for FakeConnector {
    async fn connect(
        &self,
        _config: &PeerConfig,
        events: PeerEventSink,
    ) -> Result<Box<dyn PeerConnection>, RtcError> {
        self.log.lock().unwrap().connections += 1;
        self.sinks.lock().unwrap().push(events);
        Ok(Box::new(FakePeer {
            log: Arc::clone(&self.log),
            local: Mutex::new(None),
            fail_offers: *self.fail_offers.lock().unwrap(),
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub struct FakePeer {
    log: Arc<Mutex<PeerLog>>,
    local: Mutex<Option<SessionDescription>>,
    fail_offers: bool,
}

#[async_trait::async_trait]
impl PeerConnection for FakePeer {
    async fn add_track(&self, track: &MediaTrack, _stream: &MediaStream) -> Result<(), RtcError> {
        self.log.lock().unwrap().tracks.push(track.id.clone());
        Ok(())
    }

    async fn add_transceiver(
        &self,
        kind: TrackKind,
        direction: TransceiverDirection,
    ) -> Result<(), RtcError> {
        self.log.lock().unwrap().transceivers.push((kind, direction));
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, RtcError> {
        if self.fail_offers {
            return Err(RtcError::Platform("offer failed".to_string()));
        }
        Ok(SessionDescription::offer("v=0 local-offer"))
    }

    async fn create_answer(&self) -> Result<SessionDescription, RtcError> {
        Ok(SessionDescription::answer("v=0 local-answer"))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<(), RtcError> {
        self.log.lock().unwrap().local_descriptions.push(description.clone());
        *self.local.lock().unwrap() = Some(description);
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), RtcError> {
        self.log.lock().unwrap().remote_descriptions.push(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: CandidatePayload) -> Result<(), RtcError> {
        self.log.lock().unwrap().candidates.push(candidate);
        Ok(())
    }

    async fn close(&self) -> Result<(), RtcError> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

// ============================================================================
// Recording capture
// ============================================================================

/// Counters shared between a test and its [`FakeCapture`]
#[derive(Default)]
pub struct CaptureCalls {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub started_with: Mutex<Option<String>>,
}

/// Capture that emits scripted chunks
///
/// Chunks queued with `chunks` are delivered on start; `stop` delivers
/// `final_chunk` (if any) and then `Stopped`.
pub struct FakeCapture {
    pub supported: Vec<String>,
    pub chunks: Vec<Vec<u8>>,
    pub final_chunk: Option<Vec<u8>>,
    pub fail_with: Option<String>,
    pub calls: Arc<CaptureCalls>,
    tx: Option<mpsc::Sender<CaptureEvent>>,
    mime: Option<String>,
}

impl FakeCapture {
    pub fn new(supported: &[&str], chunks: Vec<Vec<u8>>) -> Self {
        Self {
            supported: supported.iter().map(|s| s.to_string()).collect(),
            chunks,
            final_chunk: None,
            fail_with: None,
            calls: Arc::new(CaptureCalls::default()),
            tx: None,
            mime: None,
        }
    }
}

#[async_trait::async_trait]
impl MediaCapture for FakeCapture {
    fn is_type_supported(&self, mime: &str) -> bool {
        self.supported.iter().any(|s| s == mime)
    }

    async fn start(
        &mut self,
        _stream: &MediaStream,
        mime: &str,
        _timeslice: Duration,
    ) -> Result<mpsc::Receiver<CaptureEvent>, RecorderError> {
        self.calls.starts.fetch_add(1, Ordering::SeqCst);
        *self.calls.started_with.lock().unwrap() = Some(mime.to_string());

        let (tx, rx) = mpsc::channel(64);
        for chunk in &self.chunks {
            tx.send(CaptureEvent::Data(chunk.clone()))
                .await
                .map_err(|e| RecorderError::Capture(e.to_string()))?;
        }
        // Fails once, the next start captures normally
        if let Some(reason) = self.fail_with.take() {
            tx.send(CaptureEvent::Error(reason))
                .await
                .map_err(|e| RecorderError::Capture(e.to_string()))?;
        }

        self.mime = Some(mime.to_string());
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), RecorderError> {
        self.calls.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = self.tx.take() {
            if let Some(chunk) = self.final_chunk.take() {
                let _ = tx.send(CaptureEvent::Data(chunk)).await;
            }
            let _ = tx.send(CaptureEvent::Stopped).await;
        }
        self.mime = None;
        Ok(())
    }

    fn mime_type(&self) -> Option<String> {
        self.mime.clone()
    }

    fn is_capturing(&self) -> bool {
        self.tx.is_some()
    }

    fn name(&self) -> &str {
        "fake-capture"
    }
}

// ============================================================================
// Downloads and surfaces
// ============================================================================

/// Keeps downloads in memory
#[derive(Default)]
pub struct MemoryDownloads {
    pub files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryDownloads {
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DownloadSink for MemoryDownloads {
    async fn download(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
        self.files
            .lock()
            .unwrap()
            .push((file_name.to_string(), bytes.to_vec()));
        Ok(PathBuf::from("/memory").join(file_name))
    }
}

/// Surface showing a solid color
pub struct SolidSurface {
    pub width: u32,
    pub height: u32,
    pub rgba: [u8; 4],
}

impl VideoSurface for SolidSurface {
    fn intrinsic_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let pixels = (self.width * self.height) as usize;
        Some(VideoFrame {
            width: self.width,
            height: self.height,
            rgba: self.rgba.iter().copied().cycle().take(pixels * 4).collect(),
        })
    }
}

// ============================================================================
// Session harness
// ============================================================================

pub struct Harness {
    pub session: ChatSession,
    pub peer_rx: mpsc::UnboundedReceiver<peercall::rtc::PeerEventEnvelope>,
    pub devices: Arc<FakeDevices>,
    pub connector: Arc<FakeConnector>,
    pub channel: Arc<RecordingChannel>,
    pub downloads: Arc<MemoryDownloads>,
    pub notices: broadcast::Receiver<Notice>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_capture(None)
    }

    pub fn with_capture(capture: Option<Box<dyn MediaCapture>>) -> Self {
        let devices = Arc::new(FakeDevices::with_devices(vec![
            device(DeviceKind::AudioInput, "mic-1"),
            device(DeviceKind::AudioInput, "mic-2"),
            device(DeviceKind::VideoInput, "cam-1"),
            device(DeviceKind::VideoInput, "cam-2"),
        ]));
        let connector = Arc::new(FakeConnector::default());
        let channel = Arc::new(RecordingChannel::default());
        let downloads = Arc::new(MemoryDownloads::default());
        let notifier = Notifier::new();
        let notices = notifier.subscribe();

        let (session, peer_rx) = ChatSession::new(SessionParts {
            devices: devices.clone(),
            connector: connector.clone(),
            signaling: channel.clone(),
            capture,
            downloads: downloads.clone(),
            peer_config: PeerConfig::default(),
            recording: RecordingSettings::default(),
            notifier,
        });

        Self {
            session,
            peer_rx,
            devices,
            connector,
            channel,
            downloads,
            notices,
        }
    }

    /// Notices raised so far
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            notices.push(notice);
        }
        notices
    }

    /// Apply every queued peer event to the session
    pub fn pump_peer_events(&mut self) {
        while let Ok(envelope) = self.peer_rx.try_recv() {
            let _ = self.session.handle_peer_event(envelope);
        }
    }
}

pub fn remote_stream(id: &str) -> MediaStream {
    MediaStream::new(
        id,
        vec![
            MediaTrack::new(format!("{}-a", id), TrackKind::Audio, "remote audio"),
            MediaTrack::new(format!("{}-v", id), TrackKind::Video, "remote video"),
        ],
    )
}
