use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::devices::{DeviceInventory, MediaConstraints, MediaDevices};
use super::error::MediaError;
use super::stream::{MediaStream, TrackKind};

/// Whether local audio/video is sent (mirrored onto track `enabled`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputToggles {
    pub audio: bool,
    pub video: bool,
}

impl Default for OutputToggles {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

impl OutputToggles {
    pub fn get(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Audio => self.audio,
            TrackKind::Video => self.video,
        }
    }
}

/// What a pending capture request is for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPurpose {
    Acquire,
    Switch { kind: TrackKind, device_id: String },
}

/// A capture request detached from the controller
///
/// Lets callers run the platform call without holding the session lock. The
/// token is checked when the response is applied; only the latest request
/// may replace the local stream.
pub struct MediaRequest {
    token: u64,
    purpose: RequestPurpose,
    constraints: MediaConstraints,
    devices: Arc<dyn MediaDevices>,
}

impl MediaRequest {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub async fn execute(self) -> MediaResponse {
        let result = self.devices.get_user_media(&self.constraints).await;
        MediaResponse {
            token: self.token,
            purpose: self.purpose,
            result,
        }
    }
}

/// Outcome of a [`MediaRequest`]
pub struct MediaResponse {
    token: u64,
    purpose: RequestPurpose,
    result: Result<MediaStream, MediaError>,
}

impl MediaResponse {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn purpose(&self) -> &RequestPurpose {
        &self.purpose
    }
}

/// Owns the local capture stream
pub struct LocalMediaController {
    devices: Arc<dyn MediaDevices>,
    stream: Option<MediaStream>,
    toggles: OutputToggles,
    inventory: DeviceInventory,
    latest_request: u64,
}

impl LocalMediaController {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            stream: None,
            toggles: OutputToggles::default(),
            inventory: DeviceInventory::default(),
            latest_request: 0,
        }
    }

    pub fn stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref()
    }

    pub fn toggles(&self) -> OutputToggles {
        self.toggles
    }

    pub fn inventory(&self) -> &DeviceInventory {
        &self.inventory
    }

    /// Acquire a capture stream, then refresh the device inventory
    pub async fn acquire(&mut self, constraints: MediaConstraints) -> Result<(), MediaError> {
        let response = self.begin_acquire(constraints).execute().await;
        self.apply(response)?;
        self.refresh_devices().await?;
        Ok(())
    }

    /// Replace the local stream with one captured from `device_id`
    ///
    /// On failure the previous stream stays authoritative and untouched.
    pub async fn switch_device(
        &mut self,
        kind: TrackKind,
        device_id: &str,
    ) -> Result<(), MediaError> {
        let response = self.begin_switch(kind, device_id).execute().await;
        self.apply(response)
    }

    pub fn begin_acquire(&mut self, constraints: MediaConstraints) -> MediaRequest {
        self.issue(RequestPurpose::Acquire, constraints)
    }

    pub fn begin_switch(&mut self, kind: TrackKind, device_id: &str) -> MediaRequest {
        self.issue(
            RequestPurpose::Switch {
                kind,
                device_id: device_id.to_string(),
            },
            MediaConstraints::device(kind, device_id),
        )
    }

    fn issue(&mut self, purpose: RequestPurpose, constraints: MediaConstraints) -> MediaRequest {
        self.latest_request += 1;
        MediaRequest {
            token: self.latest_request,
            purpose,
            constraints,
            devices: Arc::clone(&self.devices),
        }
    }

    /// Adopt the stream from a finished request
    ///
    /// Stale responses are discarded and their tracks stopped. Failed
    /// responses leave the current stream in place.
    pub fn apply(&mut self, response: MediaResponse) -> Result<(), MediaError> {
        let stream = match response.result {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Media request #{} failed: {}", response.token, e);
                return Err(e);
            }
        };

        if response.token != self.latest_request {
            warn!(
                "Discarding stale media response #{} (latest is #{})",
                response.token, self.latest_request
            );
            stream.stop_all();
            return Err(MediaError::Superseded);
        }

        for track in stream.tracks() {
            track.set_enabled(self.toggles.get(track.kind));
        }

        if let Some(old) = self.stream.take() {
            old.stop_all();
        }

        if let RequestPurpose::Switch { kind, device_id } = &response.purpose {
            self.inventory.select(*kind, device_id);
            info!("Switched {} input to device {}", kind, device_id);
        }

        info!(
            "Local stream {} adopted ({} tracks)",
            stream.id,
            stream.tracks().len()
        );
        self.stream = Some(stream);

        Ok(())
    }

    pub async fn refresh_devices(&mut self) -> Result<(), MediaError> {
        self.inventory.list_devices(self.devices.as_ref()).await?;
        Ok(())
    }

    pub fn toggle_audio(&mut self) -> bool {
        self.toggle(TrackKind::Audio)
    }

    pub fn toggle_video(&mut self) -> bool {
        self.toggle(TrackKind::Video)
    }

    /// Flip one output toggle and mirror it onto the matching tracks
    fn toggle(&mut self, kind: TrackKind) -> bool {
        let enabled = match kind {
            TrackKind::Audio => {
                self.toggles.audio = !self.toggles.audio;
                self.toggles.audio
            }
            TrackKind::Video => {
                self.toggles.video = !self.toggles.video;
                self.toggles.video
            }
        };

        if let Some(stream) = &self.stream {
            for track in stream.tracks_of(kind) {
                track.set_enabled(enabled);
            }
        }

        info!("Local {} output {}", kind, if enabled { "on" } else { "off" });
        enabled
    }

    /// Stop and drop the local stream
    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop_all();
            info!("Local stream {} released", stream.id);
        }
    }
}
