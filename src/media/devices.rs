use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::MediaError;
use super::stream::{MediaStream, TrackKind};

/// Device category as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    AudioInput,
    VideoInput,
    AudioOutput,
}

/// One enumerated device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub kind: DeviceKind,
    pub label: String,
}

/// Constraint for one kind of track in a capture request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackConstraint {
    /// Do not capture this kind
    #[default]
    Off,
    /// Any device of this kind
    Any,
    /// Exactly this device
    Device(String),
}

/// What to capture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    #[serde(default)]
    pub audio: TrackConstraint,
    #[serde(default)]
    pub video: TrackConstraint,
}

impl MediaConstraints {
    pub fn new(audio: bool, video: bool) -> Self {
        let pick = |on: bool| if on { TrackConstraint::Any } else { TrackConstraint::Off };
        Self {
            audio: pick(audio),
            video: pick(video),
        }
    }

    /// Capture only `kind`, from the given device
    pub fn device(kind: TrackKind, device_id: impl Into<String>) -> Self {
        let device = TrackConstraint::Device(device_id.into());
        match kind {
            TrackKind::Audio => Self {
                audio: device,
                video: TrackConstraint::Off,
            },
            TrackKind::Video => Self {
                audio: TrackConstraint::Off,
                video: device,
            },
        }
    }
}

/// Capture platform: device enumeration and stream acquisition
///
/// Implementations:
/// - `HeadlessDevices`: hosts without capture hardware
/// - test fakes with scripted inventories
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    /// List every device the platform knows about
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, MediaError>;

    /// Open a capture stream matching the constraints
    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaStream, MediaError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Capture platform for hosts without cameras or microphones
///
/// The client still works as a receive-only peer: the peer connection adds
/// receive-only transceivers when no local track exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessDevices;

#[async_trait::async_trait]
impl MediaDevices for HeadlessDevices {
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, MediaError> {
        Ok(Vec::new())
    }

    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaStream, MediaError> {
        Err(MediaError::NotFound(format!(
            "no capture hardware on this host (audio: {:?}, video: {:?})",
            constraints.audio, constraints.video
        )))
    }

    fn name(&self) -> &str {
        "headless"
    }
}

/// Latest enumeration split by kind, plus the current selection per kind
///
/// A selection is always one of the devices from the latest enumeration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceInventory {
    audio: Vec<DeviceInfo>,
    video: Vec<DeviceInfo>,
    selected_audio: Option<DeviceInfo>,
    selected_video: Option<DeviceInfo>,
}

impl DeviceInventory {
    /// Enumerate input devices and refresh the selection
    ///
    /// Returns `(audio, video)`. A selection that disappeared from the
    /// enumeration falls back to the first device of its kind.
    pub async fn list_devices(
        &mut self,
        devices: &dyn MediaDevices,
    ) -> Result<(Vec<DeviceInfo>, Vec<DeviceInfo>), MediaError> {
        let all = devices.enumerate_devices().await?;

        self.audio = all
            .iter()
            .filter(|d| d.kind == DeviceKind::AudioInput)
            .cloned()
            .collect();
        self.video = all
            .iter()
            .filter(|d| d.kind == DeviceKind::VideoInput)
            .cloned()
            .collect();

        self.selected_audio = Self::keep_or_first(self.selected_audio.take(), &self.audio);
        self.selected_video = Self::keep_or_first(self.selected_video.take(), &self.video);

        info!(
            "Enumerated devices via {}: {} audio, {} video",
            devices.name(),
            self.audio.len(),
            self.video.len()
        );

        Ok((self.audio.clone(), self.video.clone()))
    }

    fn keep_or_first(current: Option<DeviceInfo>, listed: &[DeviceInfo]) -> Option<DeviceInfo> {
        match current {
            Some(device) if listed.iter().any(|d| d.device_id == device.device_id) => Some(device),
            _ => listed.first().cloned(),
        }
    }

    /// Select a listed device; unknown ids leave the selection unchanged
    pub fn select(&mut self, kind: TrackKind, device_id: &str) -> bool {
        let (listed, selected) = match kind {
            TrackKind::Audio => (&self.audio, &mut self.selected_audio),
            TrackKind::Video => (&self.video, &mut self.selected_video),
        };

        match listed.iter().find(|d| d.device_id == device_id) {
            Some(device) => {
                *selected = Some(device.clone());
                true
            }
            None => {
                debug!("Device {} is not in the {} inventory", device_id, kind);
                false
            }
        }
    }

    pub fn audio(&self) -> &[DeviceInfo] {
        &self.audio
    }

    pub fn video(&self) -> &[DeviceInfo] {
        &self.video
    }

    pub fn selected_audio(&self) -> Option<&DeviceInfo> {
        self.selected_audio.as_ref()
    }

    pub fn selected_video(&self) -> Option<&DeviceInfo> {
        self.selected_video.as_ref()
    }
}
