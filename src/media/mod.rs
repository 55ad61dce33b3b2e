//! Local media: capture streams, device inventory, output toggles

pub mod controller;
pub mod devices;
pub mod error;
pub mod stream;

pub use controller::{
    LocalMediaController, MediaRequest, MediaResponse, OutputToggles, RequestPurpose,
};
pub use devices::{
    DeviceInfo, DeviceInventory, DeviceKind, HeadlessDevices, MediaConstraints, MediaDevices,
    TrackConstraint,
};
pub use error::MediaError;
pub use stream::{MediaStream, MediaTrack, TrackKind};
