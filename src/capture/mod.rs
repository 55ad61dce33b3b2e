//! Single-frame screenshots of the displayed video

mod screenshot;
mod surface;

pub use screenshot::{
    capture_screenshot, encode_jpeg, CaptureError, Screenshot, SCREENSHOT_FILE_NAME,
};
pub use surface::{SurfaceRegistry, VideoFrame, VideoSurface};
