use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

use super::surface::{SurfaceRegistry, VideoFrame};
use crate::download::DownloadSink;
use crate::notify::Notifier;

pub const SCREENSHOT_FILE_NAME: &str = "captured_frame.jpg";

const JPEG_QUALITY: u8 = 92;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Video not loaded yet")]
    FrameNotLoaded,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("JPEG encoding failed: {0}")]
    Encode(String),

    #[error("Download failed: {0}")]
    Download(String),
}

/// A captured frame
#[derive(Debug, Clone, Serialize)]
pub struct Screenshot {
    pub file_name: String,
    pub path: PathBuf,
    /// `data:image/jpeg;base64,...`
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

/// Capture the frame on the surface showing the remote stream
///
/// Failures are reported through the notifier and yield `None`; nothing is
/// propagated and no state changes.
pub async fn capture_screenshot(
    surfaces: &SurfaceRegistry,
    swapped: bool,
    downloads: &dyn DownloadSink,
    notifier: &Notifier,
) -> Option<Screenshot> {
    match try_capture(surfaces, swapped, downloads).await {
        Ok(screenshot) => Some(screenshot),
        Err(CaptureError::FrameNotLoaded) => {
            notifier.error(CaptureError::FrameNotLoaded.to_string());
            None
        }
        Err(e) => {
            error!("Screenshot error: {}", e);
            notifier.error("Screenshot failed");
            None
        }
    }
}

async fn try_capture(
    surfaces: &SurfaceRegistry,
    swapped: bool,
    downloads: &dyn DownloadSink,
) -> Result<Screenshot, CaptureError> {
    let surface = surfaces
        .capture_source(swapped)
        .ok_or(CaptureError::FrameNotLoaded)?;

    let (width, height) = surface.intrinsic_size();
    if width == 0 || height == 0 {
        return Err(CaptureError::FrameNotLoaded);
    }

    let frame = surface.current_frame().ok_or(CaptureError::FrameNotLoaded)?;
    let jpeg = encode_jpeg(&frame, width, height)?;
    let data_url = format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&jpeg)
    );

    let path = downloads
        .download(SCREENSHOT_FILE_NAME, &jpeg)
        .await
        .map_err(|e| CaptureError::Download(e.to_string()))?;

    info!("Captured {}x{} frame to {}", width, height, path.display());

    Ok(Screenshot {
        file_name: SCREENSHOT_FILE_NAME.to_string(),
        path,
        data_url,
        width,
        height,
    })
}

/// Draw `frame` onto a `width`x`height` bitmap and encode it as JPEG
pub fn encode_jpeg(frame: &VideoFrame, width: u32, height: u32) -> Result<Vec<u8>, CaptureError> {
    let bitmap = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone()).ok_or_else(|| {
        CaptureError::InvalidFrame(format!(
            "{} bytes do not fill {}x{} RGBA",
            frame.rgba.len(),
            frame.width,
            frame.height
        ))
    })?;

    let bitmap = if (frame.width, frame.height) == (width, height) {
        bitmap
    } else {
        image::imageops::resize(&bitmap, width, height, FilterType::Triangle)
    };

    let rgb = DynamicImage::ImageRgba8(bitmap).to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;

    Ok(jpeg)
}
