use std::time::Duration;
use tokio::sync::mpsc;

use super::error::RecorderError;
use crate::media::MediaStream;

/// Produced by a running capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// One encoded slice; may be empty
    Data(Vec<u8>),
    /// Capture finalized after `stop()`; no more data follows
    Stopped,
    /// Capture died
    Error(String),
}

/// Platform media recorder
///
/// `start` hands back the receiver of encoded slices, one per `timeslice`.
/// After `stop` the capture delivers its remaining data followed by
/// [`CaptureEvent::Stopped`] (or closes the channel).
#[async_trait::async_trait]
pub trait MediaCapture: Send + Sync {
    /// Whether the platform can encode into `mime`
    fn is_type_supported(&self, mime: &str) -> bool;

    async fn start(
        &mut self,
        stream: &MediaStream,
        mime: &str,
        timeslice: Duration,
    ) -> Result<mpsc::Receiver<CaptureEvent>, RecorderError>;

    /// Ask the capture to finalize
    async fn stop(&mut self) -> Result<(), RecorderError>;

    /// Mime type actually negotiated by the running capture
    fn mime_type(&self) -> Option<String>;

    fn is_capturing(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}
