use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::capture::{CaptureEvent, MediaCapture};
use super::error::RecorderError;
use super::mime::{
    recording_file_name, select_mime_type, supported_mime_types, DEFAULT_MIME_PREFERENCES,
    FALLBACK_MIME,
};
use crate::download::DownloadSink;
use crate::media::MediaStream;
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    Idle,
    Recording,
    /// Capture asked to finalize, flush pending
    Stopping,
}

/// Recording parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSettings {
    /// Mime types to try, most preferred first
    pub mime_preferences: Vec<String>,

    /// Used when none of the preferences is supported
    pub fallback_mime: String,

    /// Length of each captured slice
    pub timeslice: Duration,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            mime_preferences: DEFAULT_MIME_PREFERENCES.iter().map(|m| m.to_string()).collect(),
            fallback_mime: FALLBACK_MIME.to_string(),
            timeslice: Duration::from_secs(1),
        }
    }
}

/// A recording written out by the download sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedRecording {
    pub file_name: String,
    pub path: PathBuf,
    pub mime_type: String,
    pub bytes: usize,
}

/// State shared with the chunk collector task
struct Shared {
    state: RecorderState,
    chunks: Vec<Vec<u8>>,
    last_saved: Option<SavedRecording>,
}

/// Records the remote stream into a local file
pub struct Recorder {
    /// None when this host has no recording backend
    capture: Option<Box<dyn MediaCapture>>,
    downloads: Arc<dyn DownloadSink>,
    notifier: Notifier,
    settings: RecordingSettings,

    /// Supported preferences, queried on first start
    supported: Option<Vec<String>>,

    shared: Arc<Mutex<Shared>>,
    elapsed_secs: Arc<AtomicU64>,
    timer: Option<JoinHandle<()>>,
    collector: Option<JoinHandle<()>>,
}

impl Recorder {
    pub fn new(
        capture: Option<Box<dyn MediaCapture>>,
        downloads: Arc<dyn DownloadSink>,
        notifier: Notifier,
        settings: RecordingSettings,
    ) -> Self {
        Self {
            capture,
            downloads,
            notifier,
            settings,
            supported: None,
            shared: Arc::new(Mutex::new(Shared {
                state: RecorderState::Idle,
                chunks: Vec::new(),
                last_saved: None,
            })),
            elapsed_secs: Arc::new(AtomicU64::new(0)),
            timer: None,
            collector: None,
        }
    }

    pub async fn state(&self) -> RecorderState {
        self.shared.lock().await.state
    }

    pub async fn is_recording(&self) -> bool {
        self.state().await == RecorderState::Recording
    }

    /// Seconds elapsed in the current (or last) recording
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs.load(Ordering::SeqCst)
    }

    /// Number of non-empty slices buffered so far
    pub async fn buffered_chunks(&self) -> usize {
        self.shared.lock().await.chunks.len()
    }

    pub fn is_available(&self) -> bool {
        self.capture.is_some()
    }

    /// Start recording `remote`
    ///
    /// Fails with [`RecorderError::NoRemoteStream`] when there is nothing to
    /// record; no capture is started in that case.
    pub async fn start(&mut self, remote: Option<&MediaStream>) -> Result<(), RecorderError> {
        if self.state().await != RecorderState::Idle {
            warn!("Recording already in progress");
            return Err(RecorderError::AlreadyRecording);
        }

        match self.try_start(remote).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.handle_error(&e).await;
                Err(e)
            }
        }
    }

    async fn try_start(&mut self, remote: Option<&MediaStream>) -> Result<(), RecorderError> {
        let stream = remote.ok_or(RecorderError::NoRemoteStream)?;
        let capture = self.capture.as_mut().ok_or(RecorderError::Unavailable)?;

        if capture.is_capturing() {
            warn!("Stopping capture left running by a failed recording");
            capture.stop().await?;
        }

        let supported = self.supported.get_or_insert_with(|| {
            supported_mime_types(&self.settings.mime_preferences, |mime| {
                capture.is_type_supported(mime)
            })
        });
        let mime = select_mime_type(
            &self.settings.mime_preferences,
            |mime| supported.iter().any(|s| s == mime),
            &self.settings.fallback_mime,
        );

        let session_id = Uuid::new_v4();
        info!(
            "Starting recording {} of stream {} via {} ({})",
            session_id,
            stream.id,
            capture.name(),
            mime
        );

        let rx = capture.start(stream, &mime, self.settings.timeslice).await?;
        let negotiated = capture.mime_type().unwrap_or(mime);

        {
            let mut shared = self.shared.lock().await;
            shared.state = RecorderState::Recording;
            shared.chunks.clear();
            shared.last_saved = None;
        }

        self.collector = Some(tokio::spawn(Self::collect(
            rx,
            Arc::clone(&self.shared),
            Arc::clone(&self.downloads),
            self.notifier.clone(),
            negotiated,
        )));
        self.start_timer();

        Ok(())
    }

    /// Stop recording and wait for the file to be written
    ///
    /// No-op unless recording. Returns the saved file, if the flush succeeded.
    pub async fn stop(&mut self) -> Result<Option<SavedRecording>, RecorderError> {
        {
            let mut shared = self.shared.lock().await;
            if shared.state != RecorderState::Recording {
                drop(shared);
                self.release_failed_capture().await;
                return Ok(None);
            }
            shared.state = RecorderState::Stopping;
        }

        self.stop_timer();

        if let Some(capture) = self.capture.as_mut() {
            info!("Stopping capture via {}", capture.name());
            if let Err(e) = capture.stop().await {
                self.handle_error(&e).await;
                return Err(e);
            }
        }

        if let Some(collector) = self.collector.take() {
            if let Err(e) = collector.await {
                error!("Recording collector panicked: {}", e);
            }
        }

        let mut shared = self.shared.lock().await;
        // The collector always leaves the recorder idle; make sure of it
        shared.state = RecorderState::Idle;
        Ok(shared.last_saved.take())
    }

    /// Receive slices until the capture finalizes, then write the file
    async fn collect(
        mut rx: mpsc::Receiver<CaptureEvent>,
        shared: Arc<Mutex<Shared>>,
        downloads: Arc<dyn DownloadSink>,
        notifier: Notifier,
        mime: String,
    ) {
        while let Some(event) = rx.recv().await {
            match event {
                CaptureEvent::Data(chunk) => {
                    if !chunk.is_empty() {
                        shared.lock().await.chunks.push(chunk);
                    }
                }
                CaptureEvent::Stopped => break,
                CaptureEvent::Error(reason) => {
                    Self::fail(&shared, &notifier, &RecorderError::Capture(reason)).await;
                    return;
                }
            }
        }

        let chunks = std::mem::take(&mut shared.lock().await.chunks);

        match Self::flush(chunks, &mime, downloads.as_ref()).await {
            Ok(saved) => {
                notifier.success(format!("Recording saved as {}", saved.file_name));
                let mut shared = shared.lock().await;
                shared.state = RecorderState::Idle;
                shared.last_saved = Some(saved);
            }
            Err(e) => Self::fail(&shared, &notifier, &e).await,
        }
    }

    /// Concatenate slices into one blob and hand it to the download sink
    async fn flush(
        chunks: Vec<Vec<u8>>,
        mime: &str,
        downloads: &dyn DownloadSink,
    ) -> Result<SavedRecording, RecorderError> {
        let blob = chunks.concat();
        let file_name = recording_file_name(mime, Utc::now().timestamp_millis());

        let path = downloads
            .download(&file_name, &blob)
            .await
            .map_err(|e| RecorderError::Flush(e.to_string()))?;

        Ok(SavedRecording {
            file_name,
            path,
            mime_type: mime.to_string(),
            bytes: blob.len(),
        })
    }

    /// Single failure path: notify, drop buffered data, go idle
    async fn handle_error(&mut self, error: &RecorderError) {
        self.stop_timer();
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
        Self::fail(&self.shared, &self.notifier, error).await;
    }

    /// Stop a capture the collector gave up on after a capture error
    ///
    /// No-op unless the capture is still running.
    async fn release_failed_capture(&mut self) {
        let Some(capture) = self.capture.as_mut() else {
            debug!("Stop requested while not recording, ignored");
            return;
        };
        if !capture.is_capturing() {
            debug!("Stop requested while not recording, ignored");
            return;
        }

        info!("Stopping failed capture via {}", capture.name());
        if let Err(e) = capture.stop().await {
            warn!("Failed capture did not stop cleanly: {}", e);
        }
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
        self.stop_timer();
    }

    async fn fail(shared: &Mutex<Shared>, notifier: &Notifier, error: &RecorderError) {
        {
            let mut shared = shared.lock().await;
            shared.chunks.clear();
            shared.state = RecorderState::Idle;
        }
        notifier.error(format!("Operation failed: {}", error));
    }

    fn start_timer(&mut self) {
        self.stop_timer();
        self.elapsed_secs.store(0, Ordering::SeqCst);

        let elapsed = Arc::clone(&self.elapsed_secs);
        let shared = Arc::clone(&self.shared);

        self.timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if shared.lock().await.state != RecorderState::Recording {
                    break;
                }
                elapsed.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.stop_timer();
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
    }
}
