//! Local recording of the remote stream
//!
//! This module provides the `Recorder` that:
//! - Picks the first supported container/codec from a fixed preference list
//! - Buffers non-empty capture slices (one per second by default)
//! - Writes the concatenated slices to `recording_<epoch-ms>.<ext>` on stop
//! - Tracks elapsed seconds while recording

mod capture;
mod error;
pub mod mime;
mod recorder;

pub use capture::{CaptureEvent, MediaCapture};
pub use error::RecorderError;
pub use recorder::{Recorder, RecorderState, RecordingSettings, SavedRecording};
