// Integration tests for recording the remote stream

mod support;

use anyhow::Result;
use peercall::download::DirectoryDownloads;
use peercall::notify::{NoticeLevel, Notifier};
use peercall::recorder::mime::{
    file_extension, recording_file_name, select_mime_type, FALLBACK_MIME,
};
use peercall::recorder::{Recorder, RecorderError, RecorderState, RecordingSettings};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use support::{remote_stream, FakeCapture, MemoryDownloads};
use tempfile::TempDir;

fn prefs() -> Vec<String> {
    RecordingSettings::default().mime_preferences
}

#[test]
fn test_mime_selection_prefers_first_supported() {
    let prefs = prefs();

    let all = select_mime_type(&prefs, |_| true, FALLBACK_MIME);
    assert_eq!(all, "video/webm;codecs=vp9");

    let no_vp9 = select_mime_type(&prefs, |m| !m.contains("vp9"), FALLBACK_MIME);
    assert_eq!(no_vp9, "video/webm;codecs=vp8");

    let mp4_only = select_mime_type(&prefs, |m| m.starts_with("video/mp4"), FALLBACK_MIME);
    assert_eq!(mp4_only, "video/mp4;codecs=h264");

    let none = select_mime_type(&prefs, |_| false, FALLBACK_MIME);
    assert_eq!(none, "video/webm");
}

#[test]
fn test_file_extension_from_mime() {
    assert_eq!(file_extension("video/webm;codecs=vp9"), "webm");
    assert_eq!(file_extension("video/mp4;codecs=h264"), "mp4");
    assert_eq!(file_extension("video/x-matroska"), "x-matroska");
    assert_eq!(file_extension("garbage"), "webm");
    assert_eq!(file_extension(""), "webm");
    assert_eq!(recording_file_name("video/mp4", 1700000000123), "recording_1700000000123.mp4");
}

#[tokio::test]
async fn test_start_without_remote_stream_fails_before_capture() -> Result<()> {
    let capture = FakeCapture::new(&["video/webm"], vec![]);
    let calls = Arc::clone(&capture.calls);
    let notifier = Notifier::new();
    let mut notices = notifier.subscribe();
    let mut recorder = Recorder::new(
        Some(Box::new(capture)),
        Arc::new(MemoryDownloads::default()),
        notifier,
        RecordingSettings::default(),
    );

    let result = recorder.start(None).await;

    assert_eq!(result, Err(RecorderError::NoRemoteStream));
    assert_eq!(calls.starts.load(Ordering::SeqCst), 0, "No capture is started");
    assert_eq!(recorder.state().await, RecorderState::Idle);
    assert_eq!(notices.try_recv()?.level, NoticeLevel::Error);
    Ok(())
}

#[tokio::test]
async fn test_start_picks_first_supported_mime() -> Result<()> {
    let capture = FakeCapture::new(&["video/webm;codecs=vp8", "video/mp4;codecs=h264"], vec![]);
    let calls = Arc::clone(&capture.calls);
    let mut recorder = Recorder::new(
        Some(Box::new(capture)),
        Arc::new(MemoryDownloads::default()),
        Notifier::new(),
        RecordingSettings::default(),
    );

    recorder.start(Some(&remote_stream("remote"))).await?;

    assert_eq!(
        calls.started_with.lock().unwrap().as_deref(),
        Some("video/webm;codecs=vp8")
    );
    assert!(recorder.is_recording().await);
    recorder.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_start_falls_back_when_nothing_supported() -> Result<()> {
    let capture = FakeCapture::new(&[], vec![]);
    let calls = Arc::clone(&capture.calls);
    let mut recorder = Recorder::new(
        Some(Box::new(capture)),
        Arc::new(MemoryDownloads::default()),
        Notifier::new(),
        RecordingSettings::default(),
    );

    recorder.start(Some(&remote_stream("remote"))).await?;

    assert_eq!(calls.started_with.lock().unwrap().as_deref(), Some("video/webm"));
    recorder.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_stop_while_idle_is_noop() -> Result<()> {
    let capture = FakeCapture::new(&["video/webm"], vec![]);
    let calls = Arc::clone(&capture.calls);
    let downloads = Arc::new(MemoryDownloads::default());
    let mut recorder = Recorder::new(
        Some(Box::new(capture)),
        downloads.clone(),
        Notifier::new(),
        RecordingSettings::default(),
    );

    let saved = recorder.stop().await?;

    assert!(saved.is_none());
    assert!(downloads.files().is_empty(), "No file is produced");
    assert_eq!(calls.stops.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.state().await, RecorderState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_stop_flushes_non_empty_chunks_to_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut capture = FakeCapture::new(
        &["video/mp4;codecs=h264"],
        vec![b"abc".to_vec(), Vec::new(), b"def".to_vec()],
    );
    capture.final_chunk = Some(b"gh".to_vec());
    let notifier = Notifier::new();
    let mut notices = notifier.subscribe();
    let mut recorder = Recorder::new(
        Some(Box::new(capture)),
        Arc::new(DirectoryDownloads::new(temp_dir.path())),
        notifier,
        RecordingSettings::default(),
    );

    recorder.start(Some(&remote_stream("remote"))).await?;
    let saved = recorder.stop().await?.expect("recording saved");

    assert!(saved.file_name.starts_with("recording_"));
    assert!(saved.file_name.ends_with(".mp4"));
    assert_eq!(saved.mime_type, "video/mp4;codecs=h264");
    assert_eq!(saved.bytes, 8);
    assert_eq!(std::fs::read(&saved.path)?, b"abcdefgh");
    assert_eq!(saved.path.parent(), Some(temp_dir.path()));

    assert_eq!(recorder.state().await, RecorderState::Idle);
    assert_eq!(recorder.buffered_chunks().await, 0);

    let notice = notices.try_recv()?;
    assert_eq!(notice.level, NoticeLevel::Success);
    assert!(notice.message.contains(&saved.file_name));
    Ok(())
}

#[tokio::test]
async fn test_start_twice_keeps_active_recording() -> Result<()> {
    let capture = FakeCapture::new(&["video/webm"], vec![b"x".to_vec()]);
    let calls = Arc::clone(&capture.calls);
    let downloads = Arc::new(MemoryDownloads::default());
    let mut recorder = Recorder::new(
        Some(Box::new(capture)),
        downloads.clone(),
        Notifier::new(),
        RecordingSettings::default(),
    );
    let remote = remote_stream("remote");

    recorder.start(Some(&remote)).await?;
    let second = recorder.start(Some(&remote)).await;

    assert_eq!(second, Err(RecorderError::AlreadyRecording));
    assert!(recorder.is_recording().await);
    assert_eq!(calls.starts.load(Ordering::SeqCst), 1);

    recorder.stop().await?;
    assert_eq!(downloads.files().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_capture_error_resets_recorder() -> Result<()> {
    let mut capture = FakeCapture::new(&["video/webm"], vec![b"partial".to_vec()]);
    capture.fail_with = Some("encoder crashed".to_string());
    let calls = Arc::clone(&capture.calls);
    let downloads = Arc::new(MemoryDownloads::default());
    let notifier = Notifier::new();
    let mut notices = notifier.subscribe();
    let mut recorder = Recorder::new(
        Some(Box::new(capture)),
        downloads.clone(),
        notifier,
        RecordingSettings::default(),
    );
    let remote = remote_stream("remote");

    recorder.start(Some(&remote)).await?;

    let notice = tokio::time::timeout(Duration::from_secs(5), notices.recv()).await??;
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.starts_with("Operation failed"));
    assert_eq!(recorder.state().await, RecorderState::Idle);
    assert_eq!(recorder.buffered_chunks().await, 0);

    // The failed capture is released, nothing is written
    assert!(recorder.stop().await?.is_none());
    assert_eq!(calls.stops.load(Ordering::SeqCst), 1);
    assert!(downloads.files().is_empty());

    // A new recording starts on a stopped capture
    recorder.start(Some(&remote)).await?;
    assert_eq!(calls.starts.load(Ordering::SeqCst), 2);
    assert_eq!(calls.stops.load(Ordering::SeqCst), 1);
    let saved = recorder.stop().await?.expect("second recording saved");
    assert_eq!(saved.bytes, b"partial".len());
    Ok(())
}

#[tokio::test]
async fn test_restart_after_capture_error_stops_stale_capture() -> Result<()> {
    let mut capture = FakeCapture::new(&["video/webm"], vec![]);
    capture.fail_with = Some("encoder crashed".to_string());
    let calls = Arc::clone(&capture.calls);
    let notifier = Notifier::new();
    let mut notices = notifier.subscribe();
    let mut recorder = Recorder::new(
        Some(Box::new(capture)),
        Arc::new(MemoryDownloads::default()),
        notifier,
        RecordingSettings::default(),
    );
    let remote = remote_stream("remote");

    recorder.start(Some(&remote)).await?;
    tokio::time::timeout(Duration::from_secs(5), notices.recv()).await??;

    // No stop in between: start releases the capture itself
    recorder.start(Some(&remote)).await?;

    assert_eq!(calls.stops.load(Ordering::SeqCst), 1);
    assert_eq!(calls.starts.load(Ordering::SeqCst), 2);
    assert!(recorder.is_recording().await);
    recorder.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_recorder_mime_choice_follows_preferences() -> Result<()> {
    let cases: [(&[&str], &str); 5] = [
        (
            &["video/webm;codecs=vp9", "video/webm;codecs=vp8", "video/mp4;codecs=h264"],
            "video/webm;codecs=vp9",
        ),
        (&["video/mp4;codecs=h264", "video/webm;codecs=vp8"], "video/webm;codecs=vp8"),
        (&["video/webm;codecs=h264"], "video/webm;codecs=h264"),
        (&["video/mp4;codecs=h264"], "video/mp4;codecs=h264"),
        (&["video/ogg"], "video/webm"),
    ];

    for (supported, expected) in cases {
        let capture = FakeCapture::new(supported, vec![]);
        let calls = Arc::clone(&capture.calls);
        let mut recorder = Recorder::new(
            Some(Box::new(capture)),
            Arc::new(MemoryDownloads::default()),
            Notifier::new(),
            RecordingSettings::default(),
        );

        recorder.start(Some(&remote_stream("remote"))).await?;
        assert_eq!(
            calls.started_with.lock().unwrap().as_deref(),
            Some(expected),
            "supported: {:?}",
            supported
        );
        recorder.stop().await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_recording_unavailable_without_backend() -> Result<()> {
    let mut recorder = Recorder::new(
        None,
        Arc::new(MemoryDownloads::default()),
        Notifier::new(),
        RecordingSettings::default(),
    );

    assert!(!recorder.is_available());
    let result = recorder.start(Some(&remote_stream("remote"))).await;
    assert_eq!(result, Err(RecorderError::Unavailable));
    assert_eq!(recorder.state().await, RecorderState::Idle);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_elapsed_counter_ticks_while_recording() -> Result<()> {
    let capture = FakeCapture::new(&["video/webm"], vec![]);
    let mut recorder = Recorder::new(
        Some(Box::new(capture)),
        Arc::new(MemoryDownloads::default()),
        Notifier::new(),
        RecordingSettings::default(),
    );

    recorder.start(Some(&remote_stream("remote"))).await?;
    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(recorder.elapsed_secs(), 3);

    recorder.stop().await?;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(recorder.elapsed_secs(), 3, "Counter stops with the recording");
    Ok(())
}
