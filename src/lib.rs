pub mod capture;
pub mod config;
pub mod download;
pub mod http;
pub mod media;
pub mod notify;
pub mod recorder;
pub mod relay;
pub mod rtc;
pub mod session;

pub use capture::{Screenshot, SurfaceRegistry, VideoFrame, VideoSurface};
pub use config::Config;
pub use download::{DirectoryDownloads, DownloadSink};
pub use http::{create_router, AppState};
pub use media::{
    HeadlessDevices, LocalMediaController, MediaDevices, MediaStream, MediaTrack, TrackKind,
};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use recorder::{MediaCapture, Recorder, RecorderState};
pub use relay::{RelayClient, RelayEvent, SignalingChannel};
pub use rtc::{NegotiationOrchestrator, PeerConnector, WebRtcConnector};
pub use session::{run_event_loop, ChatSession, SessionError, SessionParts, SessionSnapshot};
