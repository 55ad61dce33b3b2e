//! Peer connections backed by webrtc-rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use super::error::RtcError;
use super::peer::{
    IceConnectionState, PeerConfig, PeerConnection, PeerConnector, PeerEvent, PeerEventSink,
    TransceiverDirection,
};
use crate::media::{MediaStream, MediaTrack, TrackKind};
use crate::relay::{CandidatePayload, SdpKind, SessionDescription};

fn platform<E: std::fmt::Display>(e: E) -> RtcError {
    RtcError::Platform(e.to_string())
}

/// Builds webrtc-rs peer connections with the default codecs and interceptors
#[derive(Default)]
pub struct WebRtcConnector;

impl WebRtcConnector {
    pub fn new() -> Self {
        Self
    }

    fn build_api() -> Result<API, RtcError> {
        let mut media = MediaEngine::default();
        media.register_default_codecs().map_err(platform)?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media).map_err(platform)?;

        Ok(APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build())
    }

    fn rtc_configuration(config: &PeerConfig) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl PeerConnector for WebRtcConnector {
    async fn connect(
        &self,
        config: &PeerConfig,
        events: PeerEventSink,
    ) -> Result<Box<dyn PeerConnection>, RtcError> {
        let generation = events.generation();
        let api = Self::build_api()?;
        let pc = Arc::new(
            api.new_peer_connection(Self::rtc_configuration(config))
                .await
                .map_err(platform)?,
        );

        let sink = events.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let sink = sink.clone();
            Box::pin(async move {
                let Some(candidate) = candidate else {
                    debug!("ICE gathering complete");
                    return;
                };
                match candidate.to_json() {
                    Ok(init) => {
                        sink.emit(PeerEvent::LocalCandidate(CandidatePayload {
                            label: init.sdp_mline_index,
                            id: init.sdp_mid,
                            candidate: init.candidate,
                        }));
                    }
                    Err(e) => warn!("Failed to serialize local candidate: {}", e),
                }
            })
        }));

        let sink = events.clone();
        pc.on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
            let sink = sink.clone();
            Box::pin(async move {
                if let Some(state) = map_ice_state(state) {
                    sink.emit(PeerEvent::IceStateChanged(state));
                }
            })
        }));

        // Remote tracks grouped by stream id, like the browser's event.streams
        let remote: Arc<Mutex<HashMap<String, MediaStream>>> = Arc::new(Mutex::new(HashMap::new()));
        let sink = events;
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let sink = sink.clone();
                let remote = Arc::clone(&remote);
                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => TrackKind::Audio,
                        _ => TrackKind::Video,
                    };
                    let stream_id = track.stream_id();
                    let media_track = MediaTrack::new(track.id(), kind, format!("remote {}", kind));
                    info!("Remote {} track {} on stream {}", kind, media_track.id, stream_id);

                    let stream = {
                        let mut streams = match remote.lock() {
                            Ok(guard) => guard,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        let stream = streams
                            .entry(stream_id.clone())
                            .or_insert_with(|| MediaStream::new(stream_id.clone(), Vec::new()));
                        stream.add_track(media_track.clone());
                        stream.clone()
                    };

                    sink.emit(PeerEvent::RemoteTrack {
                        streams: vec![stream],
                    });

                    // Drain RTP so the receive pipeline keeps moving
                    tokio::spawn(async move {
                        while track.read_rtp().await.is_ok() {}
                        media_track.stop();
                        debug!("Remote track {} ended", media_track.id);
                    });
                })
            },
        ));

        info!("webrtc-rs peer connection #{} created", generation);
        Ok(Box::new(WebRtcPeer { pc }))
    }

    fn name(&self) -> &str {
        "webrtc-rs"
    }
}

fn map_ice_state(state: RTCIceConnectionState) -> Option<IceConnectionState> {
    Some(match state {
        RTCIceConnectionState::New => IceConnectionState::New,
        RTCIceConnectionState::Checking => IceConnectionState::Checking,
        RTCIceConnectionState::Connected => IceConnectionState::Connected,
        RTCIceConnectionState::Completed => IceConnectionState::Completed,
        RTCIceConnectionState::Disconnected => IceConnectionState::Disconnected,
        RTCIceConnectionState::Failed => IceConnectionState::Failed,
        RTCIceConnectionState::Closed => IceConnectionState::Closed,
        _ => return None,
    })
}

fn to_rtc_description(description: SessionDescription) -> Result<RTCSessionDescription, RtcError> {
    let SessionDescription { kind, sdp } = description;
    let result = match kind {
        SdpKind::Offer => RTCSessionDescription::offer(sdp),
        SdpKind::Answer => RTCSessionDescription::answer(sdp),
        SdpKind::Pranswer => RTCSessionDescription::pranswer(sdp),
        SdpKind::Rollback => {
            return Err(RtcError::InvalidDescription(
                "rollback is not supported".to_string(),
            ))
        }
    };
    result.map_err(|e| RtcError::InvalidDescription(e.to_string()))
}

fn from_rtc_description(
    description: &RTCSessionDescription,
) -> Result<SessionDescription, RtcError> {
    let kind = match description.sdp_type {
        RTCSdpType::Offer => SdpKind::Offer,
        RTCSdpType::Answer => SdpKind::Answer,
        RTCSdpType::Pranswer => SdpKind::Pranswer,
        RTCSdpType::Rollback => SdpKind::Rollback,
        other => {
            return Err(RtcError::InvalidDescription(format!(
                "unexpected sdp type {:?}",
                other
            )))
        }
    };
    Ok(SessionDescription {
        kind,
        sdp: description.sdp.clone(),
    })
}

/// A live webrtc-rs connection
pub struct WebRtcPeer {
    pc: Arc<RTCPeerConnection>,
}

#[async_trait::async_trait]
impl PeerConnection for WebRtcPeer {
    async fn add_track(&self, track: &MediaTrack, stream: &MediaStream) -> Result<(), RtcError> {
        let mime_type = match track.kind {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        let local = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            track.id.clone(),
            stream.id.clone(),
        ));

        self.pc
            .add_track(local as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(platform)?;
        Ok(())
    }

    async fn add_transceiver(
        &self,
        kind: TrackKind,
        direction: TransceiverDirection,
    ) -> Result<(), RtcError> {
        let codec_type = match kind {
            TrackKind::Audio => RTPCodecType::Audio,
            TrackKind::Video => RTPCodecType::Video,
        };
        let direction = match direction {
            TransceiverDirection::SendRecv => RTCRtpTransceiverDirection::Sendrecv,
            TransceiverDirection::SendOnly => RTCRtpTransceiverDirection::Sendonly,
            TransceiverDirection::RecvOnly => RTCRtpTransceiverDirection::Recvonly,
            TransceiverDirection::Inactive => RTCRtpTransceiverDirection::Inactive,
        };

        self.pc
            .add_transceiver_from_kind(
                codec_type,
                Some(RTCRtpTransceiverInit {
                    direction,
                    send_encodings: vec![],
                }),
            )
            .await
            .map_err(platform)?;
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, RtcError> {
        let offer = self.pc.create_offer(None).await.map_err(platform)?;
        from_rtc_description(&offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription, RtcError> {
        let answer = self.pc.create_answer(None).await.map_err(platform)?;
        from_rtc_description(&answer)
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<(), RtcError> {
        let description = to_rtc_description(description)?;
        self.pc
            .set_local_description(description)
            .await
            .map_err(platform)
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let description = self.pc.local_description().await?;
        from_rtc_description(&description).ok()
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), RtcError> {
        let description = to_rtc_description(description)?;
        self.pc
            .set_remote_description(description)
            .await
            .map_err(platform)
    }

    async fn add_ice_candidate(&self, candidate: CandidatePayload) -> Result<(), RtcError> {
        self.pc
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.id,
                sdp_mline_index: candidate.label,
                username_fragment: None,
            })
            .await
            .map_err(platform)
    }

    async fn close(&self) -> Result<(), RtcError> {
        self.pc.close().await.map_err(platform)
    }
}
