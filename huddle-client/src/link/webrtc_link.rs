use crate::error::LinkError;
use crate::link::{
    LinkConfig, LinkConnectionState, LinkEvent, LinkEventSender, PeerLink, PeerLinkFactory,
    SdpKind, SessionDescription,
};
use crate::media::{LocalTrack, TrackKind};
use async_trait::async_trait;
use huddle_core::IceCandidate;
use std::sync::Arc;
use tracing::{debug, info};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Builds [`WebRtcLink`]s from one shared `webrtc` API instance.
pub struct WebRtcLinkFactory {
    api: API,
}

impl WebRtcLinkFactory {
    pub fn new() -> Result<Self, LinkError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs().map_err(rejected)?;
        let registry =
            register_default_interceptors(Registry::new(), &mut media_engine).map_err(rejected)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self { api })
    }
}

#[async_trait]
impl PeerLinkFactory for WebRtcLinkFactory {
    async fn create(
        &self,
        config: &LinkConfig,
        events: LinkEventSender,
    ) -> Result<Box<dyn PeerLink>, LinkError> {
        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            self.api
                .new_peer_connection(rtc_config)
                .await
                .map_err(rejected)?,
        );

        let remote = events.remote();

        let state_events = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                info!("Peer connection state for {}: {:?}", remote, s);
                state_events.emit(LinkEvent::ConnectionStateChanged(connection_state(s)));
                Box::pin(async {})
            },
        ));

        let ice_events = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            if let Some(candidate) = c {
                match candidate.to_json() {
                    Ok(init) => {
                        ice_events.emit(LinkEvent::CandidateGenerated(IceCandidate {
                            candidate: init.candidate,
                            sdp_mid: init.sdp_mid,
                            sdp_m_line_index: init.sdp_mline_index,
                        }));
                    }
                    Err(e) => debug!("Dropping unserializable candidate for {}: {}", remote, e),
                }
            }
            Box::pin(async {})
        }));

        let track_events = events.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            match track.kind() {
                RTPCodecType::Audio => {
                    track_events.emit(LinkEvent::Track(TrackKind::Audio));
                }
                RTPCodecType::Video => {
                    track_events.emit(LinkEvent::Track(TrackKind::Video));
                }
                _ => {}
            }
            Box::pin(async {})
        }));

        let negotiation_events = events;
        peer_connection.on_negotiation_needed(Box::new(move || {
            negotiation_events.emit(LinkEvent::RenegotiationNeeded);
            Box::pin(async {})
        }));

        Ok(Box::new(WebRtcLink { peer_connection }))
    }
}

/// [`PeerLink`] over a native `RTCPeerConnection`.
pub struct WebRtcLink {
    peer_connection: Arc<RTCPeerConnection>,
}

#[async_trait]
impl PeerLink for WebRtcLink {
    async fn create_offer(&self) -> Result<SessionDescription, LinkError> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(invalid_state)?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, LinkError> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(invalid_state)?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), LinkError> {
        self.peer_connection
            .set_local_description(to_rtc(desc)?)
            .await
            .map_err(invalid_state)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), LinkError> {
        self.peer_connection
            .set_remote_description(to_rtc(desc)?)
            .await
            .map_err(invalid_state)
    }

    /// Only a pending local offer can be reverted. `webrtc` starts its
    /// transports from any remote description it is handed, including a
    /// rollback, so a pending remote offer is refused and the caller
    /// recreates the link instead.
    async fn rollback(&self) -> Result<(), LinkError> {
        // The rollback description must carry the SDP it reverts.
        let Some(pending) = self.peer_connection.pending_local_description().await else {
            return Err(LinkError::InvalidState(
                "no pending local description".into(),
            ));
        };
        self.peer_connection
            .set_local_description(rollback_of(pending))
            .await
            .map_err(invalid_state)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), LinkError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: None,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(rejected)
    }

    async fn add_track(&self, track: &LocalTrack) -> Result<(), LinkError> {
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
            track.stream_id.clone(),
        ));

        self.peer_connection
            .add_track(local as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map(|_| ())
            .map_err(rejected)
    }

    async fn has_sender(&self, kind: TrackKind) -> bool {
        let wanted = match kind {
            TrackKind::Audio => RTPCodecType::Audio,
            TrackKind::Video => RTPCodecType::Video,
        };
        for sender in self.peer_connection.get_senders().await {
            if let Some(track) = sender.track().await {
                if track.kind() == wanted {
                    return true;
                }
            }
        }
        false
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.peer_connection
            .local_description()
            .await
            .and_then(from_rtc)
    }

    async fn remote_description(&self) -> Option<SessionDescription> {
        self.peer_connection
            .remote_description()
            .await
            .and_then(from_rtc)
    }

    async fn close(&self) -> Result<(), LinkError> {
        self.peer_connection.close().await.map_err(rejected)
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, LinkError> {
    match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp),
    }
    .map_err(rejected)
}

fn rollback_of(pending: RTCSessionDescription) -> RTCSessionDescription {
    let mut desc = RTCSessionDescription::default();
    desc.sdp_type = RTCSdpType::Rollback;
    desc.sdp = pending.sdp;
    desc
}

fn from_rtc(desc: RTCSessionDescription) -> Option<SessionDescription> {
    match desc.sdp_type {
        RTCSdpType::Offer => Some(SessionDescription::offer(desc.sdp)),
        RTCSdpType::Answer | RTCSdpType::Pranswer => Some(SessionDescription::answer(desc.sdp)),
        _ => None,
    }
}

fn connection_state(state: RTCPeerConnectionState) -> LinkConnectionState {
    match state {
        RTCPeerConnectionState::Connecting => LinkConnectionState::Connecting,
        RTCPeerConnectionState::Connected => LinkConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => LinkConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => LinkConnectionState::Failed,
        RTCPeerConnectionState::Closed => LinkConnectionState::Closed,
        _ => LinkConnectionState::New,
    }
}

fn invalid_state(e: webrtc::Error) -> LinkError {
    LinkError::InvalidState(e.to_string())
}

fn rejected(e: webrtc::Error) -> LinkError {
    LinkError::Rejected(e.to_string())
}
