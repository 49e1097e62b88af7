use crate::error::MediaError;
use async_trait::async_trait;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// Descriptor of one captured local track. The samples themselves never
/// pass through the negotiation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: TrackKind,
}

impl LocalTrack {
    pub fn new(id: impl Into<String>, stream_id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            stream_id: stream_id.into(),
            kind,
        }
    }
}

/// The session's local tracks, shared by every peer link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSet(Vec<LocalTrack>);

impl TrackSet {
    pub fn new(tracks: Vec<LocalTrack>) -> Self {
        Self(tracks)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalTrack> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Camera/microphone capability. Acquisition happens once per session.
#[async_trait]
pub trait LocalMediaSource: Send + Sync {
    async fn acquire(&self) -> Result<TrackSet, MediaError>;
}

/// Media source that hands out a fixed track set, for headless clients.
#[derive(Debug, Clone)]
pub struct StaticMediaSource {
    tracks: TrackSet,
}

impl StaticMediaSource {
    pub fn new(tracks: TrackSet) -> Self {
        Self { tracks }
    }

    pub fn audio_video(stream_id: &str) -> Self {
        Self::new(TrackSet::new(vec![
            LocalTrack::new(format!("{}-audio", stream_id), stream_id, TrackKind::Audio),
            LocalTrack::new(format!("{}-video", stream_id), stream_id, TrackKind::Video),
        ]))
    }
}

#[async_trait]
impl LocalMediaSource for StaticMediaSource {
    async fn acquire(&self) -> Result<TrackSet, MediaError> {
        if self.tracks.is_empty() {
            return Err(MediaError::DeviceUnavailable);
        }
        Ok(self.tracks.clone())
    }
}
