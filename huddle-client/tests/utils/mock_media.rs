use async_trait::async_trait;
use huddle_client::{LocalMediaSource, LocalTrack, MediaError, TrackKind, TrackSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Media source with a scripted outcome that counts acquisitions.
#[derive(Clone)]
pub struct MockMediaSource {
    outcome: Result<TrackSet, MediaError>,
    acquired: Arc<AtomicUsize>,
}

impl MockMediaSource {
    pub fn working() -> Self {
        Self {
            outcome: Ok(TrackSet::new(vec![
                LocalTrack::new("mic", "local", TrackKind::Audio),
                LocalTrack::new("cam", "local", TrackKind::Video),
            ])),
            acquired: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(error: MediaError) -> Self {
        Self {
            outcome: Err(error),
            acquired: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn tracks(&self) -> TrackSet {
        self.outcome.clone().unwrap_or_default()
    }

    pub fn acquisitions(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalMediaSource for MockMediaSource {
    async fn acquire(&self) -> Result<TrackSet, MediaError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
