use crate::config::NegotiationConfig;
use crate::link::{LinkConfig, LinkEnvelope, PeerLinkFactory};
use crate::media::TrackSet;
use huddle_core::{ClientSignal, PeerId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Send the committed local offer. `attempt` counts from zero.
    SendOffer { attempt: u8 },
    /// Offer again after a stale answer.
    Resync,
    Stall,
}

/// A timer firing, tagged like link events so stale ones can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub remote: PeerId,
    pub generation: u64,
    pub kind: TimerKind,
    /// Identifies the arm that produced this firing within its slot.
    pub seq: u64,
}

/// Everything a negotiator needs from its session.
pub struct NegotiatorContext {
    pub local_id: PeerId,
    pub config: Arc<NegotiationConfig>,
    pub factory: Arc<dyn PeerLinkFactory>,
    pub link_config: LinkConfig,
    pub tracks: TrackSet,

    /// Toward the relay.
    pub outbound: mpsc::UnboundedSender<ClientSignal>,
    pub link_events: mpsc::UnboundedSender<LinkEnvelope>,
    pub timers: mpsc::UnboundedSender<TimerEvent>,

    /// Shared by every negotiator of the session, so a generation is never
    /// reused for the same remote even across discarded negotiators.
    pub generations: Arc<AtomicU64>,
}

impl NegotiatorContext {
    pub fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn send(&self, signal: ClientSignal) -> bool {
        self.outbound.send(signal).is_ok()
    }
}
