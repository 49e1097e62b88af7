use crate::negotiation::{TimerEvent, TimerKind};
use huddle_core::PeerId;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Slot {
    seq: u64,
    handle: JoinHandle<()>,
}

/// Pending timers of one negotiator. Each slot holds at most one task,
/// and replacing or dropping a slot aborts its task.
///
/// A firing can already sit in the channel when its slot is cancelled or
/// re-armed; [`Timers::fired`] rejects it by sequence number.
#[derive(Default)]
pub struct Timers {
    next_seq: u64,
    stall: Option<Slot>,
    send_offer: Option<Slot>,
    resync: Option<Slot>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(
        &mut self,
        tx: &mpsc::UnboundedSender<TimerEvent>,
        remote: PeerId,
        generation: u64,
        kind: TimerKind,
        after: Duration,
    ) {
        self.next_seq += 1;
        let seq = self.next_seq;
        let event = TimerEvent {
            remote,
            generation,
            kind,
            seq,
        };
        let tx = tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(event);
        });

        if let Some(previous) = self.slot(kind).replace(Slot { seq, handle }) {
            previous.handle.abort();
        }
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        if let Some(slot) = self.slot(kind).take() {
            slot.handle.abort();
        }
    }

    /// Claims a firing. Returns `false` when the arm that produced it has
    /// since been cancelled or replaced; the current arm stays untouched.
    pub fn fired(&mut self, kind: TimerKind, seq: u64) -> bool {
        let slot = self.slot(kind);
        if slot.as_ref().is_none_or(|s| s.seq != seq) {
            return false;
        }
        if let Some(claimed) = slot.take() {
            claimed.handle.abort();
        }
        true
    }

    /// Armed and not yet handled, even if the firing is already queued.
    pub fn is_pending(&mut self, kind: TimerKind) -> bool {
        self.slot(kind).is_some()
    }

    pub fn cancel_all(&mut self) {
        for slot in [
            self.stall.take(),
            self.send_offer.take(),
            self.resync.take(),
        ]
        .into_iter()
        .flatten()
        {
            slot.handle.abort();
        }
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Option<Slot> {
        match kind {
            TimerKind::Stall => &mut self.stall,
            TimerKind::SendOffer { .. } => &mut self.send_offer,
            TimerKind::Resync => &mut self.resync,
        }
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
