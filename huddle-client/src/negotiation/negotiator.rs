use crate::error::NegotiationError;
use crate::link::{
    LinkConnectionState, LinkEvent, LinkEventSender, PeerLink, SdpKind, SessionDescription,
};
use crate::negotiation::{
    CandidateBuffer, FailureClass, NegotiationState, NegotiatorContext, PeerStatus, RecoveryStep,
    Role, TimerEvent, TimerKind, Timers, recovery_ladder, yields_on_glare,
};
use huddle_core::{ClientSignal, IceCandidate, PeerId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Drives offer/answer/candidate exchange for one remote participant.
///
/// Owned by the session loop, which hands it relay messages, link events
/// and timer firings one at a time. Events from a replaced link carry an
/// older generation and must be filtered out before they get here.
pub struct Negotiator {
    ctx: Arc<NegotiatorContext>,
    remote: PeerId,
    role: Role,
    state: NegotiationState,

    /// `None` before the first link opens, after close, or when creation failed.
    link: Option<Box<dyn PeerLink>>,
    generation: u64,
    candidates: CandidateBuffer,

    media_received: bool,
    stalled: bool,
    failed: bool,
    connection: LinkConnectionState,

    /// Link recreations since the last manual retry.
    retry_count: u32,
    timers: Timers,
}

impl Negotiator {
    pub fn new(ctx: Arc<NegotiatorContext>, remote: PeerId, role: Role) -> Self {
        let generation = ctx.next_generation();
        Self {
            ctx,
            remote,
            role,
            state: NegotiationState::Idle,
            link: None,
            generation,
            candidates: CandidateBuffer::new(),
            media_received: false,
            stalled: false,
            failed: false,
            connection: LinkConnectionState::New,
            retry_count: 0,
            timers: Timers::new(),
        }
    }

    /// Opens the first link, arms stall supervision and, as initiator,
    /// starts the offer path.
    pub async fn start(&mut self) {
        info!("Negotiating with {} as {:?}", self.remote, self.role);
        self.arm(TimerKind::Stall, self.ctx.config.stall_timeout);

        if let Err(e) = self.open_link().await {
            error!("Failed to create peer link for {}: {}", self.remote, e);
            return;
        }
        if self.role == Role::Initiator {
            self.offer_or_log().await;
        }
    }

    pub async fn handle_offer(&mut self, sdp: String) {
        match self.state {
            NegotiationState::Idle | NegotiationState::Stable => {
                if let Err(e) = self.accept_offer(sdp.clone()).await {
                    warn!("Failed to accept offer from {}: {}", self.remote, e);
                    self.recover(FailureClass::AcceptFailed, Some(sdp)).await;
                }
            }
            NegotiationState::HaveLocalOffer => {
                if yields_on_glare(self.ctx.local_id, self.remote) {
                    info!("Offer glare with {}, rolling back", self.remote);
                    self.recover(FailureClass::OfferConflict, Some(sdp)).await;
                } else {
                    info!("Offer glare with {}, keeping our offer", self.remote);
                }
            }
            NegotiationState::HaveRemoteOffer | NegotiationState::Closed => {
                warn!("Offer from {} in state {}", self.remote, self.state);
                self.recover(FailureClass::OfferConflict, Some(sdp)).await;
            }
        }
    }

    pub async fn handle_answer(&mut self, sdp: String) {
        match self.state {
            NegotiationState::HaveLocalOffer => {
                if let Err(e) = self.apply_answer(sdp).await {
                    warn!("Answer from {} rejected: {}", self.remote, e);
                    self.recover(FailureClass::AnswerConflict, None).await;
                }
            }
            NegotiationState::Stable => {
                debug!("Stale answer from {}, scheduling resync", self.remote);
                if !self.timers.is_pending(TimerKind::Resync) {
                    self.arm(TimerKind::Resync, self.ctx.config.resync_cooldown);
                }
            }
            NegotiationState::HaveRemoteOffer => {
                warn!("Answer from {} while holding its offer", self.remote);
                self.recover(FailureClass::AnswerConflict, None).await;
            }
            NegotiationState::Idle | NegotiationState::Closed => {
                debug!("Ignoring answer from {} in state {}", self.remote, self.state);
            }
        }
    }

    pub async fn handle_candidate(&mut self, candidate: IceCandidate) {
        let Some(link) = self.link.as_deref() else {
            debug!("Dropping candidate from {}: no link", self.remote);
            return;
        };

        if link.remote_description().await.is_none() {
            self.candidates.push(candidate);
            debug!(
                "Buffered candidate from {} ({} pending)",
                self.remote,
                self.candidates.len()
            );
            return;
        }

        if let Err(e) = link.add_ice_candidate(candidate).await {
            warn!("Failed to add candidate from {}: {}", self.remote, e);
        }
    }

    pub async fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::CandidateGenerated(candidate) => {
                self.ctx.send(ClientSignal::IceCandidate {
                    to: self.remote,
                    candidate,
                });
            }
            LinkEvent::Track(kind) => {
                if !self.media_received {
                    info!("First {} track from {}", kind, self.remote);
                    self.media_received = true;
                    self.stalled = false;
                    self.timers.cancel(TimerKind::Stall);
                }
            }
            LinkEvent::ConnectionStateChanged(state) => {
                debug!("Link to {} is {:?}", self.remote, state);
                self.connection = state;
            }
            LinkEvent::RenegotiationNeeded => {
                if self.role == Role::Initiator && self.state == NegotiationState::Stable {
                    info!("Renegotiating with {}", self.remote);
                    self.offer_or_log().await;
                }
            }
        }
    }

    pub async fn handle_timer(&mut self, timer: TimerEvent) {
        if !self.timers.fired(timer.kind, timer.seq) {
            debug!(
                "Dropping superseded {:?} timer for {}",
                timer.kind, self.remote
            );
            return;
        }

        match timer.kind {
            TimerKind::SendOffer { attempt } => self.send_offer(attempt).await,
            TimerKind::Resync => {
                if self.state == NegotiationState::Stable {
                    info!("Resyncing with {}", self.remote);
                    self.offer_or_log().await;
                }
            }
            TimerKind::Stall => self.on_stall().await,
        }
    }

    /// User-requested retry. Resets the retry budget.
    pub async fn retry(&mut self) {
        info!("Manual retry for {}", self.remote);
        self.restart().await;
        self.retry_count = 0;
    }

    pub async fn close(&mut self) {
        self.teardown().await;
        self.state = NegotiationState::Closed;
        info!("Closed negotiation with {}", self.remote);
    }

    pub fn remote(&self) -> PeerId {
        self.remote
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn media_received(&self) -> bool {
        self.media_received
    }

    pub fn connection(&self) -> LinkConnectionState {
        self.connection
    }

    pub fn buffered_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn status(&self) -> PeerStatus {
        if self.failed {
            PeerStatus::Failed
        } else if self.state == NegotiationState::Closed {
            PeerStatus::Closed
        } else if self.media_received {
            PeerStatus::Connected
        } else if self.stalled {
            PeerStatus::Stalled
        } else {
            PeerStatus::Negotiating
        }
    }

    fn link(&self) -> Result<&dyn PeerLink, NegotiationError> {
        self.link
            .as_deref()
            .ok_or(NegotiationError::Closed(self.remote))
    }

    async fn open_link(&mut self) -> Result<(), NegotiationError> {
        let events = LinkEventSender::new(
            self.remote,
            self.generation,
            self.ctx.link_events.clone(),
        );
        let link = self
            .ctx
            .factory
            .create(&self.ctx.link_config, events)
            .await
            .map_err(NegotiationError::LinkCreation)?;

        for track in self.ctx.tracks.iter() {
            if link.has_sender(track.kind).await {
                continue;
            }
            if let Err(e) = link.add_track(track).await {
                warn!("Failed to attach {} track for {}: {}", track.kind, self.remote, e);
            }
        }

        self.link = Some(link);
        Ok(())
    }

    async fn offer_or_log(&mut self) {
        if let Err(e) = self.begin_offer().await {
            warn!("Failed to start offer to {}: {}", self.remote, e);
        }
    }

    /// Creates and commits a local offer; sending waits for the offer timer.
    async fn begin_offer(&mut self) -> Result<(), NegotiationError> {
        if !self.state.can_offer() {
            debug!("Not offering to {} from state {}", self.remote, self.state);
            return Ok(());
        }

        let link = self.link()?;
        let offer = link.create_offer().await?;
        link.set_local_description(offer).await?;

        self.state = NegotiationState::HaveLocalOffer;
        self.timers.cancel(TimerKind::Resync);
        self.arm(
            TimerKind::SendOffer { attempt: 0 },
            self.ctx.config.offer_send_delay,
        );
        debug!("Local offer for {} committed", self.remote);
        Ok(())
    }

    async fn send_offer(&mut self, attempt: u8) {
        if self.state != NegotiationState::HaveLocalOffer {
            debug!("Discarding offer timer for {} in state {}", self.remote, self.state);
            return;
        }

        let local = match self.link.as_deref() {
            Some(link) => link.local_description().await,
            None => None,
        };

        match local {
            Some(desc) if desc.kind == SdpKind::Offer => {
                info!("Sending offer to {}", self.remote);
                self.ctx.send(ClientSignal::Offer {
                    to: self.remote,
                    sdp: desc.sdp,
                });
            }
            _ if attempt == 0 => {
                debug!("Offer for {} not ready, retrying once", self.remote);
                self.arm(
                    TimerKind::SendOffer { attempt: 1 },
                    self.ctx.config.offer_retry_delay,
                );
            }
            _ => warn!("Giving up sending offer to {}: no local offer", self.remote),
        }
    }

    async fn accept_offer(&mut self, sdp: String) -> Result<(), NegotiationError> {
        self.link()?
            .set_remote_description(SessionDescription::offer(sdp))
            .await?;
        self.state = NegotiationState::HaveRemoteOffer;
        self.flush_candidates().await;

        let link = self.link()?;
        let answer = link.create_answer().await?;
        let sdp = answer.sdp.clone();
        link.set_local_description(answer).await?;

        self.state = NegotiationState::Stable;
        self.timers.cancel(TimerKind::SendOffer { attempt: 0 });
        info!("Answering {}", self.remote);
        self.ctx.send(ClientSignal::Answer {
            to: self.remote,
            sdp,
        });
        Ok(())
    }

    async fn apply_answer(&mut self, sdp: String) -> Result<(), NegotiationError> {
        self.link()?
            .set_remote_description(SessionDescription::answer(sdp))
            .await?;
        self.state = NegotiationState::Stable;
        self.timers.cancel(TimerKind::SendOffer { attempt: 0 });
        self.flush_candidates().await;
        info!("Negotiation with {} is stable", self.remote);
        Ok(())
    }

    async fn flush_candidates(&mut self) {
        let pending = self.candidates.drain();
        let Some(link) = self.link.as_deref() else {
            return;
        };
        if !pending.is_empty() {
            debug!("Applying {} buffered candidates from {}", pending.len(), self.remote);
        }
        for candidate in pending {
            if let Err(e) = link.add_ice_candidate(candidate).await {
                warn!("Failed to add buffered candidate from {}: {}", self.remote, e);
            }
        }
    }

    /// Walks the ladder for `class`. After each successful step negotiation
    /// resumes: an offer in hand is accepted, otherwise a new offer starts.
    async fn recover(&mut self, class: FailureClass, offer: Option<String>) {
        for step in recovery_ladder(class) {
            let applied = match step {
                RecoveryStep::Rollback => self.rollback().await,
                RecoveryStep::Recreate(role) => self.recreate(*role).await,
            };
            if let Err(e) = applied {
                debug!("Recovery step {:?} for {} failed: {}", step, self.remote, e);
                continue;
            }

            let resumed = match &offer {
                Some(sdp) => self.accept_offer(sdp.clone()).await,
                None => self.begin_offer().await,
            };
            match resumed {
                Ok(()) => {
                    info!("Recovered negotiation with {} via {:?}", self.remote, step);
                    return;
                }
                Err(e) => warn!("Resuming after {:?} for {} failed: {}", step, self.remote, e),
            }
        }

        error!("Could not recover negotiation with {} ({:?})", self.remote, class);
        self.fail().await;
    }

    async fn rollback(&mut self) -> Result<(), NegotiationError> {
        self.link()?.rollback().await?;
        self.state = NegotiationState::Idle;
        self.timers.cancel(TimerKind::SendOffer { attempt: 0 });
        debug!("Rolled back negotiation with {}", self.remote);
        Ok(())
    }

    /// Replaces the link. Every recreation counts as a retry.
    async fn recreate(&mut self, role: Role) -> Result<(), NegotiationError> {
        self.teardown().await;
        self.generation = self.ctx.next_generation();
        self.retry_count += 1;
        self.role = role;
        self.state = NegotiationState::Idle;
        self.failed = false;
        self.connection = LinkConnectionState::New;

        info!(
            "Recreating link to {} as {:?} (generation {}, retry {})",
            self.remote, role, self.generation, self.retry_count
        );
        if !self.media_received {
            self.arm(TimerKind::Stall, self.ctx.config.stall_timeout);
        }
        self.open_link().await
    }

    async fn restart(&mut self) {
        if let Err(e) = self.recreate(Role::Initiator).await {
            error!("Failed to recreate link to {}: {}", self.remote, e);
            return;
        }
        self.offer_or_log().await;
    }

    /// Without auto retry the pair stays up and reported stalled until a
    /// manual [`retry`](Self::retry) or late media.
    async fn on_stall(&mut self) {
        if self.media_received || self.state == NegotiationState::Closed {
            return;
        }

        self.stalled = true;
        let config = &self.ctx.config;
        if !config.auto_retry {
            warn!("No media from {} yet, waiting for a manual retry", self.remote);
        } else if self.retry_count < config.max_retries {
            warn!(
                "No media from {} yet, retrying ({}/{})",
                self.remote,
                self.retry_count + 1,
                config.max_retries
            );
            self.restart().await;
        } else {
            error!(
                "No media from {} after {} retries, giving up",
                self.remote, self.retry_count
            );
            self.fail().await;
        }
    }

    async fn fail(&mut self) {
        self.teardown().await;
        self.state = NegotiationState::Closed;
        self.failed = true;
    }

    async fn teardown(&mut self) {
        self.timers.cancel_all();
        self.candidates.clear();
        if let Some(link) = self.link.take() {
            if let Err(e) = link.close().await {
                debug!("Closing link to {} failed: {}", self.remote, e);
            }
        }
    }

    fn arm(&mut self, kind: TimerKind, after: Duration) {
        self.timers
            .arm(&self.ctx.timers, self.remote, self.generation, kind, after);
    }
}
