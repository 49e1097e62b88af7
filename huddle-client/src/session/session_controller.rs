use crate::config::NegotiationConfig;
use crate::error::MediaError;
use crate::link::{LinkConfig, LinkEnvelope, PeerLinkFactory};
use crate::media::{LocalMediaSource, TrackSet};
use crate::negotiation::{Negotiator, NegotiatorContext, Role, TimerEvent};
use crate::session::{PeerSnapshot, SessionCommand, SessionHandle, SessionStatus};
use huddle_core::{ClientSignal, IceServerConfig, PeerId, RoomCode, ServerSignal};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// The local participant's side of a room.
///
/// A single loop owns every [`Negotiator`], so all handling for one remote
/// happens in arrival order and no negotiator state is shared.
pub struct SessionController {
    config: Arc<NegotiationConfig>,
    factory: Arc<dyn PeerLinkFactory>,
    media: Arc<dyn LocalMediaSource>,

    /// Client signals toward the relay.
    outbound: mpsc::UnboundedSender<ClientSignal>,
    /// Server signals from the relay.
    inbound: mpsc::UnboundedReceiver<ServerSignal>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,

    link_tx: mpsc::UnboundedSender<LinkEnvelope>,
    link_rx: mpsc::UnboundedReceiver<LinkEnvelope>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    generations: Arc<AtomicU64>,

    status: watch::Sender<SessionStatus>,

    local_id: Option<PeerId>,
    room: Option<RoomCode>,
    ice_servers: Vec<IceServerConfig>,
    tracks: TrackSet,
    local_media_error: Option<MediaError>,
    peers: BTreeMap<PeerId, Negotiator>,
}

impl SessionController {
    pub fn new(
        config: NegotiationConfig,
        factory: Arc<dyn PeerLinkFactory>,
        media: Arc<dyn LocalMediaSource>,
        outbound: mpsc::UnboundedSender<ClientSignal>,
        inbound: mpsc::UnboundedReceiver<ServerSignal>,
    ) -> (Self, SessionHandle) {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(SessionStatus::default());

        let controller = Self {
            config: Arc::new(config),
            factory,
            media,
            outbound,
            inbound,
            commands,
            link_tx,
            link_rx,
            timer_tx,
            timer_rx,
            generations: Arc::new(AtomicU64::new(0)),
            status,
            local_id: None,
            room: None,
            ice_servers: Vec::new(),
            tracks: TrackSet::default(),
            local_media_error: None,
            peers: BTreeMap::new(),
        };

        (controller, SessionHandle::new(command_tx, status_rx))
    }

    /// Runs the session until shutdown or until the relay connection ends.
    ///
    /// Local media is acquired first; failing that ends the session before
    /// anything is negotiated.
    pub async fn run(mut self) -> Result<(), MediaError> {
        match self.media.acquire().await {
            Ok(tracks) => {
                info!("Acquired {} local tracks", tracks.len());
                self.tracks = tracks;
            }
            Err(e) => {
                error!("Local media unavailable: {}", e);
                self.local_media_error = Some(e);
                self.publish(false);
                return Err(e);
            }
        }
        self.publish(true);

        info!("Session event loop started");

        loop {
            tokio::select! {
                signal = self.inbound.recv() => {
                    match signal {
                        Some(s) => self.handle_signal(s).await,
                        None => {
                            info!("Relay connection closed. Ending session.");
                            break;
                        }
                    }
                }

                Some(cmd) = self.commands.recv() => {
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }

                Some(envelope) = self.link_rx.recv() => {
                    self.handle_link_event(envelope).await;
                }

                Some(timer) = self.timer_rx.recv() => {
                    self.handle_timer(timer).await;
                }
            }

            self.publish(true);
        }

        self.close_all().await;
        self.publish(false);
        info!("Session event loop finished");
        Ok(())
    }

    async fn handle_signal(&mut self, signal: ServerSignal) {
        match signal {
            ServerSignal::Welcome { peer_id } => {
                info!("Relay assigned id {}", peer_id);
                self.local_id = Some(peer_id);
            }
            ServerSignal::IceConfig { ice_servers } => {
                debug!("Received {} ICE servers", ice_servers.len());
                self.ice_servers = ice_servers;
            }
            ServerSignal::MembershipSnapshot { room, members } => {
                info!("Room '{}' has {} other members", room, members.len());
                for remote in members {
                    self.add_peer(remote, Role::Initiator).await;
                }
            }
            ServerSignal::MemberJoined { peer_id } => {
                info!("{} joined the room", peer_id);
                self.add_peer(peer_id, Role::Initiator).await;
            }
            ServerSignal::MemberLeft { peer_id } => {
                info!("{} left the room", peer_id);
                if let Some(mut negotiator) = self.peers.remove(&peer_id) {
                    negotiator.close().await;
                }
            }
            ServerSignal::Offer { from, sdp } => {
                if !self.peers.contains_key(&from) {
                    info!("Unsolicited offer from {}", from);
                    self.add_peer(from, Role::Responder).await;
                }
                if let Some(negotiator) = self.peers.get_mut(&from) {
                    negotiator.handle_offer(sdp).await;
                }
            }
            ServerSignal::Answer { from, sdp } => match self.peers.get_mut(&from) {
                Some(negotiator) => negotiator.handle_answer(sdp).await,
                None => debug!("Dropping answer from unknown peer {}", from),
            },
            ServerSignal::IceCandidate { from, candidate } => match self.peers.get_mut(&from) {
                Some(negotiator) => negotiator.handle_candidate(candidate).await,
                None => debug!("Dropping candidate from unknown peer {}", from),
            },
        }
    }

    /// Returns `false` when the loop should stop.
    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::Join(room) => {
                if self.room.as_ref() != Some(&room) {
                    self.close_all().await;
                }
                info!("Joining room '{}'", room);
                self.room = Some(room.clone());
                self.send(ClientSignal::Join { room });
            }
            SessionCommand::Leave => {
                self.close_all().await;
                if let Some(room) = self.room.take() {
                    info!("Leaving room '{}'", room);
                }
                self.send(ClientSignal::Leave);
            }
            SessionCommand::Retry(remote) => match self.peers.get_mut(&remote) {
                Some(negotiator) => negotiator.retry().await,
                None => warn!("Retry requested for unknown peer {}", remote),
            },
            SessionCommand::Shutdown => {
                info!("Session shutdown requested");
                return false;
            }
        }
        true
    }

    async fn handle_link_event(&mut self, envelope: LinkEnvelope) {
        let Some(negotiator) = self.peers.get_mut(&envelope.remote) else {
            return;
        };
        if negotiator.generation() != envelope.generation {
            debug!(
                "Dropping event from stale link to {} (generation {})",
                envelope.remote, envelope.generation
            );
            return;
        }
        negotiator.handle_link_event(envelope.event).await;
    }

    async fn handle_timer(&mut self, timer: TimerEvent) {
        let Some(negotiator) = self.peers.get_mut(&timer.remote) else {
            return;
        };
        if negotiator.generation() != timer.generation {
            debug!("Dropping stale {:?} timer for {}", timer.kind, timer.remote);
            return;
        }
        negotiator.handle_timer(timer).await;
    }

    async fn add_peer(&mut self, remote: PeerId, role: Role) {
        let Some(local_id) = self.local_id else {
            warn!("Ignoring peer {} before the relay assigned our id", remote);
            return;
        };
        if remote == local_id || self.peers.contains_key(&remote) {
            return;
        }

        let mut negotiator = Negotiator::new(self.negotiator_context(local_id), remote, role);
        negotiator.start().await;
        self.peers.insert(remote, negotiator);
    }

    fn negotiator_context(&self, local_id: PeerId) -> Arc<NegotiatorContext> {
        Arc::new(NegotiatorContext {
            local_id,
            config: self.config.clone(),
            factory: self.factory.clone(),
            link_config: LinkConfig {
                ice_servers: self.ice_servers.clone(),
            },
            tracks: self.tracks.clone(),
            outbound: self.outbound.clone(),
            link_events: self.link_tx.clone(),
            timers: self.timer_tx.clone(),
            generations: self.generations.clone(),
        })
    }

    async fn close_all(&mut self) {
        for (_, mut negotiator) in std::mem::take(&mut self.peers) {
            negotiator.close().await;
        }
    }

    fn send(&self, signal: ClientSignal) {
        if self.outbound.send(signal).is_err() {
            warn!("Relay connection is gone, dropping outbound signal");
        }
    }

    fn publish(&self, running: bool) {
        let next = SessionStatus {
            local_id: self.local_id,
            room: self.room.clone(),
            local_media_error: self.local_media_error,
            peers: self
                .peers
                .iter()
                .map(|(remote, n)| {
                    (
                        *remote,
                        PeerSnapshot {
                            status: n.status(),
                            state: n.state(),
                            role: n.role(),
                            media_received: n.media_received(),
                            retry_count: n.retry_count(),
                            connection: n.connection(),
                        },
                    )
                })
                .collect(),
            running,
        };

        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}
