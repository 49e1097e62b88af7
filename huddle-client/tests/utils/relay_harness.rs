use async_trait::async_trait;
use huddle_client::{
    MediaError, NegotiationConfig, PeerLinkFactory, SessionController, SessionHandle,
};
use huddle_core::{IceServerConfig, PeerId, ServerSignal};
use huddle_server::{Relay, RelayError, RoomRegistry, SignalingOutput};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::utils::{MockLinkFactory, MockLinkOptions, MockMediaSource};

/// SignalingOutput that hands server signals straight to in-process sessions.
#[derive(Clone, Default)]
pub struct ChannelSignalingOutput {
    peers: Arc<Mutex<HashMap<PeerId, mpsc::UnboundedSender<ServerSignal>>>>,
}

impl ChannelSignalingOutput {
    pub async fn register(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<ServerSignal>) {
        self.peers.lock().await.insert(peer_id, tx);
    }

    pub async fn unregister(&self, peer_id: &PeerId) {
        self.peers.lock().await.remove(peer_id);
    }
}

#[async_trait]
impl SignalingOutput for ChannelSignalingOutput {
    async fn send_signal(&self, peer_id: PeerId, signal: ServerSignal) -> Result<(), RelayError> {
        let peers = self.peers.lock().await;
        let tx = peers
            .get(&peer_id)
            .ok_or(RelayError::UnknownTarget(peer_id))?;
        tx.send(signal)
            .map_err(|_| RelayError::UnknownTarget(peer_id))
    }
}

/// A real [`Relay`] wired to sessions over channels instead of sockets.
pub struct TestRelay {
    pub relay: Relay,
    output: ChannelSignalingOutput,
}

impl TestRelay {
    pub fn new() -> Self {
        let output = ChannelSignalingOutput::default();
        let relay = Relay::new(
            Arc::new(RoomRegistry::new()),
            Arc::new(output.clone()),
            vec![IceServerConfig::stun("stun:stun.example.org:3478")],
        );
        Self { relay, output }
    }

    pub async fn attach(&self, config: NegotiationConfig, options: MockLinkOptions) -> TestClient {
        self.attach_as(PeerId::new(), config, options).await
    }

    /// Connects a session whose relay-assigned id is `peer_id`.
    pub async fn attach_as(
        &self,
        peer_id: PeerId,
        config: NegotiationConfig,
        options: MockLinkOptions,
    ) -> TestClient {
        let factory = MockLinkFactory::new(options);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

        self.output.register(peer_id, inbound_tx).await;
        self.relay.connect(peer_id).await;

        let (controller, handle) = SessionController::new(
            config,
            Arc::new(factory.clone()) as Arc<dyn PeerLinkFactory>,
            Arc::new(MockMediaSource::working()),
            outbound_tx,
            inbound_rx,
        );
        let session = tokio::spawn(controller.run());

        let relay = self.relay.clone();
        let pump = tokio::spawn(async move {
            while let Some(signal) = outbound_rx.recv().await {
                relay.handle(peer_id, signal).await;
            }
            relay.disconnect(peer_id).await;
        });

        TestClient {
            id: peer_id,
            handle,
            factory,
            session,
            pump,
        }
    }

    /// Drops the client's transport the way a closed socket would.
    pub async fn disconnect(&self, client: TestClient) {
        client.session.abort();
        client.pump.abort();
        self.output.unregister(&client.id).await;
        self.relay.disconnect(client.id).await;
    }
}

pub struct TestClient {
    pub id: PeerId,
    pub handle: SessionHandle,
    pub factory: MockLinkFactory,
    pub session: JoinHandle<Result<(), MediaError>>,
    pump: JoinHandle<()>,
}
