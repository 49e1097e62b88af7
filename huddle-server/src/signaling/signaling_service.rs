use crate::config::ServerConfig;
use crate::relay::Relay;
use crate::room::RoomRegistry;
use crate::signaling::ConnectionTable;
use std::sync::Arc;

/// Shared state behind the HTTP routes: the live connections and the relay
/// that writes to them.
#[derive(Clone)]
pub struct SignalingService {
    connections: Arc<ConnectionTable>,
    relay: Relay,
}

impl SignalingService {
    pub fn new(config: &ServerConfig) -> Self {
        let connections = Arc::new(ConnectionTable::new());
        let registry = Arc::new(RoomRegistry::new());
        let relay = Relay::new(registry, connections.clone(), config.ice_servers.clone());

        Self { connections, relay }
    }

    pub fn connections(&self) -> &ConnectionTable {
        &self.connections
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    pub fn registry(&self) -> &RoomRegistry {
        self.relay.registry()
    }
}
