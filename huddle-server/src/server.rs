use crate::config::ServerConfig;
use crate::signaling::{SignalingService, router};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// A bound relay, ready to serve.
pub struct SignalingServer {
    listener: TcpListener,
    service: SignalingService,
}

impl SignalingServer {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
        let service = SignalingService::new(&config);

        Ok(Self { listener, service })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn service(&self) -> &SignalingService {
        &self.service
    }

    pub async fn run(self) -> Result<()> {
        info!("Signaling relay listening on {}", self.local_addr()?);
        axum::serve(self.listener, router(self.service))
            .await
            .context("Signaling server stopped")
    }
}
