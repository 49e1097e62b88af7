use crate::config::NegotiationConfig;
use crate::error::{MediaError, TransportError};
use crate::link::PeerLinkFactory;
use crate::media::LocalMediaSource;
use crate::session::{SessionController, SessionHandle};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use huddle_core::{ClientSignal, ServerSignal};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live signaling socket, exposed as a pair of typed channels.
///
/// Dropping `outbound` closes the socket; `inbound` ends when the relay
/// goes away.
pub struct RelayConnection {
    pub outbound: mpsc::UnboundedSender<ClientSignal>,
    pub inbound: mpsc::UnboundedReceiver<ServerSignal>,
}

impl RelayConnection {
    /// `url` is the relay's socket endpoint, e.g. `ws://127.0.0.1:8080/ws`.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        info!("Connecting to relay at {}", url);
        let (ws_stream, _) = connect_async(url).await?;
        info!("Connected to relay");

        let (write, read) = ws_stream.split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();

        tokio::spawn(sender_task(write, outbound_rx));
        tokio::spawn(receiver_task(read, inbound_tx));

        Ok(Self { outbound, inbound })
    }
}

async fn sender_task(
    mut write: SplitSink<WsStream, Message>,
    mut rx: mpsc::UnboundedReceiver<ClientSignal>,
) {
    while let Some(signal) = rx.recv().await {
        let json = match serde_json::to_string(&signal) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize client signal: {}", e);
                continue;
            }
        };
        debug!("Sending signal: {}", json);
        if let Err(e) = write.send(Message::Text(json)).await {
            error!("Failed to send to relay: {}", e);
            break;
        }
    }

    let _ = write.close().await;
    debug!("Relay sender task terminated");
}

async fn receiver_task(
    mut read: SplitStream<WsStream>,
    tx: mpsc::UnboundedSender<ServerSignal>,
) {
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerSignal>(&text) {
                Ok(signal) => {
                    if tx.send(signal).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Unparseable relay frame: {} ({})", text, e),
            },
            Ok(Message::Close(_)) => {
                info!("Relay closed the connection");
                break;
            }
            Err(e) => {
                error!("Relay socket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    debug!("Relay receiver task terminated");
}

/// Connects to the relay and spawns a session over the socket.
pub async fn start_session(
    url: &str,
    config: NegotiationConfig,
    factory: Arc<dyn PeerLinkFactory>,
    media: Arc<dyn LocalMediaSource>,
) -> Result<(SessionHandle, JoinHandle<Result<(), MediaError>>), TransportError> {
    let connection = RelayConnection::connect(url).await?;
    let (controller, handle) = SessionController::new(
        config,
        factory,
        media,
        connection.outbound,
        connection.inbound,
    );
    Ok((handle, tokio::spawn(controller.run())))
}
