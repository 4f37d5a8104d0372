//! WebSocket transport to the assistant backend.
//!
//! ## Design
//! - `connect` performs the handshake and spawns one pump task
//! - Outbound `ClientEvent`s are queued on an unbounded mpsc sender
//! - Inbound frames are decoded and forwarded as `TransportEvent`s
//! - Frames that fail to decode are logged and skipped; the connection stays up

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::error::{ChatError, Result};
use crate::protocol::{self, ClientEvent, ServerEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Server(ServerEvent),
    Disconnected { reason: String },
}

/// Sending half of the connection.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl TransportHandle {
    pub fn new(tx: mpsc::UnboundedSender<ClientEvent>) -> Self {
        TransportHandle { tx }
    }

    pub fn send(&self, event: ClientEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| ChatError::Transport("connection closed".to_string()))
    }
}

/// Connect to `url` and start pumping frames in the background.
pub async fn connect(
    url: &str,
) -> Result<(TransportHandle, mpsc::UnboundedReceiver<TransportEvent>)> {
    let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await?;
    info!(url, "connected to server");

    let (out_tx, out_rx) = mpsc::unbounded_channel::<ClientEvent>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<TransportEvent>();
    let _ = in_tx.send(TransportEvent::Connected);

    tokio::spawn(pump(ws_stream, out_rx, in_tx));
    Ok((TransportHandle::new(out_tx), in_rx))
}

async fn pump<S>(
    ws_stream: tokio_tungstenite::WebSocketStream<S>,
    mut out_rx: mpsc::UnboundedReceiver<ClientEvent>,
    in_tx: mpsc::UnboundedSender<TransportEvent>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => match protocol::decode(&text) {
                        Ok(Some(event)) => {
                            if in_tx.send(TransportEvent::Server(event)).is_err() {
                                break "receiver dropped".to_string();
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "undecodable frame from server"),
                    },
                    Some(Ok(WsMessage::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by server".to_string());
                    }
                    Some(Ok(_)) => {} // binary / ping / pong
                    Some(Err(e)) => break e.to_string(),
                    None => break "stream ended".to_string(),
                }
            }

            out = out_rx.recv() => {
                let Some(event) = out else {
                    let _ = ws_sink.close().await;
                    break "client shut down".to_string();
                };
                let frame = match protocol::encode(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(error = %e, "failed to encode outbound event");
                        continue;
                    }
                };
                debug!(bytes = frame.len(), "sending frame");
                if let Err(e) = ws_sink.send(WsMessage::Text(frame)).await {
                    break e.to_string();
                }
            }
        }
    };

    info!(reason = %reason, "disconnected from server");
    let _ = in_tx.send(TransportEvent::Disconnected { reason });
}
