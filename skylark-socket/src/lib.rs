//! Real-time channel lifecycle.
//!
//! One [`connect`] call owns one WebSocket connection. Inbound JSON frames
//! are classified into [`ChatEvent`]s and delivered over an mpsc channel;
//! the receiving loop, not this crate, mutates the store, so all message
//! state changes stay on one task. Reconnection and delivery guarantees
//! are deliberately not handled here; the transport's defaults apply.

use futures_util::{SinkExt, StreamExt};
use skylark_common::{ChatEvent, OutboundFrame};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("websocket connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection is closed")]
    Closed,
}

/// Handle to a live subscription. Dropping it tears the connection down;
/// [`Subscription::close`] does the same but waits for the close
/// handshake.
#[derive(Debug)]
pub struct Subscription {
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    shutdown: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

/// Opens the connection and spawns its reader task. Every classified
/// inbound frame is sent to `events` until the connection or the
/// subscription ends.
// TODO: reconnect with backoff once the backend defines delivery guarantees
pub async fn connect(
    url: &str,
    events: mpsc::UnboundedSender<ChatEvent>,
) -> Result<Subscription, SocketError> {
    let (stream, _) = connect_async(url).await?;
    debug!(url, "websocket connected");
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(run_connection(stream, events, outbound_rx, shutdown_rx));
    Ok(Subscription {
        outbound: outbound_tx,
        shutdown: Some(shutdown_tx),
        task,
    })
}

impl Subscription {
    /// Queues an outbound `message:send` frame.
    pub fn send(&self, chat_id: &str, text: &str) -> Result<(), SocketError> {
        self.outbound
            .send(OutboundFrame::MessageSend {
                chat_id: chat_id.into(),
                text: text.into(),
            })
            .map_err(|_| SocketError::Closed)
    }

    /// Closes the connection exactly once. The event sender is dropped
    /// before the close frame goes out, so no event is delivered after
    /// this returns.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_connection(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    events: mpsc::UnboundedSender<ChatEvent>,
    mut outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    let json = match serde_json::to_string(&frame) {
                        Ok(json) => json,
                        Err(err) => {
                            warn!("failed to encode outbound frame: {err}");
                            continue;
                        }
                    };
                    if let Err(err) = sink.send(WsMessage::Text(json)).await {
                        warn!("websocket send failed: {err}");
                        break;
                    }
                }
                None => break,
            },
            frame = source.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    if let Some(event) = classify(&text) {
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if sink.send(WsMessage::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!("websocket read failed: {err}");
                    break;
                }
            },
        }
    }
    // no dispatch after this point
    drop(events);
    let _ = sink.send(WsMessage::Close(None)).await;
}

fn classify(text: &str) -> Option<ChatEvent> {
    match serde_json::from_str(text) {
        Ok(ChatEvent::Unknown) => {
            debug!("ignoring frame with unknown type");
            None
        }
        Ok(event) => Some(event),
        Err(err) => {
            warn!("ignoring malformed frame: {err}");
            None
        }
    }
}
