//! Wires a single accepted WebSocket stream to the hub: one reader task
//! (client control frames: subscribe/unsubscribe text commands and pong
//! replies) and one writer task (drains the per-client queue into the
//! socket), linked only by the hub's bounded `mpsc` channel.

use super::hub::{ClientId, FanoutHub};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, warn};

/// Subscribe/unsubscribe control protocol: a text frame `"sub:<topic>"`
/// or `"unsub:<topic>"`. Anything else is ignored rather than closing
/// the connection — a malformed control frame is not a protocol error
/// this layer needs to police.
fn handle_control_frame(hub: &FanoutHub, id: ClientId, text: &str) {
    if let Some(topic) = text.strip_prefix("sub:") {
        hub.subscribe(id, topic);
    } else if let Some(topic) = text.strip_prefix("unsub:") {
        hub.unsubscribe(id, topic);
    }
}

/// Spawn the reader and writer tasks for `stream` and return the id the
/// hub assigned it. The caller owns nothing further; both tasks exit on
/// their own once the socket closes or the hub drops the client.
pub fn spawn_connection<S>(hub: Arc<FanoutHub>, stream: WebSocketStream<S>) -> ClientId
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (id, mut outbound_rx) = hub.register();
    let (mut write, mut read) = stream.split();

    let writer_hub = hub.clone();
    tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let is_close = matches!(message, Message::Close(_));
            if write.send(message).await.is_err() {
                break;
            }
            if is_close {
                break;
            }
        }
        let _ = write.close().await;
        debug!(client = id.0, "writer task finished");
        writer_hub.disconnect(id);
    });

    let reader_hub = hub.clone();
    tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => handle_control_frame(&reader_hub, id, &text),
                Ok(Message::Pong(_)) => reader_hub.record_pong(id),
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(client = id.0, error = %e, "websocket read error");
                    break;
                }
            }
        }
        debug!(client = id.0, "reader task finished");
    });

    id
}
