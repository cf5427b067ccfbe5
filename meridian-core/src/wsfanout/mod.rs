//! WebSocket egress fan-out: one inbound reader and one outbound writer
//! task per client, a shared [`hub::FanoutHub`] for topic subscriptions
//! and best-effort broadcast, and a heartbeat sweep that disconnects
//! clients that stop answering pings.

pub mod connection;
pub mod hub;

pub use connection::spawn_connection;
pub use hub::{ClientId, FanoutConfig, FanoutHub};

use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;

/// Spawn the periodic heartbeat task: every `config.heartbeat_interval`,
/// ping every client and disconnect any that have missed more than
/// `config.missed_pong_threshold` consecutive pongs.
pub fn spawn_heartbeat(hub: Arc<FanoutHub>) -> tokio::task::JoinHandle<()> {
    let interval = hub.config.heartbeat_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            for stale in hub.tick_heartbeat() {
                hub.disconnect(stale);
            }
            ping_all(&hub).await;
        }
    })
}

async fn ping_all(hub: &FanoutHub) {
    for id in hub.client_ids() {
        if let Some(sender) = hub.sender_for(id) {
            let _ = sender.send(Message::Ping(Vec::new())).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_broadcasts_a_close_frame_to_every_client() {
        let hub = Arc::new(FanoutHub::new(FanoutConfig {
            shutdown_drain_timeout: Duration::from_millis(50),
            ..FanoutConfig::default()
        }));
        let (id, mut rx) = hub.register();
        hub.subscribe(id, "trades");

        hub.shutdown().await;

        let received = rx.recv().await.unwrap();
        assert!(matches!(received, Message::Close(None)));
        assert_eq!(hub.client_count(), 0);
    }
}
