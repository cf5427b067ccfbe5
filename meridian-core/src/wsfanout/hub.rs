//! Subscriber bookkeeping and the broadcast fan-out core. Kept free of
//! any actual socket I/O so it can be exercised directly by tests;
//! [`super::connection::spawn_connection`] is the only place that talks
//! to a real `WebSocketStream`.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

#[derive(Debug, Clone, Copy)]
pub struct FanoutConfig {
    pub queue_size: usize,
    pub heartbeat_interval: Duration,
    pub missed_pong_threshold: u32,
    pub shutdown_drain_timeout: Duration,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            queue_size: 256,
            heartbeat_interval: Duration::from_secs(15),
            missed_pong_threshold: 3,
            shutdown_drain_timeout: Duration::from_secs(5),
        }
    }
}

pub(super) struct ClientHandle {
    pub sender: mpsc::Sender<Message>,
    pub subscriptions: Mutex<HashSet<String>>,
    pub missed_pongs: AtomicU32,
    pub dropped: AtomicU64,
}

/// Registry of connected clients and the topics they're subscribed to.
/// `broadcast` is best-effort per subscriber: a full queue drops the
/// message for that one client rather than blocking every other
/// subscriber or the publisher.
pub struct FanoutHub {
    clients: dashmap::DashMap<ClientId, Arc<ClientHandle>>,
    next_id: AtomicU64,
    pub(super) config: FanoutConfig,
}

impl FanoutHub {
    pub fn new(config: FanoutConfig) -> Self {
        Self {
            clients: dashmap::DashMap::new(),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub(super) fn register(&self) -> (ClientId, mpsc::Receiver<Message>) {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.config.queue_size);
        let handle = ClientHandle {
            sender,
            subscriptions: Mutex::new(HashSet::new()),
            missed_pongs: AtomicU32::new(0),
            dropped: AtomicU64::new(0),
        };
        self.clients.insert(id, Arc::new(handle));
        (id, receiver)
    }

    pub fn disconnect(&self, id: ClientId) {
        self.clients.remove(&id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Idempotent: subscribing to an already-subscribed topic is a no-op.
    pub fn subscribe(&self, id: ClientId, topic: &str) {
        if let Some(client) = self.clients.get(&id) {
            client.subscriptions.lock().insert(topic.to_string());
        }
    }

    /// Idempotent: unsubscribing from a topic the client was never on
    /// succeeds silently.
    pub fn unsubscribe(&self, id: ClientId, topic: &str) {
        if let Some(client) = self.clients.get(&id) {
            client.subscriptions.lock().remove(topic);
        }
    }

    /// Offer `message` to every client subscribed to `topic`. A full
    /// per-client queue drops the message for that client and increments
    /// its drop counter; it never blocks or affects other subscribers.
    pub fn broadcast(&self, topic: &str, message: Message) {
        for entry in self.clients.iter() {
            if !entry.subscriptions.lock().contains(topic) {
                continue;
            }
            if entry.sender.try_send(message.clone()).is_err() {
                entry.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(client = entry.key().0, topic, "fan-out queue full, message dropped");
            }
        }
    }

    pub fn dropped_count(&self, id: ClientId) -> u64 {
        self.clients
            .get(&id)
            .map(|c| c.dropped.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub(super) fn record_pong(&self, id: ClientId) {
        if let Some(client) = self.clients.get(&id) {
            client.missed_pongs.store(0, Ordering::Relaxed);
        }
    }

    /// Called once per heartbeat tick before a ping is sent. Returns the
    /// client ids that have now exceeded `missed_pong_threshold` and
    /// should be disconnected.
    pub(super) fn tick_heartbeat(&self) -> Vec<ClientId> {
        let mut stale = Vec::new();
        for entry in self.clients.iter() {
            let missed = entry.missed_pongs.fetch_add(1, Ordering::Relaxed) + 1;
            if missed > self.config.missed_pong_threshold {
                stale.push(*entry.key());
            }
        }
        stale
    }

    pub(super) fn sender_for(&self, id: ClientId) -> Option<mpsc::Sender<Message>> {
        self.clients.get(&id).map(|c| c.sender.clone())
    }

    pub(super) fn client_ids(&self) -> Vec<ClientId> {
        self.clients.iter().map(|e| *e.key()).collect()
    }

    /// Broadcast a close frame to every client and wait up to
    /// `config.shutdown_drain_timeout` for their writer queues to drain.
    pub async fn shutdown(&self) {
        let ids: Vec<ClientId> = self.clients.iter().map(|e| *e.key()).collect();
        for id in &ids {
            if let Some(sender) = self.sender_for(*id) {
                let _ = sender.send(Message::Close(None)).await;
            }
        }

        let deadline = tokio::time::Instant::now() + self.config.shutdown_drain_timeout;
        while tokio::time::Instant::now() < deadline {
            if self.clients.iter().all(|e| e.sender.capacity() == self.config.queue_size) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.clients.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_and_broadcast_delivers_to_matching_topic_only() {
        let hub = FanoutHub::new(FanoutConfig::default());
        let (id, mut rx) = hub.register();
        hub.subscribe(id, "trades.BTC-USD");

        hub.broadcast("trades.ETH-USD", Message::Text("eth".to_string()));
        hub.broadcast("trades.BTC-USD", Message::Text("btc".to_string()));

        let received = rx.try_recv().unwrap();
        assert_eq!(received, Message::Text("btc".to_string()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_is_idempotent_and_stops_delivery() {
        let hub = FanoutHub::new(FanoutConfig::default());
        let (id, mut rx) = hub.register();
        hub.subscribe(id, "trades");
        hub.unsubscribe(id, "trades");
        hub.unsubscribe(id, "trades");

        hub.broadcast("trades", Message::Text("x".to_string()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn a_full_queue_drops_and_counts_without_blocking_other_subscribers() {
        let config = FanoutConfig { queue_size: 1, ..FanoutConfig::default() };
        let hub = FanoutHub::new(config);
        let (id, _rx) = hub.register();
        hub.subscribe(id, "trades");

        hub.broadcast("trades", Message::Text("1".to_string()));
        hub.broadcast("trades", Message::Text("2".to_string()));

        assert_eq!(hub.dropped_count(id), 1);
    }

    #[test]
    fn heartbeat_flags_clients_past_the_missed_pong_threshold() {
        let config = FanoutConfig { missed_pong_threshold: 2, ..FanoutConfig::default() };
        let hub = FanoutHub::new(config);
        let (id, _rx) = hub.register();

        assert!(hub.tick_heartbeat().is_empty());
        assert!(hub.tick_heartbeat().is_empty());
        assert_eq!(hub.tick_heartbeat(), vec![id]);
    }

    #[test]
    fn recording_a_pong_resets_the_missed_counter() {
        let hub = FanoutHub::new(FanoutConfig::default());
        let (id, _rx) = hub.register();
        hub.tick_heartbeat();
        hub.tick_heartbeat();
        hub.record_pong(id);
        assert!(hub.tick_heartbeat().is_empty());
    }
}
