//! Matching engine: symbol-sharded ingress, one worker per shard, each
//! order running [`pipeline::Pipeline`] against its shard's books.
//!
//! Cross-symbol ordering is never guaranteed; within a symbol, every
//! order (submit, cancel, amend) is serialized by landing on the same
//! shard worker.

pub mod alert_manager;
pub mod pipeline;
pub mod shard;

pub use alert_manager::{Alert, AlertConfig, AlertManager, AlertSeverity, AlertType};
pub use pipeline::{Pipeline, PipelineEvent, PipelineOutcome};
pub use shard::{shard_for, ShardCommand, ShardHandle, ShardWorker};

use crate::core::errors::ExecutionError;
use crate::core::types::{Order, OrderId};
use crate::plugins::MatchingAlgorithm;
use crate::resilience::rate_limiter::RateLimiter;
use crate::risk::RiskGate;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tracing::error;

/// Top-level matching engine: owns every shard's ingress channel and
/// routes work by `shard_for(symbol, shard_count)`.
pub struct MatchingEngine {
    shards: Vec<ShardHandle>,
    publisher: broadcast::Sender<PipelineEvent>,
}

impl MatchingEngine {
    /// Spawn `shard_count` workers, each running `pipeline` against an
    /// independent set of order books. `pipeline` must already be wired
    /// to the shared risk gate, rate limiter and algorithm — every shard
    /// gets its own clone of the `Arc`s inside it, but no mutable state
    /// is shared between shard books.
    pub fn spawn(
        shard_count: usize,
        queue_size: usize,
        algorithm: Arc<dyn MatchingAlgorithm>,
        rate_limiter: Arc<RateLimiter>,
        risk_gate: Arc<RiskGate>,
        alerts: Arc<Mutex<AlertManager>>,
    ) -> Self {
        let (publisher, _) = broadcast::channel(4096);
        let mut shards = Vec::with_capacity(shard_count);
        for index in 0..shard_count {
            let pipeline = Pipeline::new(
                algorithm.clone(),
                rate_limiter.clone(),
                risk_gate.clone(),
                alerts.clone(),
                publisher.clone(),
            );
            let (worker, handle) = ShardWorker::new(index, pipeline, queue_size);
            tokio::spawn(worker.run());
            shards.push(handle);
        }
        Self { shards, publisher }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.publisher.subscribe()
    }

    fn shard_for(&self, symbol: &str) -> &ShardHandle {
        let index = shard_for(symbol, self.shards.len());
        &self.shards[index]
    }

    pub async fn submit(&self, order: Order) -> Result<PipelineOutcome, ExecutionError> {
        let (reply, rx) = oneshot::channel();
        let symbol = order.symbol.clone();
        self.shard_for(&symbol)
            .sender
            .send(ShardCommand::Submit { order, reply })
            .await
            .map_err(|_| ExecutionError::DependencyUnavailable("shard worker".to_string()))?;
        rx.await
            .map_err(|_| ExecutionError::DependencyUnavailable("shard worker".to_string()))
    }

    pub async fn cancel(&self, symbol: &str, order_id: OrderId) -> Result<Option<Order>, ExecutionError> {
        let (reply, rx) = oneshot::channel();
        self.shard_for(symbol)
            .sender
            .send(ShardCommand::Cancel {
                symbol: symbol.to_string(),
                order_id,
                reply,
            })
            .await
            .map_err(|_| ExecutionError::DependencyUnavailable("shard worker".to_string()))?;
        rx.await
            .map_err(|_| ExecutionError::DependencyUnavailable("shard worker".to_string()))
    }

    pub async fn amend(
        &self,
        symbol: &str,
        order_id: OrderId,
        new_qty: Decimal,
        new_price: Option<Decimal>,
    ) -> Result<PipelineOutcome, ExecutionError> {
        let (reply, rx) = oneshot::channel();
        self.shard_for(symbol)
            .sender
            .send(ShardCommand::Amend {
                symbol: symbol.to_string(),
                order_id,
                new_qty,
                new_price,
                reply,
            })
            .await
            .map_err(|_| ExecutionError::DependencyUnavailable("shard worker".to_string()))?;
        rx.await
            .map_err(|_| ExecutionError::DependencyUnavailable("shard worker".to_string()))?
    }

    /// Drop every shard's sender so in-flight work drains and worker
    /// tasks exit. Callers driving the engine from the coordinator's
    /// `shutdown_all` sweep should await a short grace period after
    /// calling this before considering the engine fully stopped.
    pub fn close(self) {
        for shard in self.shards {
            drop(shard.sender);
        }
    }
}
