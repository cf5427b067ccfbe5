//! Sharded ingress: each shard owns a disjoint set of symbols, a bounded
//! mpsc channel, and a single worker task. One worker per shard gives
//! strict per-symbol total order — two orders for the same symbol are
//! always processed in arrival order — without a lock shared across
//! shards. Cross-symbol ordering is neither guaranteed nor required.

use crate::core::errors::ExecutionError;
use crate::core::types::{Order, OrderId};
use crate::engine::pipeline::{Pipeline, PipelineOutcome};
use crate::orderbook::OrderBook;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// A unit of work dispatched to a shard worker. Replies go back over a
/// `oneshot` so the caller can await the outcome without blocking the
/// shard on anything but the channel send.
pub enum ShardCommand {
    Submit {
        order: Order,
        reply: oneshot::Sender<PipelineOutcome>,
    },
    Cancel {
        symbol: String,
        order_id: OrderId,
        reply: oneshot::Sender<Option<Order>>,
    },
    Amend {
        symbol: String,
        order_id: OrderId,
        new_qty: rust_decimal::Decimal,
        new_price: Option<rust_decimal::Decimal>,
        reply: oneshot::Sender<Result<PipelineOutcome, ExecutionError>>,
    },
}

/// Hashes `symbol` to a shard index in `[0, shard_count)`. Stable for the
/// lifetime of a given `shard_count` — resharding requires a restart.
pub fn shard_for(symbol: &str, shard_count: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    symbol.hash(&mut hasher);
    (hasher.finish() as usize) % shard_count.max(1)
}

/// Handle to a running shard worker: the channel used to submit work to
/// it, kept separate from the join handle so callers can clone and share
/// the sender freely.
pub struct ShardHandle {
    pub index: usize,
    pub sender: mpsc::Sender<ShardCommand>,
}

/// Owns every order book assigned to this shard and drains its queue on
/// a dedicated task. Books are not shared across shards, so no locking
/// is needed inside the loop.
pub struct ShardWorker {
    index: usize,
    books: HashMap<String, OrderBook>,
    pipeline: Pipeline,
    receiver: mpsc::Receiver<ShardCommand>,
}

impl ShardWorker {
    pub fn new(index: usize, pipeline: Pipeline, queue_size: usize) -> (Self, ShardHandle) {
        let (sender, receiver) = mpsc::channel(queue_size);
        let worker = Self {
            index,
            books: HashMap::new(),
            pipeline,
            receiver,
        };
        let handle = ShardHandle { index, sender };
        (worker, handle)
    }

    fn book_for<'a>(books: &'a mut HashMap<String, OrderBook>, symbol: &str) -> &'a mut OrderBook {
        books
            .entry(symbol.to_string())
            .or_insert_with(|| OrderBook::new(symbol))
    }

    /// Drain the shard's queue until the sender side is dropped (used by
    /// graceful shutdown: drop every `ShardHandle::sender`, then await
    /// this future to know the shard has finished in-flight work).
    pub async fn run(mut self) {
        while let Some(command) = self.receiver.recv().await {
            match command {
                ShardCommand::Submit { order, reply } => {
                    let symbol = order.symbol.clone();
                    let outcome = {
                        let book = Self::book_for(&mut self.books, &symbol);
                        self.pipeline.run(book, order)
                    };
                    if reply.send(outcome).is_err() {
                        debug!(shard = self.index, symbol, "submit reply receiver dropped");
                    }
                }
                ShardCommand::Cancel {
                    symbol,
                    order_id,
                    reply,
                } => {
                    let cancelled = Self::book_for(&mut self.books, &symbol).cancel(order_id);
                    let _ = reply.send(cancelled);
                }
                ShardCommand::Amend {
                    symbol,
                    order_id,
                    new_qty,
                    new_price,
                    reply,
                } => {
                    let result = match Self::book_for(&mut self.books, &symbol)
                        .amend(order_id, new_qty, new_price)
                    {
                        Some(outcome) => Ok(PipelineOutcome {
                            trades: outcome.trades,
                            order: outcome.order,
                        }),
                        None => Err(ExecutionError::NotFound(format!(
                            "order {order_id} not found for amend"
                        ))),
                    };
                    let _ = reply.send(result);
                }
            }
        }
        warn!(shard = self.index, "shard worker drained, shutting down");
    }
}
