//! Bulkhead isolation: bound concurrency to one logical operation so a
//! slow or stuck dependency cannot starve every other caller.
//!
//! Two semaphores model the two bounds the design calls for: one caps
//! concurrently executing calls, the other caps callers waiting for a
//! slot. A full waiting queue fails fast instead of growing unbounded.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct BulkheadConfig {
    pub max_concurrency: usize,
    pub max_waiting_queue: usize,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            max_waiting_queue: 32,
        }
    }
}

impl BulkheadConfig {
    pub fn conservative() -> Self {
        Self {
            max_concurrency: 4,
            max_waiting_queue: 8,
        }
    }

    pub fn aggressive() -> Self {
        Self {
            max_concurrency: 64,
            max_waiting_queue: 128,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkheadError {
    QueueFull,
    Cancelled,
}

impl std::fmt::Display for BulkheadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BulkheadError::QueueFull => write!(f, "bulkhead waiting queue is full"),
            BulkheadError::Cancelled => write!(f, "bulkhead wait was cancelled"),
        }
    }
}

impl std::error::Error for BulkheadError {}

/// RAII guard holding an execution slot; releases it (and decrements the
/// active-call counter) on drop regardless of how the caller's future
/// exits (success, error, or cancellation).
pub struct BulkheadPermit<'a> {
    _permit: tokio::sync::SemaphorePermit<'a>,
    active: &'a AtomicUsize,
}

impl Drop for BulkheadPermit<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct Bulkhead {
    name: String,
    config: BulkheadConfig,
    executors: Semaphore,
    waiting: Arc<AtomicUsize>,
    active: AtomicUsize,
}

impl Bulkhead {
    pub fn new(name: impl Into<String>, config: BulkheadConfig) -> Self {
        Self {
            name: name.into(),
            executors: Semaphore::new(config.max_concurrency),
            waiting: Arc::new(AtomicUsize::new(0)),
            active: AtomicUsize::new(0),
            config,
        }
    }

    pub fn active_calls(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn waiting_calls(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }

    /// Enter the bulkhead: fails immediately if the waiting queue is
    /// already at capacity, otherwise waits for an execution slot.
    pub async fn enter(&self) -> Result<BulkheadPermit<'_>, BulkheadError> {
        let queued = self.waiting.fetch_add(1, Ordering::AcqRel) + 1;
        if queued > self.config.max_waiting_queue {
            self.waiting.fetch_sub(1, Ordering::AcqRel);
            debug!(bulkhead = %self.name, "waiting queue full, rejecting");
            return Err(BulkheadError::QueueFull);
        }

        let permit = self.executors.acquire().await;
        self.waiting.fetch_sub(1, Ordering::AcqRel);
        let permit = permit.map_err(|_| BulkheadError::Cancelled)?;
        self.active.fetch_add(1, Ordering::AcqRel);
        Ok(BulkheadPermit {
            _permit: permit,
            active: &self.active,
        })
    }

    /// Run `f` inside the bulkhead, propagating `BulkheadError` if no
    /// slot is available.
    pub async fn execute<F, T>(&self, f: F) -> Result<T, BulkheadError>
    where
        F: std::future::Future<Output = T>,
    {
        let _permit = self.enter().await?;
        Ok(f.await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[tokio::test]
    async fn allows_calls_up_to_concurrency() {
        let bh = Bulkhead::new("t", BulkheadConfig {
            max_concurrency: 2,
            max_waiting_queue: 4,
        });
        let p1 = bh.enter().await.unwrap();
        let p2 = bh.enter().await.unwrap();
        assert_eq!(bh.active_calls(), 2);
        drop(p1);
        drop(p2);
    }

    #[tokio::test]
    async fn rejects_when_waiting_queue_full() {
        let bh = Arc::new(Bulkhead::new("t", BulkheadConfig {
            max_concurrency: 1,
            max_waiting_queue: 0,
        }));
        let _held = bh.enter().await.unwrap();
        // No concurrency slot and zero waiting room -> immediate reject.
        let result = bh.enter().await;
        assert_eq!(result.err(), Some(BulkheadError::QueueFull));
    }

    #[tokio::test]
    async fn permit_release_unblocks_waiter() {
        let bh = Arc::new(Bulkhead::new("t", BulkheadConfig {
            max_concurrency: 1,
            max_waiting_queue: 4,
        }));
        let held = bh.enter().await.unwrap();
        let bh2 = bh.clone();
        let released = Arc::new(AtomicBool::new(false));
        let released2 = released.clone();
        let handle = tokio::spawn(async move {
            let _p = bh2.enter().await.unwrap();
            released2.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!released.load(Ordering::SeqCst));
        drop(held);
        handle.await.unwrap();
        assert!(released.load(Ordering::SeqCst));
    }
}
