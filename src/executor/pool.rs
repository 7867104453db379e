//! Worker pool handle
//!
//! The run-wide concurrency bound, modeled as an explicit handle rather
//! than implicit global state. The tokio runtime supplies the actual
//! work-stealing threads; the pool's semaphore caps how many node bodies
//! are in flight at once, and its shutdown reclaims every slot within a
//! grace period at run end.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use super::EngineError;

/// Bounded pool of execution slots shared by one run.
///
/// Slots are checked out around node hook bodies only; they are never held
/// across lock waits or child join barriers, so slot exhaustion cannot
/// deadlock a run.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    parallelism: usize,
}

impl WorkerPool {
    /// Create a pool with `parallelism` slots. A zero request is clamped
    /// to one slot.
    pub fn new(parallelism: usize) -> Self {
        let parallelism = parallelism.max(1);
        debug!("worker pool sized at {parallelism}");
        Self {
            permits: Arc::new(Semaphore::new(parallelism)),
            parallelism,
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Check out one slot, queueing until one frees up. The slot returns
    /// to the pool when the permit drops.
    pub async fn checkout(&self) -> OwnedSemaphorePermit {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .expect("worker pool semaphore closed")
    }

    /// Graceful shutdown: wait until every slot has been returned.
    ///
    /// Failing the grace period leaves the pool untouched and reports the
    /// timeout; already-collected results stay valid.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), EngineError> {
        let reclaim = self.permits.acquire_many(self.parallelism as u32);
        match tokio::time::timeout(grace, reclaim).await {
            Ok(permits) => {
                drop(permits.expect("worker pool semaphore closed"));
                debug!("worker pool drained");
                Ok(())
            }
            Err(_) => Err(EngineError::PoolShutdownTimeout(grace)),
        }
    }
}
