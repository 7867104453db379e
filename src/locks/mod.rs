//! Resource locks
//!
//! A `ResourceLock` is the acquirable handle the scheduler takes before
//! entering a node. It may cover several resource keys; the underlying
//! per-key locks are always acquired in one deterministic global order
//! (key, then write-before-read) and released in reverse, which is what
//! keeps concurrent acquisition from independent tasks deadlock-free.

mod manager;

pub use manager::LockManager;

use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::models::{ExclusiveResource, LockMode};

/// One per-key slot of a compound lock.
pub(crate) struct LockEntry {
    pub(crate) key: String,
    pub(crate) mode: LockMode,
    pub(crate) lock: Arc<RwLock<()>>,
}

/// An acquirable lock over zero or more resource keys.
///
/// Entries are sorted by (key, mode) at construction; `acquire` walks them
/// in order. The same key always occupies the same slot position relative
/// to other keys in any `ResourceLock` built by the same `LockManager`.
#[derive(Clone)]
pub struct ResourceLock {
    entries: Arc<Vec<LockEntry>>,
}

impl ResourceLock {
    pub(crate) fn from_entries(entries: Vec<LockEntry>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Lock covering no resources; acquiring it is a no-op.
    pub fn nop() -> Self {
        Self::from_entries(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The resources this lock protects, in acquisition order.
    pub fn resources(&self) -> Vec<ExclusiveResource> {
        self.entries
            .iter()
            .map(|e| ExclusiveResource::new(e.key.clone(), e.mode))
            .collect()
    }

    /// Whether this is the escalated whole-run exclusivity lock.
    pub fn is_global_read_write(&self) -> bool {
        self.entries.len() == 1
            && self.entries[0].key == ExclusiveResource::GLOBAL_KEY
            && self.entries[0].mode == LockMode::ReadWrite
    }

    /// Acquire every underlying lock in order, suspending until each is
    /// held. Never times out. The returned guards release in reverse
    /// acquisition order when dropped, on whatever task drops them.
    pub async fn acquire(&self) -> LockGuards {
        let mut guards = Vec::with_capacity(self.entries.len());
        for entry in self.entries.iter() {
            let guard = match entry.mode {
                LockMode::ReadWrite => Guard::Write(Arc::clone(&entry.lock).write_owned().await),
                LockMode::Read => Guard::Read(Arc::clone(&entry.lock).read_owned().await),
            };
            guards.push(guard);
        }
        LockGuards { guards }
    }
}

enum Guard {
    Read(OwnedRwLockReadGuard<()>),
    Write(OwnedRwLockWriteGuard<()>),
}

/// Held guards of an acquired `ResourceLock`.
///
/// Dropping releases the underlying locks in reverse acquisition order.
pub struct LockGuards {
    guards: Vec<Guard>,
}

impl Drop for LockGuards {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}
