//! Lock manager
//!
//! Caches one read-write lock per resource key for the lifetime of a run
//! and builds deterministically ordered compound locks from resource sets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;

use crate::models::ExclusiveResource;

use super::{LockEntry, ResourceLock};

/// Per-run registry of resource locks.
///
/// The same key always maps to the same underlying lock object, so two
/// compound locks sharing a key contend on the same slot no matter what
/// other resources they carry.
pub struct LockManager {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn rwlock_for(&self, key: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().expect("lock registry poisoned");
        Arc::clone(
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(()))),
        )
    }

    /// Lock for a single resource, created and cached on first use.
    pub fn lock_for(&self, resource: &ExclusiveResource) -> ResourceLock {
        ResourceLock::from_entries(vec![LockEntry {
            key: resource.key.clone(),
            mode: resource.mode,
            lock: self.rwlock_for(&resource.key),
        }])
    }

    /// Compound lock over a resource set.
    ///
    /// Resources are sorted by (key, mode) with write ordering before read
    /// at equal key; a key requested in both modes collapses to its write
    /// entry. The resulting acquisition order is identical for any two
    /// sets sharing a key, regardless of other members.
    pub fn lock_for_resources(
        &self,
        resources: impl IntoIterator<Item = ExclusiveResource>,
    ) -> ResourceLock {
        let mut sorted: Vec<ExclusiveResource> = resources.into_iter().collect();
        sorted.sort();
        sorted.dedup_by(|next, kept| next.key == kept.key);

        let entries = sorted
            .into_iter()
            .map(|resource| LockEntry {
                lock: self.rwlock_for(&resource.key),
                key: resource.key,
                mode: resource.mode,
            })
            .collect();
        ResourceLock::from_entries(entries)
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LockMode;
    use rand::prelude::*;
    use std::time::Duration;

    #[test]
    fn test_same_key_maps_to_same_lock() {
        let manager = LockManager::new();
        let a = manager.rwlock_for("db");
        let b = manager.rwlock_for("db");
        assert!(Arc::ptr_eq(&a, &b));

        let other = manager.rwlock_for("cache");
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn test_compound_order_is_stable_across_sets() {
        let manager = LockManager::new();

        let one = manager.lock_for_resources(vec![
            ExclusiveResource::read_write("b"),
            ExclusiveResource::read("a"),
        ]);
        let two = manager.lock_for_resources(vec![
            ExclusiveResource::read("c"),
            ExclusiveResource::read_write("b"),
            ExclusiveResource::read("a"),
        ]);

        let keys_one: Vec<String> = one.resources().into_iter().map(|r| r.key).collect();
        let keys_two: Vec<String> = two.resources().into_iter().map(|r| r.key).collect();
        assert_eq!(keys_one, vec!["a", "b"]);
        assert_eq!(keys_two, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_write_wins_over_read_for_one_key() {
        let manager = LockManager::new();
        let lock = manager.lock_for_resources(vec![
            ExclusiveResource::read("db"),
            ExclusiveResource::read_write("db"),
        ]);
        let resources = lock.resources();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].mode, LockMode::ReadWrite);
    }

    /// Many tasks acquiring random overlapping resource sets must all
    /// complete; a single acquisition-order violation would deadlock the
    /// whole flock and trip the timeout.
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_random_overlapping_acquisition_is_deadlock_free() {
        const KEYS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];
        const TASKS: usize = 64;

        let manager = Arc::new(LockManager::new());
        let mut handles = Vec::new();

        for seed in 0..TASKS {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                let mut rng = StdRng::seed_from_u64(seed as u64);
                for _ in 0..20 {
                    let mut set = Vec::new();
                    for key in KEYS {
                        if rng.random_bool(0.4) {
                            let mode = if rng.random_bool(0.5) {
                                LockMode::ReadWrite
                            } else {
                                LockMode::Read
                            };
                            set.push(ExclusiveResource::new(key, mode));
                        }
                    }
                    let lock = manager.lock_for_resources(set);
                    let guards = lock.acquire().await;
                    tokio::task::yield_now().await;
                    drop(guards);
                }
            }));
        }

        let all = futures::future::join_all(handles);
        let joined = tokio::time::timeout(Duration::from_secs(30), all)
            .await
            .expect("acquisition stress run deadlocked");
        for result in joined {
            result.expect("stress task panicked");
        }
    }
}
