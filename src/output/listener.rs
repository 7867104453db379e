//! Run listeners
//!
//! Observers receiving per-node start/skip/finish events. Listeners are
//! reporting-only; the scheduler never consults them for decisions.

use tracing::{info, warn};

use crate::models::{NodeResult, NodeStatus};

/// Receiver of per-node execution events for one run.
///
/// Implementations must tolerate calls from any worker, in any
/// interleaving the schedule produces.
pub trait RunListener: Send + Sync {
    /// A node passed its entry checkpoint and is about to lock and run.
    fn on_start(&self, _path: &str) {}

    /// A node (and its subtree) was skipped without running.
    fn on_skip(&self, _path: &str, _reason: &str) {}

    /// A node completed, successfully or not.
    fn on_finish(&self, _result: &NodeResult) {}
}

/// Listener that discards every event.
pub struct NullListener;

impl RunListener for NullListener {}

/// Listener that logs node lifecycle events through `tracing`.
pub struct LoggingListener;

impl RunListener for LoggingListener {
    fn on_start(&self, path: &str) {
        info!("Running {path}");
    }

    fn on_skip(&self, path: &str, reason: &str) {
        info!("Skipping {path} ({reason})");
    }

    fn on_finish(&self, result: &NodeResult) {
        match result.status {
            NodeStatus::Failed => warn!("  {result}"),
            _ => info!("  {result}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingListener {
        starts: AtomicUsize,
        skips: AtomicUsize,
        finishes: AtomicUsize,
    }

    impl RunListener for CountingListener {
        fn on_start(&self, _path: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_skip(&self, _path: &str, _reason: &str) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }

        fn on_finish(&self, _result: &NodeResult) {
            self.finishes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_default_methods_are_no_ops() {
        let listener = NullListener;
        listener.on_start("suite/a");
        listener.on_skip("suite/a", "because");
        listener.on_finish(&NodeResult::passed("suite/a", 1));
    }

    #[test]
    fn test_counting_listener_sees_events() {
        let listener = CountingListener::default();
        listener.on_start("suite/a");
        listener.on_finish(&NodeResult::passed("suite/a", 1));
        listener.on_skip("suite/b", "cancelled");

        assert_eq!(listener.starts.load(Ordering::SeqCst), 1);
        assert_eq!(listener.finishes.load(Ordering::SeqCst), 1);
        assert_eq!(listener.skips.load(Ordering::SeqCst), 1);
    }
}
