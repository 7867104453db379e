//! Hierarchical scheduler
//!
//! Executes a tree per the advisor: every node passes through a fixed
//! state machine (cancellation check, lock acquisition, before hook, own
//! body, children, after hook, release), children run sequentially or fan
//! out to the worker pool depending on the node's effective mode, and a
//! node's failure never aborts its siblings.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::models::{ExecutionMode, NodeId, NodeResult, RunSummary, TestTree};
use crate::output::RunListener;

use super::advisor::ExecutionAdvisor;
use super::cancel::CancelToken;
use super::pool::WorkerPool;

/// Per-run scheduler state. Shared by reference between the spawned node
/// tasks; all mutability lives in the results table.
pub struct HierarchicalRunner {
    tree: Arc<TestTree>,
    advisor: Arc<ExecutionAdvisor>,
    listener: Arc<dyn RunListener>,
    cancel: CancelToken,
    pool: Arc<WorkerPool>,
    default_mode: ExecutionMode,
    results: Mutex<HashMap<NodeId, NodeResult>>,
}

impl HierarchicalRunner {
    pub fn new(
        tree: Arc<TestTree>,
        advisor: Arc<ExecutionAdvisor>,
        listener: Arc<dyn RunListener>,
        cancel: CancelToken,
        pool: Arc<WorkerPool>,
        default_mode: ExecutionMode,
    ) -> Arc<Self> {
        Arc::new(Self {
            tree,
            advisor,
            listener,
            cancel,
            pool,
            default_mode,
            results: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Forced mode, else the node's declared preference, else the run
    /// default. Governs how this node's children are dispatched.
    fn effective_mode(&self, id: NodeId) -> ExecutionMode {
        self.advisor
            .forced_mode_of(id)
            .or_else(|| self.tree.unit(id).execution_mode())
            .unwrap_or(self.default_mode)
    }

    fn record(&self, id: NodeId, result: NodeResult) {
        self.results
            .lock()
            .expect("results table poisoned")
            .insert(id, result);
    }

    /// Mark a whole subtree skipped without running anything.
    fn skip_subtree(&self, id: NodeId, reason: &str) {
        for node in self.tree.subtree_of(id) {
            let path = self.tree.path_of(node);
            self.listener.on_skip(&path, reason);
            self.record(node, NodeResult::skipped(path, reason));
        }
    }

    /// Execute one node and its subtree. Boxed because the recursion depth
    /// follows the tree shape.
    pub fn execute(self: Arc<Self>, id: NodeId) -> BoxFuture<'static, ()> {
        async move {
            if self.cancel.is_cancellation_requested() {
                self.skip_subtree(id, "run cancelled");
                return;
            }

            let path = self.tree.path_of(id);
            self.listener.on_start(&path);
            let started = Instant::now();

            // LOCKING: suspend until the advised lock is held. The guards
            // stay alive across hooks and children and drop on every exit
            // path below.
            let guards = match self.advisor.lock_of(id) {
                Some(lock) => {
                    debug!("{path}: acquiring {} lock entries", lock.resources().len());
                    Some(lock.acquire().await)
                }
                None => None,
            };

            let mut failure: Option<String> = None;

            // Setup and own body occupy one pool slot; the slot is
            // returned before the child barrier so waiting parents never
            // starve their own children.
            {
                let _slot = self.pool.checkout().await;
                let unit = self.tree.unit(id);
                if let Err(err) = unit.before().await {
                    failure = Some(format!("before hook failed: {err}"));
                } else if let Err(err) = unit.execute().await {
                    failure = Some(format!("execution failed: {err}"));
                }
            }

            if failure.is_none() {
                Arc::clone(&self).run_children(id).await;
            } else {
                for &child in self.tree.children(id) {
                    self.skip_subtree(child, "parent setup failed");
                }
            }

            // Teardown runs regardless of earlier failures.
            {
                let _slot = self.pool.checkout().await;
                if let Err(err) = self.tree.unit(id).after().await {
                    let message = format!("after hook failed: {err}");
                    failure.get_or_insert(message);
                }
            }

            drop(guards);

            let duration_ms = started.elapsed().as_millis() as u64;
            let result = match failure {
                None => NodeResult::passed(path, duration_ms),
                Some(message) => NodeResult::failed(path, duration_ms, message),
            };
            self.listener.on_finish(&result);
            self.record(id, result);
        }
        .boxed()
    }

    async fn run_children(self: Arc<Self>, id: NodeId) {
        let children = self.tree.children(id).to_vec();
        if children.is_empty() {
            return;
        }

        match self.effective_mode(id) {
            ExecutionMode::SameThread => {
                for child in children {
                    Arc::clone(&self).execute(child).await;
                }
            }
            ExecutionMode::Concurrent => {
                let mut tasks = JoinSet::new();
                for child in children {
                    tasks.spawn(Arc::clone(&self).execute(child));
                }
                // Join barrier: the parent's after hook must not run
                // before every child subtree has settled.
                while let Some(joined) = tasks.join_next().await {
                    if let Err(err) = joined {
                        error!("child task aborted: {err}");
                    }
                }
            }
        }
    }

    /// Assemble the run summary from the recorded results, in tree order.
    pub fn finish(&self, duration_ms: u64) -> RunSummary {
        let name = self.tree.unit(self.tree.root()).name().to_string();
        let mut table = self.results.lock().expect("results table poisoned");
        let results = (0..self.tree.len())
            .filter_map(|id| table.remove(&id))
            .collect();
        RunSummary::new(
            name,
            results,
            duration_ms,
            self.cancel.is_cancellation_requested(),
        )
    }
}
