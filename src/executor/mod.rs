//! Hierarchical execution engine
//!
//! Ties the pieces together: the tree walker infers locks and forced
//! modes before anything runs, then the scheduler executes the tree on a
//! bounded worker pool with cooperative cancellation.

mod advisor;
mod cancel;
mod pool;
mod runner;
mod walker;

pub use advisor::ExecutionAdvisor;
pub use cancel::CancelToken;
pub use pool::WorkerPool;
pub use runner::HierarchicalRunner;
pub use walker::TreeWalker;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::ExecutionConfig;
use crate::locks::LockManager;
use crate::models::{ExclusiveResource, ExecutionMode, RunSummary, TestTree};
use crate::output::RunListener;
use crate::utils::Timer;

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("execution root must not declare exclusive resources ({0} declared)")]
    RootDeclaresResources(usize),

    #[error("worker pool still busy after {0:?} shutdown grace")]
    PoolShutdownTimeout(Duration),
}

/// Execute a whole tree and collect its summary.
///
/// The walker runs first; a root-level resource declaration aborts the run
/// before any node executes. A pool that fails to drain within the grace
/// period is reported as a warning and does not invalidate the collected
/// per-node results.
pub async fn execute_all(
    tree: TestTree,
    listener: Arc<dyn RunListener>,
    cancel: CancelToken,
    config: &ExecutionConfig,
) -> Result<RunSummary, EngineError> {
    let lock_manager = LockManager::new();
    let advisor = TreeWalker::new(&lock_manager).walk(&tree)?;
    info!(
        "lock inference: {} lock(s) across {} node(s), parallelism {}",
        advisor.lock_count(),
        tree.len(),
        config.parallelism
    );

    let pool = Arc::new(WorkerPool::new(config.parallelism));
    let runner = HierarchicalRunner::new(
        Arc::new(tree),
        Arc::new(advisor),
        listener,
        cancel,
        Arc::clone(&pool),
        config.default_mode,
    );

    let timer = Timer::start("run");
    let root = runner.root();
    Arc::clone(&runner).execute(root).await;

    if let Err(err) = pool.shutdown(config.shutdown_grace()).await {
        warn!("{err}; per-node results remain valid");
    }

    Ok(runner.finish(timer.elapsed_ms()))
}

/// Advice the walker derived for one node, for dry-run inspection.
#[derive(Clone, Debug)]
pub struct NodeAdvice {
    pub path: String,
    pub declared_mode: Option<ExecutionMode>,
    pub forced_mode: Option<ExecutionMode>,
    pub lock: Vec<ExclusiveResource>,
}

/// Run lock inference only and report the advice per node, in tree order.
pub fn explain(tree: &TestTree) -> Result<Vec<NodeAdvice>, EngineError> {
    let lock_manager = LockManager::new();
    let advisor = TreeWalker::new(&lock_manager).walk(tree)?;

    Ok(tree
        .subtree_of(tree.root())
        .into_iter()
        .map(|id| NodeAdvice {
            path: tree.path_of(id),
            declared_mode: tree.unit(id).execution_mode(),
            forced_mode: advisor.forced_mode_of(id),
            lock: advisor
                .lock_of(id)
                .map(|lock| lock.resources())
                .unwrap_or_default(),
        })
        .collect())
}
