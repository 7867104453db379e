//! Lock-inference tree walker
//!
//! One pass over the node tree before anything executes, producing the
//! `ExecutionAdvisor` the scheduler consumes. Each top-level child of the
//! root is analyzed independently: it is the unit of isolation for
//! whole-run exclusivity escalation.

use std::collections::BTreeSet;

use crate::locks::{LockManager, ResourceLock};
use crate::models::{ExclusiveResource, ExecutionMode, NodeId, TestTree};

use super::advisor::ExecutionAdvisor;
use super::EngineError;

/// Single-pass analyzer deriving locks and forced modes from the declared
/// resources of a tree.
pub struct TreeWalker<'a> {
    lock_manager: &'a LockManager,
}

impl<'a> TreeWalker<'a> {
    pub fn new(lock_manager: &'a LockManager) -> Self {
        Self { lock_manager }
    }

    /// Analyze `tree` and build the advisor for one run.
    ///
    /// Fails fast if the execution root declares resources; a lock at the
    /// root would serialize the entire run unconditionally, which is never
    /// what a declaration meant.
    pub fn walk(&self, tree: &TestTree) -> Result<ExecutionAdvisor, EngineError> {
        let root_resources = tree.resources_of(tree.root());
        if !root_resources.is_empty() {
            return Err(EngineError::RootDeclaresResources(root_resources.len()));
        }

        let mut advisor = ExecutionAdvisor::new();
        for &descriptor in tree.children(tree.root()) {
            self.walk_node(tree, descriptor, descriptor, &mut advisor);
        }
        Ok(advisor)
    }

    /// `descriptor` is the top-level child whose subtree `node` belongs to.
    fn walk_node(
        &self,
        tree: &TestTree,
        descriptor: NodeId,
        node: NodeId,
        advisor: &mut ExecutionAdvisor,
    ) {
        if advisor
            .lock_of(descriptor)
            .is_some_and(ResourceLock::is_global_read_write)
        {
            // The whole branch is already serialized under the global
            // write lock; nothing finer-grained can matter below it.
            return;
        }

        let own = tree.resources_of(node);
        if own.is_empty() {
            if node == descriptor {
                // Resource-free top-level branches take the shared global
                // read lock: concurrent with each other, serialized
                // against a global writer.
                advisor.assign_lock(
                    descriptor,
                    self.lock_manager.lock_for(&ExclusiveResource::global_read()),
                );
            }
            for &child in tree.children(node) {
                self.walk_node(tree, descriptor, child, advisor);
            }
            return;
        }

        let mut all_resources: BTreeSet<ExclusiveResource> = own.into_iter().collect();
        if all_resources.iter().all(|r| r.mode.is_read_only()) {
            // Optimistically concurrent, unless a write hides anywhere in
            // the subtree.
            tree.for_descendants(node, &mut |child| {
                all_resources.extend(tree.resources_of(child));
            });
            if !all_resources.iter().all(|r| r.mode.is_read_only()) {
                advisor.force_mode(node, ExecutionMode::SameThread);
                tree.for_descendants(node, &mut |child| {
                    advisor.force_mode(child, ExecutionMode::SameThread);
                });
            }
        } else {
            // The node's own declarations contain a write: serialize the
            // subtree and collect everything used transitively below, since
            // no finer-grained locking happens under a serialized node.
            advisor.force_mode(node, ExecutionMode::SameThread);
            tree.for_descendants(node, &mut |child| {
                all_resources.extend(tree.resources_of(child));
                advisor.force_mode(child, ExecutionMode::SameThread);
            });
        }

        if all_resources.contains(&ExclusiveResource::global_read_write()) {
            // Whole-run exclusivity: serialize the entire top-level branch
            // and drop any locks already assigned below it, now redundant.
            advisor.force_mode(descriptor, ExecutionMode::SameThread);
            tree.for_descendants(descriptor, &mut |child| {
                advisor.force_mode(child, ExecutionMode::SameThread);
                advisor.remove_lock(child);
            });
            advisor.assign_lock(
                descriptor,
                self.lock_manager
                    .lock_for(&ExclusiveResource::global_read_write()),
            );
        } else {
            if node == descriptor {
                // Still must serialize against a true global writer.
                all_resources.insert(ExclusiveResource::global_read());
            } else {
                // Already implied by the ancestor descriptor holding it.
                all_resources.remove(&ExclusiveResource::global_read());
            }
            advisor.assign_lock(node, self.lock_manager.lock_for_resources(all_resources));
        }
    }
}
