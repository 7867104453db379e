//! Node tree model
//!
//! The engine executes a tree of opaque units. Discovery happens elsewhere;
//! by the time a `TestTree` reaches the scheduler it is immutable, and the
//! per-node bookkeeping the scheduler needs lives in side tables keyed by
//! `NodeId` rather than in the nodes themselves.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::resource::ExclusiveResource;

/// Stable identity of a node within one tree; index into the arena.
pub type NodeId = usize;

/// Declared scheduling preference of a node.
///
/// The effective mode of a node governs how its children are dispatched:
/// `Concurrent` children fan out to the worker pool, `SameThread` children
/// run sequentially in declaration order on the current task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Concurrent,
    SameThread,
}

impl ExecutionMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "concurrent" | "parallel" => Some(ExecutionMode::Concurrent),
            "same_thread" | "samethread" | "serial" => Some(ExecutionMode::SameThread),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Concurrent => write!(f, "CONCURRENT"),
            ExecutionMode::SameThread => write!(f, "SAME_THREAD"),
        }
    }
}

/// Capability interface of an executable unit in the tree.
///
/// Implementations supply the lifecycle hooks and declarations; the
/// scheduler owns ordering, locking and child dispatch. Hooks run on
/// whatever worker the scheduler assigns, so implementations must be
/// `Send + Sync`.
#[async_trait]
pub trait TestUnit: Send + Sync {
    /// Display name, unique among siblings.
    fn name(&self) -> &str;

    /// Declared scheduling preference; `None` defers to the run
    /// configuration's default mode.
    fn execution_mode(&self) -> Option<ExecutionMode> {
        None
    }

    /// Shared resources this unit itself touches. Descendant declarations
    /// are collected separately by the tree walker.
    fn exclusive_resources(&self) -> Vec<ExclusiveResource> {
        Vec::new()
    }

    /// Setup hook, runs before the unit's own body and children.
    async fn before(&self) -> Result<()> {
        Ok(())
    }

    /// The unit's own work. Containers usually leave this empty.
    async fn execute(&self) -> Result<()> {
        Ok(())
    }

    /// Teardown hook; the scheduler runs it even when setup, the body or a
    /// child failed.
    async fn after(&self) -> Result<()> {
        Ok(())
    }
}

/// One node of the arena.
pub struct TreeNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub unit: Arc<dyn TestUnit>,
}

/// Immutable tree of executable nodes, stored as an arena.
///
/// Node 0 is the execution root. Children keep declaration order, which is
/// the order serialized subtrees execute in.
pub struct TestTree {
    nodes: Vec<TreeNode>,
}

impl TestTree {
    /// Create a tree containing only the root unit.
    pub fn new(root: Arc<dyn TestUnit>) -> Self {
        Self {
            nodes: vec![TreeNode {
                id: 0,
                parent: None,
                children: Vec::new(),
                unit: root,
            }],
        }
    }

    /// Append a child under `parent`, returning the new node's id.
    ///
    /// # Panics
    /// Panics if `parent` is not a node of this tree; trees are built
    /// top-down during discovery, so a dangling parent is a programming
    /// error.
    pub fn add_child(&mut self, parent: NodeId, unit: Arc<dyn TestUnit>) -> NodeId {
        assert!(parent < self.nodes.len(), "unknown parent node {parent}");
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            id,
            parent: Some(parent),
            children: Vec::new(),
            unit,
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn unit(&self, id: NodeId) -> &Arc<dyn TestUnit> {
        &self.nodes[id].unit
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Resources declared by the node itself.
    pub fn resources_of(&self, id: NodeId) -> Vec<ExclusiveResource> {
        self.nodes[id].unit.exclusive_resources()
    }

    /// Slash-separated path from the root, used as the stable display key
    /// in reports.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut segments = vec![self.nodes[id].unit.name().to_string()];
        let mut current = self.nodes[id].parent;
        while let Some(parent) = current {
            segments.push(self.nodes[parent].unit.name().to_string());
            current = self.nodes[parent].parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Visit every node of `id`'s subtree except `id` itself, parents
    /// before children.
    pub fn for_descendants(&self, id: NodeId, visit: &mut impl FnMut(NodeId)) {
        for &child in &self.nodes[id].children {
            visit(child);
            self.for_descendants(child, visit);
        }
    }

    /// Ids of the whole subtree rooted at `id`, including `id`, in
    /// depth-first declaration order.
    pub fn subtree_of(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids = vec![id];
        self.for_descendants(id, &mut |n| ids.push(n));
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resource::LockMode;

    struct PlainUnit {
        name: String,
        resources: Vec<ExclusiveResource>,
    }

    impl PlainUnit {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                resources: Vec::new(),
            })
        }

        fn with_resources(name: &str, resources: Vec<ExclusiveResource>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                resources,
            })
        }
    }

    #[async_trait]
    impl TestUnit for PlainUnit {
        fn name(&self) -> &str {
            &self.name
        }

        fn exclusive_resources(&self) -> Vec<ExclusiveResource> {
            self.resources.clone()
        }
    }

    #[test]
    fn test_tree_building() {
        let mut tree = TestTree::new(PlainUnit::new("root"));
        let a = tree.add_child(tree.root(), PlainUnit::new("a"));
        let b = tree.add_child(tree.root(), PlainUnit::new("b"));
        let a1 = tree.add_child(a, PlainUnit::new("a1"));

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.children(tree.root()), &[a, b]);
        assert_eq!(tree.node(a1).parent, Some(a));
        assert_eq!(tree.path_of(a1), "root/a/a1");
    }

    #[test]
    fn test_subtree_order_is_depth_first() {
        let mut tree = TestTree::new(PlainUnit::new("root"));
        let a = tree.add_child(tree.root(), PlainUnit::new("a"));
        let a1 = tree.add_child(a, PlainUnit::new("a1"));
        let b = tree.add_child(tree.root(), PlainUnit::new("b"));

        assert_eq!(tree.subtree_of(tree.root()), vec![0, a, a1, b]);
        assert_eq!(tree.subtree_of(a), vec![a, a1]);
    }

    #[test]
    fn test_resources_of() {
        let mut tree = TestTree::new(PlainUnit::new("root"));
        let db = tree.add_child(
            tree.root(),
            PlainUnit::with_resources("db", vec![ExclusiveResource::read_write("db")]),
        );

        assert!(tree.resources_of(tree.root()).is_empty());
        let resources = tree.resources_of(db);
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].mode, LockMode::ReadWrite);
    }
}
