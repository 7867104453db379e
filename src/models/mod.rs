//! Data models for hierarchical test execution
//!
//! This module contains the node tree, resource declarations and result
//! types used throughout the engine.

mod node;
mod resource;
mod test_result;

pub use node::{ExecutionMode, NodeId, TestTree, TestUnit, TreeNode};
pub use resource::{ExclusiveResource, LockMode};
pub use test_result::{NodeResult, NodeStatus, RunSummary};
