//! canopy - Hierarchical Test Execution Engine
//!
//! Executes a tree of test nodes on a bounded worker pool, deciding which
//! subtrees may run in parallel and which must serialize because they
//! touch the same declared shared resource.
//!
//! ## How a run works
//!
//! 1. A single tree-walker pass infers, per node, the resource lock to
//!    acquire and whether the node's declared execution mode must be
//!    downgraded to serial execution.
//! 2. The scheduler consumes that advice: it checks cancellation at every
//!    node entry, acquires compound locks in one deterministic global
//!    order, fans concurrent children out to the pool, and always runs
//!    teardown and releases locks no matter what failed.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use canopy::config::ExecutionConfig;
//! use canopy::executor::{execute_all, CancelToken};
//! use canopy::output::LoggingListener;
//! use canopy::plan::PlanFile;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let plan = PlanFile::load("plan.yaml")?;
//! let summary = execute_all(
//!     plan.build_tree(),
//!     Arc::new(LoggingListener),
//!     CancelToken::new(),
//!     &ExecutionConfig::default(),
//! )
//! .await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod executor;
pub mod locks;
pub mod models;
pub mod output;
pub mod plan;
pub mod results;
pub mod utils;

pub use executor::{execute_all, explain, CancelToken, EngineError};
pub use models::{ExclusiveResource, ExecutionMode, LockMode, RunSummary, TestTree, TestUnit};
