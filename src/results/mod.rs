//! Results storage module
//!
//! Provides persistent storage for run results.

mod storage;

pub use storage::{ResultStore, StoredRun};
