//! Exclusive resource declarations
//!
//! Nodes claim mutual exclusion by naming shared resources and the access
//! mode they need. The scheduler serializes any two nodes whose declared
//! resources conflict and leaves everything else concurrent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access mode required on a resource key.
///
/// `ReadWrite` blocks every other holder of the same key; `Read` is shared
/// among readers and blocks only writers.
///
/// The variant order is load-bearing: compound locks sort their entries by
/// (key, mode), and `ReadWrite` must order before `Read` at equal key so
/// that every compound lock touching a key agrees on the same acquisition
/// slot for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    ReadWrite,
    Read,
}

impl LockMode {
    /// Parse a mode from its config-file spelling
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "read" | "r" => Some(LockMode::Read),
            "read_write" | "readwrite" | "rw" | "write" | "w" => Some(LockMode::ReadWrite),
            _ => None,
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, LockMode::Read)
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Read => write!(f, "READ"),
            LockMode::ReadWrite => write!(f, "READ_WRITE"),
        }
    }
}

/// A named shared resource plus the access mode a node requires on it.
///
/// Keys are opaque strings; two nodes conflict when they name the same key
/// and at least one of them needs `ReadWrite` access.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExclusiveResource {
    pub key: String,
    pub mode: LockMode,
}

impl ExclusiveResource {
    /// Reserved key representing the process-wide ambient state shared by
    /// every node. Both global modes use this one key so that a global
    /// writer excludes global readers on the same underlying lock.
    pub const GLOBAL_KEY: &'static str = "canopy.global";

    pub fn new(key: impl Into<String>, mode: LockMode) -> Self {
        Self {
            key: key.into(),
            mode,
        }
    }

    /// Shorthand for a shared-read resource
    pub fn read(key: impl Into<String>) -> Self {
        Self::new(key, LockMode::Read)
    }

    /// Shorthand for an exclusive read-write resource
    pub fn read_write(key: impl Into<String>) -> Self {
        Self::new(key, LockMode::ReadWrite)
    }

    /// "Touches shared ambient state": runs concurrently with other
    /// readers of the global key but serializes against a global writer.
    pub fn global_read() -> Self {
        Self::new(Self::GLOBAL_KEY, LockMode::Read)
    }

    /// "Exclusively owns shared ambient state": serializes against the
    /// entire run.
    pub fn global_read_write() -> Self {
        Self::new(Self::GLOBAL_KEY, LockMode::ReadWrite)
    }

    pub fn is_global(&self) -> bool {
        self.key == Self::GLOBAL_KEY
    }
}

impl fmt::Display for ExclusiveResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.key, self.mode)
    }
}
