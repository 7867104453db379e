//! Per-node results and run summaries
//!
//! Defines the reporting types the scheduler fills in during a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal state of a node after one run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Passed,
    Failed,
    Skipped,
}

impl NodeStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            NodeStatus::Passed => "✓",
            NodeStatus::Failed => "✗",
            NodeStatus::Skipped => "○",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NodeStatus::Passed)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Passed => write!(f, "PASS"),
            NodeStatus::Failed => write!(f, "FAIL"),
            NodeStatus::Skipped => write!(f, "SKIP"),
        }
    }
}

/// Result of one node's execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeResult {
    /// Slash-separated path from the root, stable across runs of the same
    /// tree
    pub path: String,
    pub status: NodeStatus,
    pub duration_ms: u64,
    pub message: Option<String>,
}

impl NodeResult {
    pub fn passed(path: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            path: path.into(),
            status: NodeStatus::Passed,
            duration_ms,
            message: None,
        }
    }

    pub fn failed(path: impl Into<String>, duration_ms: u64, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: NodeStatus::Failed,
            duration_ms,
            message: Some(message.into()),
        }
    }

    pub fn skipped(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: NodeStatus::Skipped,
            duration_ms: 0,
            message: Some(reason.into()),
        }
    }
}

impl fmt::Display for NodeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.path,
            self.duration_ms
        )?;
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Summary of one full run of a tree
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    /// Name of the root unit
    pub name: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Wall-clock duration of the whole run, not the sum of node durations
    pub duration_ms: u64,
    /// Whether cancellation was observed during the run
    pub cancelled: bool,
    pub results: Vec<NodeResult>,
}

impl RunSummary {
    pub fn new(
        name: impl Into<String>,
        results: Vec<NodeResult>,
        duration_ms: u64,
        cancelled: bool,
    ) -> Self {
        let total = results.len();
        let passed = results
            .iter()
            .filter(|r| r.status == NodeStatus::Passed)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.status == NodeStatus::Failed)
            .count();
        let skipped = results
            .iter()
            .filter(|r| r.status == NodeStatus::Skipped)
            .count();

        Self {
            name: name.into(),
            total,
            passed,
            failed,
            skipped,
            duration_ms,
            cancelled,
            results,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    /// Look up a node's result by path
    pub fn result_for(&self, path: &str) -> Option<&NodeResult> {
        self.results.iter().find(|r| r.path == path)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} ({} nodes)", self.name, self.total)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {}",
            self.total, self.passed, self.failed, self.skipped
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms{}",
            self.pass_rate(),
            self.duration_ms,
            if self.cancelled { " | CANCELLED" } else { "" }
        )
    }
}
