//! Results storage and retrieval
//!
//! Provides persistent storage for run results in JSON format.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ExecutionConfig;
use crate::models::{ExecutionMode, RunSummary};

/// Stored run containing the full summary plus run metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRun {
    /// Unique run ID, derived from the start timestamp and root name
    pub id: String,

    /// Timestamp when the run started
    pub started_at: DateTime<Utc>,

    /// Timestamp when the run completed
    pub completed_at: DateTime<Utc>,

    /// Concurrency bound the run used
    pub parallelism: usize,

    /// Default execution mode the run used
    pub default_mode: ExecutionMode,

    /// Tool version
    pub tool_version: String,

    /// The full run summary
    pub summary: RunSummary,
}

impl StoredRun {
    /// Capture a finished run. `started_at` is when execution began; the
    /// completion time is derived from the summary's wall-clock duration.
    pub fn new(summary: RunSummary, config: &ExecutionConfig, started_at: DateTime<Utc>) -> Self {
        let completed_at = started_at + chrono::Duration::milliseconds(summary.duration_ms as i64);
        Self {
            id: generate_run_id(&summary.name, started_at),
            started_at,
            completed_at,
            parallelism: config.parallelism,
            default_mode: config.default_mode,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            summary,
        }
    }
}

/// Generate a run ID from start time and root name
fn generate_run_id(name: &str, started_at: DateTime<Utc>) -> String {
    let timestamp = started_at.format("%Y%m%d_%H%M%S");
    let slug: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    format!("{timestamp}_{slug}")
}

/// Results storage manager
pub struct ResultStore {
    /// Base directory for results
    base_dir: PathBuf,
}

impl ResultStore {
    /// Create a new results store
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create with default directory
    pub fn default_dir() -> Self {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("canopy")
            .join("results");
        Self::new(base_dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(format!("{run_id}.json"))
    }

    /// Save a run
    pub fn save(&self, run: &StoredRun) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir).context("Failed to create results directory")?;

        let path = self.run_path(&run.id);
        let file = File::create(&path).context("Failed to create results file")?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, run).context("Failed to write results")?;

        info!("Saved run results to {}", path.display());
        Ok(path)
    }

    /// Load a run by ID
    pub fn load(&self, run_id: &str) -> Result<StoredRun> {
        let path = self.run_path(run_id);
        let file = File::open(&path).context("Failed to open results file")?;
        let reader = BufReader::new(file);

        let run: StoredRun = serde_json::from_reader(reader).context("Failed to parse results")?;

        debug!("Loaded run results from {}", path.display());
        Ok(run)
    }

    /// List stored run IDs, oldest first
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Load the most recent run, if any
    pub fn latest(&self) -> Result<Option<StoredRun>> {
        match self.list()?.last() {
            Some(id) => Ok(Some(self.load(id)?)),
            None => Ok(None),
        }
    }
}
