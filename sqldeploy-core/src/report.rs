//! Per-batch outcomes and the aggregate run report.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{DeployConfig, DeploymentKind};
use crate::connection::ConnectionTarget;
use crate::error::{DeployError, Result};

/// Outcome of executing one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The engine accepted the batch
    Succeeded { rows_affected: Option<u64> },
    /// The engine rejected the batch
    Failed { error: String },
}

/// Result of one batch, identified by 1-based position and preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// 1-based position in the batch sequence
    pub position: usize,
    /// First characters of the batch, newlines flattened
    pub preview: String,
    /// Success or failure
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl ExecutionResult {
    /// Records a successful batch.
    pub fn succeeded(position: usize, preview: String, rows_affected: Option<u64>) -> Self {
        Self {
            position,
            preview,
            outcome: BatchOutcome::Succeeded { rows_affected },
        }
    }

    /// Records a failed batch with the engine's error text.
    pub fn failed(position: usize, preview: String, error: impl Into<String>) -> Self {
        Self {
            position,
            preview,
            outcome: BatchOutcome::Failed {
                error: error.into(),
            },
        }
    }

    /// True if the batch succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Succeeded { .. })
    }

    /// The failure as a [`DeployError::BatchExecution`], if any.
    pub fn error(&self) -> Option<DeployError> {
        match &self.outcome {
            BatchOutcome::Succeeded { .. } => None,
            BatchOutcome::Failed { error } => Some(DeployError::BatchExecution {
                position: self.position,
                preview: self.preview.clone(),
                detail: error.clone(),
            }),
        }
    }
}

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every batch succeeded (or there were none)
    Succeeded,
    /// At least one batch failed
    Failed,
}

/// Aggregate of every batch attempted in one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Identifier correlating the report with logs
    pub run_id: Uuid,
    /// Deployment variant
    pub kind: DeploymentKind,
    /// Script as configured (never the temporary copy)
    pub script: PathBuf,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the last batch finished
    pub finished_at: Option<DateTime<Utc>>,
    /// Per-batch results in execution order
    pub results: Vec<ExecutionResult>,
}

impl RunReport {
    /// Empty report for a run that is starting now.
    pub fn new(kind: DeploymentKind, script: &Path) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            kind,
            script: script.to_path_buf(),
            started_at: Utc::now(),
            finished_at: None,
            results: Vec::new(),
        }
    }

    /// Appends a batch result.
    pub fn record(&mut self, result: ExecutionResult) {
        self.results.push(result);
    }

    /// Stamps the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Batches attempted.
    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    /// Batches that failed.
    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    /// Batches that succeeded.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Failed batch results in execution order.
    pub fn failures(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Failed if any batch failed, even when most succeeded.
    pub fn status(&self) -> RunStatus {
        if self.failures().next().is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        }
    }

    /// True when no batch failed.
    pub fn is_success(&self) -> bool {
        self.status() == RunStatus::Succeeded
    }

    /// One-line summary of the run.
    pub fn summary(&self) -> String {
        match self.status() {
            RunStatus::Succeeded => format!(
                "{} ({} batch(es) executed).",
                self.kind.success_message(),
                self.attempted()
            ),
            RunStatus::Failed => format!(
                "Completed with {} error(s) out of {} batch(es).",
                self.failed(),
                self.attempted()
            ),
        }
    }

    /// Pretty-printed JSON form of the report.
    ///
    /// # Errors
    /// Returns [`DeployError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DeployError::Serialization {
            context: "Run report".to_string(),
            source: e,
        })
    }
}

/// Receives progress events while a run executes.
///
/// Every method defaults to doing nothing; `()` is the silent observer.
pub trait RunObserver {
    /// The script was prepared and segmented.
    fn planned(&mut self, _config: &DeployConfig, _batches: usize) {}

    /// The placeholder copy was written.
    fn substituted(&mut self, _prepared: &Path, _replacements: usize) {}

    /// A token was obtained.
    fn token_acquired(&mut self) {}

    /// The session is open.
    fn connected(&mut self, _target: &ConnectionTarget) {}

    /// One batch finished, successfully or not.
    fn batch_finished(&mut self, _result: &ExecutionResult) {}
}

impl RunObserver for () {}
