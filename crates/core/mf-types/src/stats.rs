//! Statistics for ingestion runs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The outcome of one dispatched batch.
///
/// Collected centrally by the orchestrator instead of ad-hoc console
/// output inside the processing loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchOutcome {
    /// Output written and manifest entry persisted
    Completed {
        batch_index: u64,
        output_path: String,
        rows: u64,
    },

    /// No rows survived; nothing written, index stays pending
    Empty { batch_index: u64 },

    /// Aggregation-level failure; index stays pending for the next run
    Failed {
        batch_index: u64,
        kind: String,
        message: String,
    },
}

impl BatchOutcome {
    /// The batch index this outcome refers to.
    pub fn batch_index(&self) -> u64 {
        match self {
            Self::Completed { batch_index, .. }
            | Self::Empty { batch_index }
            | Self::Failed { batch_index, .. } => *batch_index,
        }
    }
}

/// Statistics collected during an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Total batches in the partitioning
    pub batches_total: usize,

    /// Batches already present in the manifest at start
    pub batches_skipped: usize,

    /// Batches completed by this run
    pub batches_completed: usize,

    /// Batches that produced no rows
    pub batches_empty: usize,

    /// Batches that failed and stay pending
    pub batches_failed: usize,

    /// Rows written across all completed batches
    pub rows_written: u64,

    /// Paths dropped by entity filtering or naming errors
    pub paths_dropped: usize,

    /// Per-batch outcomes of this run, in completion order
    pub outcomes: Vec<BatchOutcome>,
}

impl IngestStats {
    /// Create a new stats tracker with the current time as start time.
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Mark the run as complete with the current time.
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// Record a batch skipped because the manifest already holds it.
    pub fn record_skipped(&mut self) {
        self.batches_skipped += 1;
    }

    /// Record the outcome of a dispatched batch.
    pub fn record_outcome(&mut self, outcome: BatchOutcome) {
        match &outcome {
            BatchOutcome::Completed { rows, .. } => {
                self.batches_completed += 1;
                self.rows_written += rows;
            }
            BatchOutcome::Empty { .. } => self.batches_empty += 1,
            BatchOutcome::Failed { .. } => self.batches_failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Duration of the run, if complete.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// True if every dispatched batch failed.
    pub fn all_failed(&self) -> bool {
        self.batches_failed > 0 && self.batches_completed == 0 && self.batches_empty == 0
    }
}
