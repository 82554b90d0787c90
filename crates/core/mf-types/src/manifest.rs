//! Manifest ledger entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed batch in the progress ledger.
///
/// The manifest maps `batch_index` to this entry; an index absent from
/// the manifest is pending and will be processed on the next run. The
/// structured form is the canonical schema; entries are only ever added
/// by a successful run, never removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Position of the batch in the deterministic partitioning
    pub batch_index: u64,

    /// Path of the parquet file this batch produced
    pub output_path: String,

    /// Entity ids contained in the output file
    pub entity_ids: Vec<String>,

    /// Partition key the run was scoped to
    pub partition_key: String,

    /// Number of `(entity_id, hour)` rows written
    pub rows: u64,

    /// When the batch completed
    pub completed_at: DateTime<Utc>,
}

impl ManifestEntry {
    /// Creates a new entry stamped with the current time.
    pub fn new(
        batch_index: u64,
        output_path: impl Into<String>,
        entity_ids: Vec<String>,
        partition_key: impl Into<String>,
        rows: u64,
    ) -> Self {
        Self {
            batch_index,
            output_path: output_path.into(),
            entity_ids,
            partition_key: partition_key.into(),
            rows,
            completed_at: Utc::now(),
        }
    }
}
