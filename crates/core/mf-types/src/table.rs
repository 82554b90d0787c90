//! Aggregated batch table types.

use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Name of the entity id column in aggregated output.
pub const COL_ENTITY_ID: &str = "entity_id";

/// Name of the hour timestamp column in aggregated output.
pub const COL_HOUR: &str = "hour";

/// The aggregated result of one batch.
///
/// A batch that yields zero rows after filtering and per-path error
/// absorption is an explicit [`BatchTable::Empty`], not a zero-row
/// table, so the orchestrator can skip writing and registering it.
#[derive(Debug, Clone)]
pub enum BatchTable {
    /// No rows survived for this batch
    Empty,

    /// One aggregated table, one row per `(entity_id, hour)`
    Rows(HourlyTable),
}

impl BatchTable {
    /// Returns true for the empty marker.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// An hourly-aggregated table wrapped with the entity ids it contains.
///
/// The inner `RecordBatch` is stored in an `Arc`, so clones are cheap
/// and the data is never copied when passing through the pipeline.
#[derive(Clone)]
pub struct HourlyTable {
    inner: Arc<RecordBatch>,

    /// Entity ids that contributed rows, in path order
    entity_ids: Vec<String>,
}

impl HourlyTable {
    /// Wraps a RecordBatch with the entity ids it contains.
    pub fn new(batch: RecordBatch, entity_ids: Vec<String>) -> Self {
        Self {
            inner: Arc::new(batch),
            entity_ids,
        }
    }

    /// Returns a reference to the underlying RecordBatch.
    #[inline]
    pub fn record_batch(&self) -> &RecordBatch {
        &self.inner
    }

    /// Entity ids that contributed rows, in path order.
    #[inline]
    pub fn entity_ids(&self) -> &[String] {
        &self.entity_ids
    }

    /// Number of `(entity_id, hour)` rows.
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.inner.num_rows()
    }

    /// Schema of the aggregated table.
    #[inline]
    pub fn schema(&self) -> arrow::datatypes::SchemaRef {
        self.inner.schema()
    }
}

impl std::fmt::Debug for HourlyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HourlyTable")
            .field("rows", &self.inner.num_rows())
            .field("entity_ids", &self.entity_ids)
            .field("schema", &self.inner.schema())
            .finish()
    }
}
