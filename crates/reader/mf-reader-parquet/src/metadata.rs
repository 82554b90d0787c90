//! Partition metadata provider.

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use mf_error::{FilterError, MfError, Result};
use mf_traits::{MetadataProvider, ObjectReader};
use std::sync::Arc;
use tracing::info;

use crate::reader::StoreReader;

/// Placeholder substituted with the partition key in the path template.
pub const KEY_PLACEHOLDER: &str = "{key}";

/// Fetches the partition metadata table from a parquet object.
///
/// The object path is a template with a `{key}` placeholder, e.g.
/// `s3://lake/metadata/region={key}/{key}_metadata.parquet`. Any
/// failure fetching or decoding the table maps to `FilterError`:
/// filtering safety is a run-level precondition, so the orchestrator
/// aborts before dispatching any batch.
pub struct ParquetMetadataProvider {
    reader: Arc<StoreReader>,
    path_template: String,

    /// Columns to project from the metadata table; empty reads all
    columns: Vec<String>,
}

impl ParquetMetadataProvider {
    /// Create a provider over the shared store reader.
    pub fn new(reader: Arc<StoreReader>, path_template: impl Into<String>) -> Self {
        Self {
            reader,
            path_template: path_template.into(),
            columns: Vec::new(),
        }
    }

    /// Restrict the fetch to the given columns.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// The metadata object path for a partition key.
    pub fn path_for(&self, partition_key: &str) -> String {
        self.path_template.replace(KEY_PLACEHOLDER, partition_key)
    }
}

#[async_trait]
impl MetadataProvider for ParquetMetadataProvider {
    async fn fetch(&self, partition_key: &str) -> Result<Vec<RecordBatch>> {
        let path = self.path_for(partition_key);
        info!(partition_key = partition_key, path = %path, "Fetching partition metadata");

        let batches = self
            .reader
            .read(&path, &self.columns)
            .await
            .map_err(|e| match e {
                // Metadata problems are run-level, whatever their origin
                MfError::Filter(f) => MfError::Filter(f),
                other => FilterError::Unavailable(format!("{path}: {other}")).into(),
            })?;

        Ok(batches)
    }
}
