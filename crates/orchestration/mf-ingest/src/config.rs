//! Ingestion run configuration.

use mf_error::{MfError, Result};
use mf_types::ReductionPolicy;
use std::path::PathBuf;

/// Configuration for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Partition key scoping the object listing (e.g. a region code)
    pub partition_key: String,

    /// Prefix under which the partition's objects live
    pub source_prefix: String,

    /// Measurement columns to project and aggregate
    pub columns: Vec<String>,

    /// Name of the timestamp column in the source objects
    pub timestamp_column: String,

    /// Hourly reduction policy
    pub policy: ReductionPolicy,

    /// Directory for output files and the manifest
    pub output_dir: PathBuf,

    /// Paths per batch
    pub batch_size: usize,

    /// Bounded worker pool size
    pub worker_count: usize,
}

impl IngestConfig {
    /// Create a configuration with defaults for the tuning knobs.
    pub fn new(
        partition_key: impl Into<String>,
        source_prefix: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            source_prefix: source_prefix.into(),
            columns: Vec::new(),
            timestamp_column: "timestamp".to_string(),
            policy: ReductionPolicy::Sum,
            output_dir: output_dir.into(),
            batch_size: 100,
            worker_count: 8,
        }
    }

    /// Set the measurement columns to aggregate.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Set the timestamp column name.
    pub fn with_timestamp_column(mut self, name: impl Into<String>) -> Self {
        self.timestamp_column = name.into();
        self
    }

    /// Set the hourly reduction policy.
    pub fn with_policy(mut self, policy: ReductionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the number of paths per batch.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the worker pool size.
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Path of the manifest ledger for this partition.
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_manifest.json", self.partition_key))
    }

    /// Column projection for source reads: timestamp plus measurements.
    pub fn projection(&self) -> Vec<String> {
        let mut cols = Vec::with_capacity(self.columns.len() + 1);
        cols.push(self.timestamp_column.clone());
        cols.extend(self.columns.iter().cloned());
        cols
    }

    /// Validate the configuration before a run.
    pub fn validate(&self) -> Result<()> {
        if self.partition_key.is_empty() {
            return Err(MfError::Config("partition_key must not be empty".to_string()));
        }
        if self.source_prefix.is_empty() {
            return Err(MfError::Config("source_prefix must not be empty".to_string()));
        }
        if self.columns.is_empty() {
            return Err(MfError::Config(
                "at least one measurement column is required".to_string(),
            ));
        }
        if self.columns.iter().any(|c| c == &self.timestamp_column) {
            return Err(MfError::Config(format!(
                "timestamp column '{}' must not appear in the measurement columns",
                self.timestamp_column
            )));
        }
        if self.batch_size == 0 {
            return Err(MfError::Config("batch_size must be >= 1".to_string()));
        }
        if self.worker_count == 0 {
            return Err(MfError::Config("worker_count must be >= 1".to_string()));
        }
        Ok(())
    }
}
