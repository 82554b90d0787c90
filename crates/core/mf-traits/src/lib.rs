//! Capability traits consumed by the meterflow orchestrator.
//!
//! The orchestrator is generic over these seams so the pipeline can run
//! against S3, a local filesystem store, or in-memory fakes in tests.

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use mf_error::Result;

/// Read capability over the remote object store.
///
/// Implementations must tolerate concurrent reads: one shared handle is
/// passed by reference into every worker invocation.
#[async_trait]
pub trait ObjectReader: Send + Sync {
    /// Lists object paths under a prefix.
    ///
    /// Only `.parquet` objects are returned. Ordering is not guaranteed
    /// by the store; callers that need determinism must sort.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Reads one object projected to the given columns.
    ///
    /// Columns absent from the file are ignored by the projection; an
    /// empty projection reads all columns.
    ///
    /// # Errors
    ///
    /// `FetchError` for network/permission/missing-object conditions,
    /// `ParseError` for malformed payloads.
    async fn read(&self, path: &str, columns: &[String]) -> Result<Vec<RecordBatch>>;
}

/// Metadata table provider for entity filtering.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetches the metadata table for a partition key.
    ///
    /// The table is keyed by entity id and carries categorical
    /// attributes; the filter predicate is applied by the caller, not
    /// the provider.
    ///
    /// # Errors
    ///
    /// `FilterError` when the provider is unavailable. This is fatal at
    /// the run level: filtering safety is a precondition for every batch.
    async fn fetch(&self, partition_key: &str) -> Result<Vec<RecordBatch>>;
}
