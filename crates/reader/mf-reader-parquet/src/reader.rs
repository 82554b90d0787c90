//! Store-backed parquet reader with projection and retry.

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use mf_error::{FetchError, MfError, ParseError, Result};
use mf_traits::ObjectReader;
use parquet::arrow::async_reader::{ParquetObjectReader, ParquetRecordBatchStreamBuilder};
use parquet::arrow::ProjectionMask;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::ReaderConfig;
use crate::retry::with_retry;
use crate::store::{map_store_error, StoreCache};

/// [`ObjectReader`] implementation over `object_store`.
///
/// Reads decode through the async parquet reader, which fetches row
/// groups via byte-range requests, so memory per read stays bounded by
/// the configured batch size. One `StoreReader` is constructed per run
/// and shared read-only across all workers.
pub struct StoreReader {
    config: ReaderConfig,
    cache: StoreCache,
}

impl StoreReader {
    /// Create a new reader with the given configuration.
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            cache: StoreCache::new(config.clone()),
            config,
        }
    }

    /// Create a reader for local files only.
    pub fn local_only() -> Self {
        Self::new(ReaderConfig::default())
    }

    async fn read_once(&self, uri: &str, columns: &[String]) -> Result<Vec<RecordBatch>> {
        let fut = self.read_inner(uri, columns);
        let timeout = Duration::from_secs(self.config.fetch_timeout_secs);

        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                uri: uri.to_string(),
                timeout_secs: self.config.fetch_timeout_secs,
            }
            .into()),
        }
    }

    async fn read_inner(&self, uri: &str, columns: &[String]) -> Result<Vec<RecordBatch>> {
        let (store, path) = self.cache.resolve(uri)?;

        let meta = store
            .head(&path)
            .await
            .map_err(|e| map_store_error(uri, e))?;

        trace!(uri = uri, size = meta.size, "Opening parquet object");

        let reader = ParquetObjectReader::new(store, meta);
        let builder = ParquetRecordBatchStreamBuilder::new(reader)
            .await
            .map_err(|e| ParseError::InvalidFormat(format!("{uri}: {e}")))?;

        let builder = if columns.is_empty() {
            builder
        } else {
            let arrow_schema = builder.schema();
            let indices: Vec<usize> = columns
                .iter()
                .filter_map(|name| {
                    arrow_schema
                        .fields()
                        .iter()
                        .position(|f| f.name() == name)
                })
                .collect();

            if indices.is_empty() {
                debug!(
                    uri = uri,
                    requested_columns = ?columns,
                    "No matching columns for projection, reading all"
                );
                builder
            } else {
                let projection = ProjectionMask::roots(builder.parquet_schema(), indices);
                builder.with_projection(projection)
            }
        };

        let stream = builder
            .with_batch_size(self.config.batch_size)
            .build()
            .map_err(|e| ParseError::InvalidFormat(format!("{uri}: {e}")))?;

        let batches: Vec<RecordBatch> = stream
            .map_err(|e| MfError::from(ParseError::InvalidFormat(format!("{uri}: {e}"))))
            .try_collect()
            .await?;

        Ok(batches)
    }
}

#[async_trait]
impl ObjectReader for StoreReader {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let (store, path, uri_root) = self.cache.resolve_prefix(prefix)?;

        let mut paths: Vec<String> = store
            .list(Some(&path))
            .map(|result| result.map_err(|e| MfError::from(map_store_error(prefix, e))))
            .try_filter_map(|meta| {
                let uri_root = uri_root.clone();
                async move {
                    let key = meta.location.as_ref();
                    Ok(key
                        .ends_with(".parquet")
                        .then(|| format!("{uri_root}/{key}")))
                }
            })
            .try_collect()
            .await?;

        paths.sort();
        debug!(prefix = prefix, count = paths.len(), "Listed parquet objects");
        Ok(paths)
    }

    async fn read(&self, path: &str, columns: &[String]) -> Result<Vec<RecordBatch>> {
        with_retry(&self.config.retry, "read_object", || {
            self.read_once(path, columns)
        })
        .await
    }
}
