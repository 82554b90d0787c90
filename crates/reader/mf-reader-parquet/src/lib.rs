//! mf-reader-parquet - object store listing and projected parquet reads.
//!
//! This crate provides the [`StoreReader`] implementation of the
//! [`ObjectReader`](mf_traits::ObjectReader) capability:
//!
//! - S3 and local filesystem access through `object_store`, with
//!   anonymous (skip-signature) access for public buckets
//! - Streaming parquet decode with column projection via byte-range
//!   requests, so memory stays bounded by the read batch size
//! - Bounded retry with exponential backoff and jitter, plus a
//!   per-attempt timeout, for transient fetch failures
//!
//! It also provides [`ParquetMetadataProvider`], which fetches the
//! partition metadata table used for entity filtering.

pub mod config;
pub mod metadata;
pub mod reader;
pub mod retry;
pub mod store;

pub use config::ReaderConfig;
pub use metadata::ParquetMetadataProvider;
pub use reader::StoreReader;
pub use retry::{with_retry, RetryConfig};
pub use store::parse_s3_uri;
