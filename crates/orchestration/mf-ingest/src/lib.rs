//! mf-ingest - resumable batch ingestion of per-entity load time series.
//!
//! This crate is the orchestration layer of meterflow. Given a partition
//! key, it:
//!
//! - lists the partition's time-series objects and sorts them so batch
//!   indices are reproducible across runs
//! - fetches the partition metadata table and derives the allowed
//!   entity set from a configurable attribute predicate
//! - partitions the path list into fixed-size batches
//! - dispatches pending batches to a bounded worker pool; each worker
//!   fetches its objects, drops disallowed entities, floors timestamps
//!   to the hour, and reduces by the configured policy
//! - writes one parquet file per non-empty batch and records it in an
//!   atomically persisted JSON manifest, so an interrupted run resumes
//!   exactly where it left off
//!
//! Only the orchestrator mutates the manifest and run statistics;
//! workers share nothing but the read-only store handle.

pub mod aggregate;
pub mod config;
pub mod filter;
pub mod manifest;
pub mod orchestrator;
pub mod partition;
pub(crate) mod worker;
pub mod writer;

pub use config::IngestConfig;
pub use filter::EntityFilter;
pub use manifest::Manifest;
pub use orchestrator::{Ingestor, RunSummary};
pub use writer::OutputWriter;
