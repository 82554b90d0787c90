//! Core data types for meterflow.
//!
//! This crate provides the types shared across the pipeline:
//! - [`entity`] - entity id derivation from object paths
//! - [`ReductionPolicy`] - hourly reduction semantics (sum vs. mean)
//! - [`HourlyTable`] / [`BatchTable`] - aggregated batch results
//! - [`ManifestEntry`] - the per-batch progress ledger entry
//! - [`IngestStats`] / [`BatchOutcome`] - run statistics

pub mod entity;
pub mod manifest;
pub mod policy;
pub mod stats;
pub mod table;

pub use entity::entity_id_from_path;
pub use manifest::ManifestEntry;
pub use policy::ReductionPolicy;
pub use stats::{BatchOutcome, IngestStats};
pub use table::{BatchTable, HourlyTable, COL_ENTITY_ID, COL_HOUR};
