//! Run coordination: discovery, partitioning, dispatch, and the ledger.

use crate::config::IngestConfig;
use crate::filter::{self, EntityFilter};
use crate::manifest::Manifest;
use crate::partition::partition_paths;
use crate::worker::{self, WorkerContext};
use crate::writer::OutputWriter;
use mf_error::Result;
use mf_traits::{MetadataProvider, ObjectReader};
use mf_types::{BatchOutcome, BatchTable, IngestStats, ManifestEntry};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// What a finished run hands back to the caller.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub partition_key: String,
    pub manifest_path: String,
    /// Output files recorded in the manifest, in batch-index order.
    /// Includes files completed by earlier runs.
    pub output_paths: Vec<String>,
    pub stats: IngestStats,
}

/// Resumable single-partition ingestion run.
///
/// Discovers objects under the source prefix, partitions the full
/// sorted path list into fixed-size batches, and dispatches pending
/// batches to a bounded worker pool. Completed batches are written to
/// parquet before their manifest entry is persisted, so interrupting a
/// run at any point leaves only pending indices and orphan output
/// files behind, both of which the next run makes right.
pub struct Ingestor<R: ObjectReader + ?Sized + 'static, M: MetadataProvider> {
    config: IngestConfig,

    /// Entity admission rules, evaluated against partition metadata
    filter: EntityFilter,

    /// Source object reader, shared across workers
    reader: Arc<R>,

    /// Partition metadata source for the entity filter
    metadata: M,
}

impl<R: ObjectReader + ?Sized + 'static, M: MetadataProvider> Ingestor<R, M> {
    pub fn new(config: IngestConfig, filter: EntityFilter, reader: Arc<R>, metadata: M) -> Self {
        Self {
            config,
            filter,
            reader,
            metadata,
        }
    }

    /// Run the partition to completion, resuming from the manifest.
    pub async fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;

        info!(
            partition_key = %self.config.partition_key,
            source_prefix = %self.config.source_prefix,
            batch_size = self.config.batch_size,
            workers = self.config.worker_count,
            policy = %self.config.policy,
            "Starting ingestion run"
        );

        let mut stats = IngestStats::new();
        let mut manifest = Manifest::load(self.config.manifest_path());
        if !manifest.is_empty() {
            info!(completed = manifest.len(), "Resuming from existing manifest");
        }

        // Metadata and filter failures are fatal: without an admission
        // set the run cannot tell allowed entities from excluded ones.
        let metadata_batches = self.metadata.fetch(&self.config.partition_key).await?;
        let allowed = self.filter.allowed_ids(&metadata_batches)?;
        debug!(allowed = allowed.len(), "Built entity admission set");

        let mut paths = self.reader.list(&self.config.source_prefix).await?;
        // Lexicographic order is the batching contract: the same object
        // listing must always produce the same batch boundaries.
        paths.sort();

        stats.paths_dropped = filter::count_excluded(&paths, &allowed);

        let batches = partition_paths(&paths, self.config.batch_size);
        stats.batches_total = batches.len();
        info!(
            paths = paths.len(),
            batches = batches.len(),
            excluded_paths = stats.paths_dropped,
            "Discovered and partitioned source objects"
        );

        let mut pending: VecDeque<(u64, Vec<String>)> = VecDeque::new();
        for (index, batch) in batches.into_iter().enumerate() {
            let index = index as u64;
            if manifest.contains(index) {
                stats.record_skipped();
            } else {
                pending.push_back((index, batch));
            }
        }

        self.drain_pending(pending, &allowed, &mut manifest, &mut stats)
            .await;

        stats.complete();
        if stats.all_failed() {
            error!(
                failed = stats.batches_failed,
                "Every dispatched batch failed; nothing written this run"
            );
        }
        info!(
            completed = stats.batches_completed,
            skipped = stats.batches_skipped,
            empty = stats.batches_empty,
            failed = stats.batches_failed,
            rows = stats.rows_written,
            "Ingestion run finished"
        );

        Ok(RunSummary {
            partition_key: self.config.partition_key.clone(),
            manifest_path: manifest.path().display().to_string(),
            output_paths: manifest.output_paths(),
            stats,
        })
    }

    /// Dispatch pending batches to a pool bounded at `worker_count`.
    async fn drain_pending(
        &self,
        mut pending: VecDeque<(u64, Vec<String>)>,
        allowed: &std::collections::HashSet<String>,
        manifest: &mut Manifest,
        stats: &mut IngestStats,
    ) {
        let writer = OutputWriter::new(&self.config.output_dir);
        let ctx = Arc::new(WorkerContext {
            reader: self.reader.clone(),
            allowed: allowed.clone(),
            projection: self.config.projection(),
            timestamp_column: self.config.timestamp_column.clone(),
            measurement_columns: self.config.columns.clone(),
            policy: self.config.policy,
        });

        let mut pool: JoinSet<(u64, Result<BatchTable>)> = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, u64> = HashMap::new();

        loop {
            while pool.len() < self.config.worker_count {
                let Some((index, batch)) = pending.pop_front() else {
                    break;
                };
                let ctx = ctx.clone();
                let handle = pool.spawn(async move {
                    let result = worker::process_batch(&ctx, index, &batch).await;
                    (index, result)
                });
                in_flight.insert(handle.id(), index);
            }

            let Some(joined) = pool.join_next_with_id().await else {
                break;
            };

            match joined {
                Ok((id, (index, result))) => {
                    in_flight.remove(&id);
                    let outcome = self.settle(index, result, &writer, manifest);
                    stats.record_outcome(outcome);
                }
                Err(e) => {
                    let index = in_flight.remove(&e.id()).unwrap_or(u64::MAX);
                    error!(batch_index = index, error = %e, "Batch task aborted");
                    stats.record_outcome(BatchOutcome::Failed {
                        batch_index: index,
                        kind: "task".to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    /// Turn one batch result into an outcome, persisting on success.
    ///
    /// The output file is written before the manifest entry. If the
    /// manifest save fails the entry is rolled back in memory, leaving
    /// the index pending and the output file as a harmless orphan the
    /// next run overwrites.
    fn settle(
        &self,
        index: u64,
        result: Result<BatchTable>,
        writer: &OutputWriter,
        manifest: &mut Manifest,
    ) -> BatchOutcome {
        let table = match result {
            Ok(BatchTable::Rows(table)) => table,
            Ok(BatchTable::Empty) => {
                debug!(batch_index = index, "Batch produced no rows");
                return BatchOutcome::Empty { batch_index: index };
            }
            Err(e) => {
                warn!(batch_index = index, error = %e, kind = e.kind(), "Batch failed");
                return BatchOutcome::Failed {
                    batch_index: index,
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                };
            }
        };

        let output_path = match writer.write(&self.config.partition_key, index, &table) {
            Ok(path) => path.display().to_string(),
            Err(e) => {
                warn!(batch_index = index, error = %e, "Failed to write batch output");
                return BatchOutcome::Failed {
                    batch_index: index,
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                };
            }
        };

        let rows = table.num_rows() as u64;
        manifest.insert(ManifestEntry::new(
            index,
            output_path.clone(),
            table.entity_ids().to_vec(),
            self.config.partition_key.clone(),
            rows,
        ));
        if let Err(e) = manifest.save() {
            warn!(batch_index = index, error = %e, "Failed to persist manifest entry");
            manifest.remove(index);
            return BatchOutcome::Failed {
                batch_index: index,
                kind: e.kind().to_string(),
                message: e.to_string(),
            };
        }

        info!(batch_index = index, rows, path = %output_path, "Batch completed");
        BatchOutcome::Completed {
            batch_index: index,
            output_path,
            rows,
        }
    }
}
