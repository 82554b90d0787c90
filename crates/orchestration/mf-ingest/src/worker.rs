//! Per-batch fetch-and-aggregate work, executed inside the worker pool.

use crate::aggregate::{self, PathSeries};
use crate::filter;
use mf_error::Result;
use mf_traits::ObjectReader;
use mf_types::{entity_id_from_path, BatchTable, ReductionPolicy};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Everything a worker needs besides the batch itself. Shared across
/// workers behind an `Arc` by the orchestrator.
pub(crate) struct WorkerContext<R: ?Sized> {
    pub reader: std::sync::Arc<R>,
    pub allowed: HashSet<String>,
    pub projection: Vec<String>,
    pub timestamp_column: String,
    pub measurement_columns: Vec<String>,
    pub policy: ReductionPolicy,
}

/// Fetch and reduce every allowed path in one batch.
///
/// Paths whose entity is not in the allowed set are skipped before any
/// fetch. A fetch or parse failure on one path drops that path and
/// continues; only the paths that survive contribute rows. A batch with
/// no surviving rows is reported as [`BatchTable::Empty`].
pub(crate) async fn process_batch<R>(
    ctx: &WorkerContext<R>,
    batch_index: u64,
    paths: &[String],
) -> Result<BatchTable>
where
    R: ObjectReader + ?Sized,
{
    let mut series: Vec<PathSeries> = Vec::with_capacity(paths.len());

    for path in paths {
        if !filter::path_allowed(path, &ctx.allowed) {
            debug!(batch_index, path = %path, "entity excluded, skipping path");
            continue;
        }

        // path_allowed already proved the id derives
        let entity_id = match entity_id_from_path(path) {
            Ok(id) => id,
            Err(_) => continue,
        };

        let batches = match ctx.reader.read(path, &ctx.projection).await {
            Ok(batches) => batches,
            Err(e) => {
                warn!(
                    batch_index,
                    path = %path,
                    error = %e,
                    kind = e.kind(),
                    "dropping path from batch"
                );
                continue;
            }
        };

        match aggregate::aggregate_hourly(
            &entity_id,
            &batches,
            &ctx.timestamp_column,
            &ctx.measurement_columns,
            ctx.policy,
        ) {
            Ok(reduced) if reduced.num_rows() > 0 => series.push(reduced),
            Ok(_) => {
                debug!(batch_index, path = %path, "path produced no rows");
            }
            Err(e) => {
                warn!(
                    batch_index,
                    path = %path,
                    error = %e,
                    kind = e.kind(),
                    "dropping path from batch"
                );
            }
        }
    }

    if series.is_empty() {
        return Ok(BatchTable::Empty);
    }

    let table = aggregate::build_table(series, &ctx.measurement_columns)?;
    Ok(BatchTable::Rows(table))
}
