//! Main execution logic for the mf-ingest CLI.

use anyhow::Result;
use mf_ingest::orchestrator::RunSummary;
use mf_ingest::{EntityFilter, IngestConfig, Ingestor};
use mf_reader_parquet::{ParquetMetadataProvider, ReaderConfig, RetryConfig, StoreReader};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, LogLevel};

/// Initialize logging to stderr, so stdout stays clean for the summary.
///
/// `RUST_LOG` overrides the `--log-level` flag when set.
pub fn init_logging(level: LogLevel) -> Result<()> {
    let level: tracing::Level = level.into();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Execute an ingestion run with the provided arguments.
pub async fn execute(args: Cli) -> Result<RunSummary> {
    let mut reader_config = ReaderConfig::new(&args.region)
        .with_fetch_timeout_secs(args.fetch_timeout)
        .with_retry(RetryConfig::new().with_max_retries(args.max_retries));

    if let Some(ref endpoint) = args.endpoint {
        reader_config = reader_config.with_endpoint(endpoint);
    }
    if let (Some(access_key), Some(secret_key)) = (&args.access_key, &args.secret_key) {
        reader_config =
            reader_config.with_credentials(access_key, secret_key, args.session_token.clone());
    }

    let reader = Arc::new(StoreReader::new(reader_config));

    let mut metadata_columns = vec![args.id_column.clone()];
    metadata_columns.extend(args.attribute_columns.iter().cloned());
    let metadata = ParquetMetadataProvider::new(reader.clone(), &args.metadata_path)
        .with_columns(metadata_columns);

    let filter = EntityFilter::new(&args.id_column)
        .with_attribute_columns(args.attribute_columns.clone())
        .with_allowed_values(args.allowed_values.iter().cloned());

    let config = IngestConfig::new(&args.partition_key, &args.source_prefix, &args.output_dir)
        .with_columns(args.columns.clone())
        .with_timestamp_column(&args.timestamp_column)
        .with_policy(args.policy.into())
        .with_batch_size(args.batch_size)
        .with_worker_count(args.workers);
    config.validate().map_err(|e| anyhow::anyhow!("{e}"))?;

    let ingestor = Ingestor::new(config, filter, reader, metadata);
    let summary = ingestor.run().await?;
    Ok(summary)
}
