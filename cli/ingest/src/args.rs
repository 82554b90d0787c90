//! CLI argument definitions for mf-ingest.

use clap::{Parser, ValueEnum};
use mf_types::ReductionPolicy;

/// Resumable ingestion of one partition of per-entity load time series.
///
/// Lists the partition's parquet objects, filters entities against the
/// partition metadata table, and reduces each entity's series to hourly
/// values in fixed-size batches. Completed batches are recorded in a
/// manifest next to the outputs, so re-running the same command resumes
/// instead of repeating work.
///
/// ## Examples
///
/// Local data, sum reduction:
///   mf-ingest -p upgrade0 -s /data/timeseries -o /data/out \
///     --metadata-path "/data/meta/{key}.parquet" -c net_energy
///
/// Public S3 bucket, mean reduction:
///   mf-ingest -p upgrade0 -s s3://my-bucket/timeseries/upgrade0 \
///     --metadata-path "s3://my-bucket/meta/{key}.parquet" \
///     -c net_energy,pv_energy --policy mean -o ./out
#[derive(Parser, Debug)]
#[command(name = "mf-ingest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    // === Partition ===
    /// Partition key identifying the slice to ingest
    #[arg(short = 'p', long)]
    pub partition_key: String,

    /// Prefix (local directory or s3:// URI) holding the partition's objects
    #[arg(short = 's', long)]
    pub source_prefix: String,

    /// Metadata table path template; `{key}` is replaced by the partition key
    #[arg(long)]
    pub metadata_path: String,

    // === Aggregation ===
    /// Measurement columns to aggregate
    #[arg(short = 'c', long, value_delimiter = ',', required = true)]
    pub columns: Vec<String>,

    /// Timestamp column in the source objects
    #[arg(long, default_value = "timestamp")]
    pub timestamp_column: String,

    /// Hourly reduction policy
    #[arg(long, value_enum, default_value = "sum")]
    pub policy: Policy,

    // === Entity filter ===
    /// Entity id column in the metadata table
    #[arg(long, default_value = "bldg_id")]
    pub id_column: String,

    /// Metadata attribute columns the filter checks
    #[arg(long, value_delimiter = ',')]
    pub attribute_columns: Vec<String>,

    /// Attribute values that admit an entity (all checked columns must match)
    #[arg(long, value_delimiter = ',')]
    pub allowed_values: Vec<String>,

    // === Output ===
    /// Directory for batch outputs and the manifest
    #[arg(short = 'o', long)]
    pub output_dir: String,

    /// Paths per batch (must be >= 1)
    #[arg(long, default_value = "100", value_parser = parse_positive_usize)]
    pub batch_size: usize,

    /// Concurrent batch workers (must be >= 1)
    #[arg(short = 't', long, default_value_t = default_workers(), value_parser = parse_positive_usize)]
    pub workers: usize,

    // === Store access ===
    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Custom S3 endpoint URL (for MinIO / LocalStack)
    #[arg(long, env = "MF_S3_ENDPOINT")]
    pub endpoint: Option<String>,

    /// AWS access key ID (anonymous access when omitted)
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub access_key: Option<String>,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY")]
    pub secret_key: Option<String>,

    /// AWS session token
    #[arg(long, env = "AWS_SESSION_TOKEN")]
    pub session_token: Option<String>,

    /// Per-object fetch timeout in seconds
    #[arg(long, default_value = "300")]
    pub fetch_timeout: u64,

    /// Maximum retries per object fetch
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    // === Logging ===
    /// Log level (logs go to stderr; stdout carries the run summary)
    #[arg(short = 'l', long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Policy {
    Sum,
    Mean,
}

impl From<Policy> for ReductionPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Sum => ReductionPolicy::Sum,
            Policy::Mean => ReductionPolicy::Mean,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if value == 0 {
        return Err("must be >= 1".to_string());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_args_parse() {
        let cli = Cli::parse_from([
            "mf-ingest",
            "-p",
            "upgrade0",
            "-s",
            "/data/ts",
            "--metadata-path",
            "/data/meta/{key}.parquet",
            "-c",
            "net_energy,pv_energy",
            "-o",
            "/data/out",
        ]);

        assert_eq!(cli.partition_key, "upgrade0");
        assert_eq!(cli.columns, vec!["net_energy", "pv_energy"]);
        assert_eq!(cli.timestamp_column, "timestamp");
        assert!(matches!(cli.policy, Policy::Sum));
        assert_eq!(cli.batch_size, 100);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = Cli::try_parse_from([
            "mf-ingest",
            "-p",
            "k",
            "-s",
            "/d",
            "--metadata-path",
            "/m/{key}.parquet",
            "-c",
            "net_energy",
            "-o",
            "/o",
            "--batch-size",
            "0",
        ]);
        assert!(result.is_err());
    }
}
