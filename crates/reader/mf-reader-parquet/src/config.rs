//! Configuration for the store reader.

use crate::retry::RetryConfig;

/// Configuration for [`StoreReader`](crate::StoreReader).
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// AWS region for S3 access
    pub region: String,

    /// Optional S3 endpoint URL (for LocalStack)
    pub endpoint: Option<String>,

    /// Optional AWS access key ID; anonymous access when absent
    pub access_key: Option<String>,

    /// Optional AWS secret access key
    pub secret_key: Option<String>,

    /// Optional AWS session token (for temporary credentials)
    pub session_token: Option<String>,

    /// Rows per decoded RecordBatch
    pub batch_size: usize,

    /// Per-attempt fetch timeout in seconds
    pub fetch_timeout_secs: u64,

    /// Retry behavior for transient fetch failures
    pub retry: RetryConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            session_token: None,
            batch_size: 8192,
            fetch_timeout_secs: 300,
            retry: RetryConfig::default(),
        }
    }
}

impl ReaderConfig {
    /// Create a new configuration for the given region.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Default::default()
        }
    }

    /// Set the S3 endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set explicit AWS credentials.
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self.session_token = session_token;
        self
    }

    /// Set the rows-per-batch decode size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the per-attempt fetch timeout in seconds.
    pub fn with_fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    /// Set the retry behavior.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}
