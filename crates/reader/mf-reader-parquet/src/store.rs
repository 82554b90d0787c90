//! Object store construction and caching.

use mf_error::{FetchError, Result};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::config::ReaderConfig;

/// Cache key for the local filesystem object store.
const LOCAL_STORE_KEY: &str = "__local__";

/// Parse an S3 URI into bucket and key.
pub fn parse_s3_uri(uri: &str) -> Result<(String, String)> {
    let url = url::Url::parse(uri)
        .map_err(|e| FetchError::InvalidUri(format!("Invalid S3 URI '{uri}': {e}")))?;

    if url.scheme() != "s3" {
        return Err(FetchError::InvalidUri(format!("Expected s3:// URI, got: {uri}")).into());
    }

    let bucket = url
        .host_str()
        .ok_or_else(|| FetchError::InvalidUri(format!("Missing bucket in S3 URI: {uri}")))?;

    let key = url.path().trim_start_matches('/');
    if key.is_empty() {
        return Err(FetchError::InvalidUri(format!("Missing key in S3 URI: {uri}")).into());
    }

    Ok((bucket.to_string(), key.to_string()))
}

/// Cache of object stores keyed by bucket name (S3) or a local sentinel.
///
/// Reused across fetches so each worker invocation shares one store
/// handle per bucket instead of paying connection setup per object.
/// Safe for concurrent readers.
pub struct StoreCache {
    config: ReaderConfig,
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl StoreCache {
    /// Create an empty cache with the given reader configuration.
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a URI to its store and in-store path.
    ///
    /// Accepts `s3://bucket/key`, `file:///abs/path`, or a bare absolute
    /// path for local files.
    pub fn resolve(&self, uri: &str) -> Result<(Arc<dyn ObjectStore>, ObjectPath)> {
        if uri.starts_with("s3://") {
            let (bucket, key) = parse_s3_uri(uri)?;
            let store = self.get_or_create(&bucket)?;
            Ok((store, ObjectPath::from(key)))
        } else {
            let path_str = uri.strip_prefix("file://").unwrap_or(uri);
            let store = self.get_or_create(LOCAL_STORE_KEY)?;
            let path = ObjectPath::from_absolute_path(path_str).map_err(|e| {
                FetchError::InvalidUri(format!("Invalid local path '{uri}': {e}"))
            })?;
            Ok((store, path))
        }
    }

    /// Resolve a listing prefix to its store, in-store prefix path, and
    /// the URI root to prepend to listed keys ("s3://bucket" or "").
    pub fn resolve_prefix(&self, prefix: &str) -> Result<(Arc<dyn ObjectStore>, ObjectPath, String)> {
        if prefix.starts_with("s3://") {
            let (bucket, key) = parse_s3_uri(prefix)?;
            let store = self.get_or_create(&bucket)?;
            Ok((store, ObjectPath::from(key), format!("s3://{bucket}")))
        } else {
            let path_str = prefix.strip_prefix("file://").unwrap_or(prefix);
            let store = self.get_or_create(LOCAL_STORE_KEY)?;
            let path = ObjectPath::from_absolute_path(path_str).map_err(|e| {
                FetchError::InvalidUri(format!("Invalid local prefix '{prefix}': {e}"))
            })?;
            Ok((store, path, String::new()))
        }
    }

    /// Get or create an object store for the given cache key.
    fn get_or_create(&self, cache_key: &str) -> Result<Arc<dyn ObjectStore>> {
        // Fast path: read lock
        {
            let cache = self.stores.read().expect("store cache lock poisoned");
            if let Some(store) = cache.get(cache_key) {
                return Ok(Arc::clone(store));
            }
        }

        // Slow path: write lock
        let mut cache = self.stores.write().expect("store cache lock poisoned");

        // Another thread may have created it while we waited
        if let Some(store) = cache.get(cache_key) {
            return Ok(Arc::clone(store));
        }

        let store: Arc<dyn ObjectStore> = if cache_key == LOCAL_STORE_KEY {
            debug!("Creating local filesystem object store");
            Arc::new(LocalFileSystem::new())
        } else {
            debug!(bucket = cache_key, "Creating S3 object store");
            let mut builder = AmazonS3Builder::new()
                .with_bucket_name(cache_key)
                .with_region(&self.config.region);

            if let (Some(access_key), Some(secret_key)) =
                (&self.config.access_key, &self.config.secret_key)
            {
                builder = builder
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key);

                if let Some(token) = &self.config.session_token {
                    builder = builder.with_token(token);
                }
            } else {
                // No credentials: anonymous access for public buckets
                builder = builder.with_skip_signature(true);
            }

            if let Some(endpoint) = &self.config.endpoint {
                builder = builder
                    .with_endpoint(endpoint)
                    .with_allow_http(true)
                    .with_virtual_hosted_style_request(false);
            }

            let store = builder.build().map_err(|e| {
                FetchError::Io(format!("Failed to create S3 object store: {e}"))
            })?;
            Arc::new(store)
        };

        cache.insert(cache_key.to_string(), Arc::clone(&store));
        Ok(store)
    }
}

/// Map an object_store error to the fetch error taxonomy.
pub fn map_store_error(uri: &str, error: object_store::Error) -> FetchError {
    match error {
        object_store::Error::NotFound { .. } => FetchError::NotFound(uri.to_string()),
        object_store::Error::PermissionDenied { .. } | object_store::Error::Unauthenticated { .. } => {
            FetchError::AccessDenied(uri.to_string())
        }
        e => FetchError::Io(format!("{uri}: {e}")),
    }
}
