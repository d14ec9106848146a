use async_trait::async_trait;
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::StoreError;

use super::{GetOptions, GetResult, ObjectList, ObjectMeta, ObjectStore, RangeSpec};

/// S3-backed object store.
///
/// Reads objects from S3 or S3-compatible storage (MinIO, GCS interop, etc.)
/// using HTTP range requests. An optional `prefix` scopes the store to a key
/// prefix within the bucket; the registry strips it from resolved paths via
/// [`ObjectStore::prefix`].
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3Store {
    /// Create a store for the given bucket over an existing client.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: None,
        }
    }

    /// Create a store for the given bucket from ambient AWS configuration
    /// (environment, shared credentials file, instance metadata).
    pub async fn connect(bucket: impl Into<String>, region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;
        Self::new(Client::new(&config), bucket)
    }

    /// Create a store against an S3-compatible endpoint (MinIO, LocalStack).
    ///
    /// Path-style addressing is enabled; such services usually require it.
    pub async fn connect_to_endpoint(
        endpoint_url: &str,
        bucket: impl Into<String>,
        region: &str,
    ) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .endpoint_url(endpoint_url)
            .load()
            .await;
        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&config)
                .force_path_style(true)
                .build(),
        );
        Self::new(client, bucket)
    }

    /// Scope the store to a key prefix within the bucket.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = prefix.trim_matches('/');
        self.prefix = (!prefix.is_empty()).then(|| prefix.to_string());
        self
    }

    /// The bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn full_key(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{path}"),
            None => path.to_string(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.full_key(path))
    }

    /// Map an S3 SDK error, classifying missing objects and failed
    /// preconditions.
    fn map_sdk_error<E>(&self, path: &str, err: aws_sdk_s3::error::SdkError<E>) -> StoreError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let status = err.raw_response().map(|r| r.status().as_u16());
        match status {
            Some(404) => return StoreError::NotFound(self.object_url(path)),
            Some(412) => {
                return StoreError::Precondition {
                    path: path.to_string(),
                    reason: "if-match condition failed".to_string(),
                }
            }
            Some(304) => {
                return StoreError::Precondition {
                    path: path.to_string(),
                    reason: "if-none-match condition failed".to_string(),
                }
            }
            _ => {}
        }

        // Fallback: some S3-compatible services report missing keys only in
        // the error text.
        let text = err.to_string();
        if text.contains("NotFound") || text.contains("NoSuchKey") || text.contains("404") {
            return StoreError::NotFound(self.object_url(path));
        }
        StoreError::Transport(text)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get_opts(&self, path: &str, options: GetOptions) -> Result<GetResult, StoreError> {
        let mut request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.full_key(path));
        if let Some(range) = options.range {
            request = request.range(range_header(range));
        }
        if let Some(etag) = &options.if_match {
            request = request.if_match(etag);
        }
        if let Some(etag) = &options.if_none_match {
            request = request.if_none_match(etag);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_sdk_error(path, e))?;

        let size = response
            .content_range()
            .and_then(content_range_total)
            .or_else(|| response.content_length().map(|l| l as u64));
        let meta = ObjectMeta {
            path: path.to_string(),
            size: size.unwrap_or(0),
            last_modified: to_chrono(response.last_modified().copied()),
            e_tag: response.e_tag().map(str::to_string),
            version: response.version_id().map(str::to_string),
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?
            .into_bytes();

        let range = match options.range {
            Some(range) => range.as_range(),
            None => 0..meta.size,
        };
        Ok(GetResult::new(data, meta, range))
    }

    async fn get_range(&self, path: &str, range: RangeSpec) -> Result<Bytes, StoreError> {
        if range.is_empty() {
            return Ok(Bytes::new());
        }

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.full_key(path))
            .range(range_header(range))
            .send()
            .await
            .map_err(|e| self.map_sdk_error(path, e))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?
            .into_bytes();
        Ok(data)
    }

    async fn head(&self, path: &str) -> Result<ObjectMeta, StoreError> {
        let response = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.full_key(path))
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    StoreError::NotFound(self.object_url(path))
                } else {
                    self.map_sdk_error(path, e)
                }
            })?;

        Ok(ObjectMeta {
            path: path.to_string(),
            size: response.content_length().unwrap_or(0) as u64,
            last_modified: to_chrono(response.last_modified().copied()),
            e_tag: response.e_tag().map(str::to_string),
            version: response.version_id().map(str::to_string),
        })
    }

    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

#[async_trait]
impl ObjectList for S3Store {
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>, StoreError> {
        let list_prefix = prefix.map(|p| self.full_key(p));
        let strip = self.prefix.as_ref().map(|p| format!("{p}/"));

        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .max_keys(1000)
                .set_prefix(list_prefix.clone());
            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let result = request
                .send()
                .await
                .map_err(|e| StoreError::Transport(e.to_string()))?;

            for obj in result.contents() {
                let Some(key) = obj.key() else { continue };
                // Report paths relative to the store's own prefix.
                let path = match &strip {
                    Some(strip) => match key.strip_prefix(strip.as_str()) {
                        Some(rest) => rest,
                        None => continue,
                    },
                    None => key,
                };
                objects.push(ObjectMeta {
                    path: path.to_string(),
                    size: obj.size().unwrap_or(0) as u64,
                    last_modified: to_chrono(obj.last_modified().copied()),
                    e_tag: obj.e_tag().map(str::to_string),
                    version: None,
                });
            }

            if result.is_truncated() == Some(true) {
                continuation_token = result.next_continuation_token().map(str::to_string);
            } else {
                break;
            }
        }

        debug!(bucket = %self.bucket, count = objects.len(), "listed objects");
        Ok(objects)
    }
}

/// Build an inclusive `bytes=start-end` header from a half-open range.
fn range_header(range: RangeSpec) -> String {
    format!("bytes={}-{}", range.start(), range.end() - 1)
}

/// Total object size from a `Content-Range` header value.
fn content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

fn to_chrono(timestamp: Option<aws_sdk_s3::primitives::DateTime>) -> DateTime<Utc> {
    timestamp
        .and_then(|t| t.to_millis().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}
