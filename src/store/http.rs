use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use tracing::warn;
use url::Url;

use crate::config::ClientOptions;
use crate::error::StoreError;

use super::{GetOptions, GetResult, ObjectMeta, ObjectStore, RangeSpec};

/// Response headers forwarded into [`GetResult::attributes`] when present.
const FORWARDED_HEADERS: &[&str] = &[
    "etag",
    "content-type",
    "cache-control",
    "content-encoding",
    "content-language",
    "content-disposition",
];

/// HTTP(S)-backed object store.
///
/// Serves generic HTTP endpoints that support range requests (THREDDS
/// servers, plain file hosting, CDN-fronted archives). Paths are resolved
/// relative to the base URL. Listing is not available over plain HTTP, so
/// this store implements only [`ObjectStore`].
///
/// Range translation: the store's half-open `[start, end)` ranges map to the
/// inclusive `Range: bytes=start-(end-1)` header.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    base_path: Option<String>,
}

impl HttpStore {
    /// Create a store rooted at `base_url`.
    ///
    /// The URL's path becomes the store's advertised [`ObjectStore::prefix`],
    /// which the registry strips from resolved paths.
    pub fn new(base_url: &str, options: ClientOptions) -> Result<Self, StoreError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| StoreError::Transport(format!("invalid base url `{base_url}`: {e}")))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &options.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| StoreError::Transport(format!("invalid header name `{name}`: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| StoreError::Transport(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let base_path = match parsed.path().trim_matches('/') {
            "" => None,
            path => Some(path.to_string()),
        };

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            base_path,
        })
    }

    /// The base URL this store is rooted at.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn map_status(&self, path: &str, status: StatusCode) -> Option<StoreError> {
        match status {
            StatusCode::NOT_FOUND => Some(StoreError::NotFound(self.build_url(path))),
            StatusCode::PRECONDITION_FAILED => Some(StoreError::Precondition {
                path: path.to_string(),
                reason: "if-match condition failed".to_string(),
            }),
            StatusCode::NOT_MODIFIED => Some(StoreError::Precondition {
                path: path.to_string(),
                reason: "if-none-match condition failed".to_string(),
            }),
            s if !s.is_success() => Some(StoreError::Transport(format!(
                "request for `{}` failed with status {s}",
                self.build_url(path)
            ))),
            _ => None,
        }
    }

    fn meta_from_headers(&self, path: &str, headers: &HeaderMap, body_len: u64) -> ObjectMeta {
        ObjectMeta {
            path: path.to_string(),
            size: resolve_size(headers, body_len),
            last_modified: parse_last_modified(headers),
            e_tag: header_str(headers, header::ETAG),
            version: None,
        }
    }

    async fn send_get(
        &self,
        path: &str,
        options: &GetOptions,
    ) -> Result<reqwest::Response, StoreError> {
        let mut request = self.client.get(self.build_url(path));
        if let Some(range) = options.range {
            request = request.header(header::RANGE, range_header(range));
        }
        if let Some(etag) = &options.if_match {
            request = request.header(header::IF_MATCH, etag.as_str());
        }
        if let Some(etag) = &options.if_none_match {
            request = request.header(header::IF_NONE_MATCH, etag.as_str());
        }
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        if let Some(err) = self.map_status(path, response.status()) {
            return Err(err);
        }
        Ok(response)
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn get_opts(&self, path: &str, options: GetOptions) -> Result<GetResult, StoreError> {
        let response = self.send_get(path, &options).await?;
        let headers = response.headers().clone();
        let attributes = forwarded_attributes(&headers);
        let body = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let meta = self.meta_from_headers(path, &headers, body.len() as u64);
        let range = match options.range {
            Some(range) => range.as_range(),
            None => 0..meta.size,
        };

        let mut result = GetResult::new(body, meta, range);
        result.attributes = attributes;
        Ok(result)
    }

    async fn get_range(&self, path: &str, range: RangeSpec) -> Result<Bytes, StoreError> {
        if range.is_empty() {
            return Ok(Bytes::new());
        }

        let options = GetOptions {
            range: Some(range),
            ..Default::default()
        };
        let response = self.send_get(path, &options).await?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let requested = range.len() as usize;
        if status == StatusCode::OK && body.len() as u64 > range.len() {
            // Server ignored the Range header and returned the whole object.
            let start = range.start() as usize;
            if start + requested > body.len() {
                return Err(StoreError::OutOfRange {
                    path: path.to_string(),
                    start: range.start(),
                    end: range.end(),
                    size: body.len() as u64,
                });
            }
            return Ok(body.slice(start..start + requested));
        }
        if body.len() > requested {
            warn!(
                path,
                requested,
                received = body.len(),
                "range response longer than requested, truncating"
            );
            return Ok(body.slice(0..requested));
        }
        Ok(body)
    }

    async fn head(&self, path: &str) -> Result<ObjectMeta, StoreError> {
        let response = self
            .client
            .head(self.build_url(path))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        if let Some(err) = self.map_status(path, response.status()) {
            return Err(err);
        }
        Ok(self.meta_from_headers(path, response.headers(), 0))
    }

    fn prefix(&self) -> Option<&str> {
        self.base_path.as_deref()
    }
}

/// Translate a half-open range into an inclusive HTTP `Range` header value.
fn range_header(range: RangeSpec) -> String {
    format!("bytes={}-{}", range.start(), range.end() - 1)
}

/// Total object size from a `Content-Range` header (`bytes 0-99/1234`).
///
/// Returns `None` for a `*` total (size unknown) or a malformed value.
fn content_range_total(value: &str) -> Option<u64> {
    let total = value.rsplit('/').next()?;
    total.trim().parse().ok()
}

/// Resolve the object size from response headers, preferring the
/// `Content-Range` total and falling back to `Content-Length` (the chunk
/// size) and then the body length.
fn resolve_size(headers: &HeaderMap, body_len: u64) -> u64 {
    if let Some(value) = header_str(headers, header::CONTENT_RANGE) {
        if let Some(total) = content_range_total(&value) {
            return total;
        }
        // `*` total: size unknown, fall through to the chunk size.
    }
    header_str(headers, header::CONTENT_LENGTH)
        .and_then(|v| v.parse().ok())
        .unwrap_or(body_len)
}

/// Parse `Last-Modified` (RFC 1123); malformed values fall back to now.
fn parse_last_modified(headers: &HeaderMap) -> DateTime<Utc> {
    match header_str(headers, header::LAST_MODIFIED) {
        Some(value) => match DateTime::parse_from_rfc2822(&value) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(e) => {
                warn!(value = %value, error = %e, "malformed Last-Modified header");
                Utc::now()
            }
        },
        None => Utc::now(),
    }
}

fn forwarded_attributes(headers: &HeaderMap) -> std::collections::HashMap<String, String> {
    FORWARDED_HEADERS
        .iter()
        .filter_map(|&name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect()
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
