//! Byte transport for downloading assets with progress reporting.

use std::future::Future;
use std::pin::Pin;

use crate::error::{Error, Result};

/// Callback receiving `(bytes_received, bytes_total)` as a transfer advances.
///
/// `bytes_total` is `None` when the server did not announce a length.
pub type ProgressFn<'a> = &'a mut (dyn FnMut(u64, Option<u64>) + Send);

/// Future type for fetch operations.
#[cfg(not(target_family = "wasm"))]
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

/// Future type for fetch operations.
///
/// Browser fetch futures are not `Send`; the browser is single-threaded.
#[cfg(target_family = "wasm")]
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + 'a>>;

/// Something that can download a URL into memory.
pub trait Transport: Send + Sync {
    /// Download the whole body of `url`, reporting byte-level progress.
    fn fetch<'a>(&'a self, url: &'a str, on_progress: ProgressFn<'a>) -> FetchFuture<'a>;
}

/// HTTP transport backed by `reqwest`.
///
/// `reqwest::Client` is `Arc`-based, so clones share the same connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for HttpTransport {
    fn fetch<'a>(&'a self, url: &'a str, on_progress: ProgressFn<'a>) -> FetchFuture<'a> {
        Box::pin(async move {
            let http_error = |e: reqwest::Error| Error::Http {
                url: url.to_string(),
                message: e.to_string(),
            };

            let response = self.http.get(url).send().await.map_err(http_error)?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let total = response.content_length().filter(|&len| len > 0);
            on_progress(0, total);
            read_body(url, response, total, on_progress).await
        })
    }
}

/// Stream the body chunk by chunk so progress advances during the transfer.
#[cfg(not(target_family = "wasm"))]
async fn read_body(
    url: &str,
    mut response: reqwest::Response,
    total: Option<u64>,
    on_progress: ProgressFn<'_>,
) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(
        total
            .and_then(|t| usize::try_from(t).ok())
            .unwrap_or_default(),
    );
    while let Some(chunk) = response.chunk().await.map_err(|e| Error::Http {
        url: url.to_string(),
        message: e.to_string(),
    })? {
        data.extend_from_slice(&chunk);
        tracing::debug!(url, received = data.len(), ?total, "chunk");
        on_progress(data.len() as u64, total);
    }
    Ok(data)
}

/// The browser buffers the body; progress jumps straight to the end.
#[cfg(target_family = "wasm")]
async fn read_body(
    url: &str,
    response: reqwest::Response,
    total: Option<u64>,
    on_progress: ProgressFn<'_>,
) -> Result<Vec<u8>> {
    let data = response.bytes().await.map_err(|e| Error::Http {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    on_progress(data.len() as u64, total);
    Ok(data.to_vec())
}

