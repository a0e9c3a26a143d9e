//! Cache abstractions for storing downloaded assets between sessions.
//!
//! This module provides a `Cache` trait and implementations keyed by asset
//! URL. Every cache is best-effort: a `put` is not guaranteed to be visible
//! to a later `get`, and callers treat absence or failure as a signal to go
//! to the network rather than as an error.
//!
//! # Implementations
//!
//! - [`MemoryCache`]: In-memory cache with optional size limits
//! - [`FilesystemCache`]: Disk-based cache (native only)
//! - [`NoCache`]: Passthrough implementation that caches nothing

use crate::error::{Error, Result};
use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, RwLock},
};

/// Namespace under which persistent cache entries are stored.
pub const CACHE_NAMESPACE: &str = "modelCache_v1";

/// Future type for cache get operations.
pub type GetFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>>> + Send + 'a>>;

/// Future type for cache put/remove operations.
pub type CacheFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Future type for cache contains operations.
pub type ContainsFuture<'a> = Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

/// A cache for storing downloaded asset blobs.
///
/// The cache is keyed by URL and stores raw bytes. Entries are never mutated
/// in place; a second `put` for the same URL replaces the blob.
pub trait Cache: Send + Sync {
    /// Get data from the cache.
    ///
    /// Returns `Ok(Some(data))` if the data is cached, `Ok(None)` if not cached,
    /// or an error if the cache operation failed.
    fn get(&self, url: &str) -> GetFuture<'_>;

    /// Store data in the cache.
    fn put(&self, url: &str, data: Vec<u8>) -> CacheFuture<'_>;

    /// Check if data exists in the cache without retrieving it.
    fn contains(&self, url: &str) -> ContainsFuture<'_>;

    /// Remove data from the cache.
    fn remove(&self, url: &str) -> CacheFuture<'_>;

    /// Clear all cached data.
    fn clear(&self) -> CacheFuture<'_>;
}

impl<C: Cache + ?Sized> Cache for Arc<C> {
    fn get(&self, url: &str) -> GetFuture<'_> {
        (**self).get(url)
    }

    fn put(&self, url: &str, data: Vec<u8>) -> CacheFuture<'_> {
        (**self).put(url, data)
    }

    fn contains(&self, url: &str) -> ContainsFuture<'_> {
        (**self).contains(url)
    }

    fn remove(&self, url: &str) -> CacheFuture<'_> {
        (**self).remove(url)
    }

    fn clear(&self) -> CacheFuture<'_> {
        (**self).clear()
    }
}

/// A cache that stores nothing (passthrough).
#[derive(Debug, Clone, Default)]
pub struct NoCache;

impl NoCache {
    /// Create a new no-op cache.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Cache for NoCache {
    fn get(&self, _url: &str) -> GetFuture<'_> {
        Box::pin(async { Ok(None) })
    }

    fn put(&self, _url: &str, _data: Vec<u8>) -> CacheFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    fn contains(&self, _url: &str) -> ContainsFuture<'_> {
        Box::pin(async { Ok(false) })
    }

    fn remove(&self, _url: &str) -> CacheFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    fn clear(&self) -> CacheFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

/// An in-memory cache.
///
/// The cache has an optional maximum size in bytes. When the limit is exceeded,
/// the oldest entries are evicted, which is how platform eviction shows up in
/// tests.
#[derive(Debug)]
pub struct MemoryCache {
    data: Arc<RwLock<MemoryCacheInner>>,
    max_size: Option<usize>,
}

#[derive(Debug, Default)]
struct MemoryCacheInner {
    entries: HashMap<String, Vec<u8>>,
    /// Insertion order for eviction.
    order: Vec<String>,
    current_size: usize,
}

fn poisoned(operation: &'static str) -> Error {
    Error::Cache {
        operation,
        message: "lock poisoned".to_string(),
    }
}

impl MemoryCache {
    /// Create a new memory cache with no size limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(MemoryCacheInner::default())),
            max_size: None,
        }
    }

    /// Create a new memory cache with a maximum size in bytes.
    #[must_use]
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(MemoryCacheInner::default())),
            max_size: Some(max_size),
        }
    }

    /// Get the current size of cached data in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.read().map_or(0, |d| d.current_size)
    }

    /// Get the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().map_or(0, |d| d.entries.len())
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put_sync(&self, url: &str, data: Vec<u8>) -> Result<()> {
        let mut cache = self.data.write().map_err(|_| poisoned("put"))?;

        if let Some(old_data) = cache.entries.remove(url) {
            cache.current_size -= old_data.len();
            cache.order.retain(|k| k != url);
        }

        let data_size = data.len();

        if let Some(max_size) = self.max_size {
            while cache.current_size + data_size > max_size && !cache.order.is_empty() {
                let oldest = cache.order.remove(0);
                if let Some(old_data) = cache.entries.remove(&oldest) {
                    cache.current_size -= old_data.len();
                }
            }
            // A blob larger than the whole cache is dropped, not stored.
            if data_size > max_size {
                tracing::debug!(url, data_size, max_size, "blob exceeds cache size, not stored");
                return Ok(());
            }
        }

        cache.entries.insert(url.to_string(), data);
        cache.order.push(url.to_string());
        cache.current_size += data_size;
        Ok(())
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryCache {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            max_size: self.max_size,
        }
    }
}

impl Cache for MemoryCache {
    fn get(&self, url: &str) -> GetFuture<'_> {
        let result = self
            .data
            .read()
            .map(|data| data.entries.get(url).cloned())
            .map_err(|_| poisoned("get"));
        Box::pin(async move { result })
    }

    fn put(&self, url: &str, data: Vec<u8>) -> CacheFuture<'_> {
        let result = self.put_sync(url, data);
        Box::pin(async move { result })
    }

    fn contains(&self, url: &str) -> ContainsFuture<'_> {
        let result = self
            .data
            .read()
            .map(|data| data.entries.contains_key(url))
            .map_err(|_| poisoned("contains"));
        Box::pin(async move { result })
    }

    fn remove(&self, url: &str) -> CacheFuture<'_> {
        let result = self
            .data
            .write()
            .map(|mut cache| {
                if let Some(data) = cache.entries.remove(url) {
                    cache.current_size -= data.len();
                    cache.order.retain(|k| k != url);
                }
            })
            .map_err(|_| poisoned("remove"));
        Box::pin(async move { result })
    }

    fn clear(&self) -> CacheFuture<'_> {
        let result = self
            .data
            .write()
            .map(|mut cache| {
                cache.entries.clear();
                cache.order.clear();
                cache.current_size = 0;
            })
            .map_err(|_| poisoned("clear"));
        Box::pin(async move { result })
    }
}

#[cfg(not(target_family = "wasm"))]
pub use filesystem::FilesystemCache;

#[cfg(not(target_family = "wasm"))]
mod filesystem {
    use std::io;
    use std::path::{Path, PathBuf};

    use sha2::{Digest, Sha256};

    use super::{CACHE_NAMESPACE, Cache, CacheFuture, ContainsFuture, GetFuture};
    use crate::error::Error;

    /// A disk-based cache storing one file per URL.
    ///
    /// Files live under `<root>/modelCache_v1/` and are named by the SHA-256
    /// of the URL. Writes go to a temporary file first and are renamed into
    /// place, so a reader never observes a partial blob.
    #[derive(Debug, Clone)]
    pub struct FilesystemCache {
        dir: PathBuf,
    }

    fn io_error(operation: &'static str) -> impl Fn(io::Error) -> Error {
        move |e| Error::Cache {
            operation,
            message: e.to_string(),
        }
    }

    impl FilesystemCache {
        /// Create a cache rooted at the given directory.
        ///
        /// The directory is created lazily on first `put`.
        #[must_use]
        pub fn new(root: impl AsRef<Path>) -> Self {
            Self {
                dir: root.as_ref().join(CACHE_NAMESPACE),
            }
        }

        /// The namespaced directory holding the cache entries.
        #[must_use]
        pub fn dir(&self) -> &Path {
            &self.dir
        }

        fn path_for(&self, url: &str) -> PathBuf {
            let digest = Sha256::digest(url.as_bytes());
            let name: String = digest.iter().map(|b| format!("{b:02x}")).collect();
            self.dir.join(name)
        }
    }

    impl Cache for FilesystemCache {
        fn get(&self, url: &str) -> GetFuture<'_> {
            let path = self.path_for(url);
            Box::pin(async move {
                match tokio::fs::read(&path).await {
                    Ok(data) => Ok(Some(data)),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(io_error("get")(e)),
                }
            })
        }

        fn put(&self, url: &str, data: Vec<u8>) -> CacheFuture<'_> {
            let path = self.path_for(url);
            let tmp = path.with_extension("tmp");
            Box::pin(async move {
                tokio::fs::create_dir_all(&self.dir)
                    .await
                    .map_err(io_error("put"))?;
                tokio::fs::write(&tmp, data).await.map_err(io_error("put"))?;
                tokio::fs::rename(&tmp, &path)
                    .await
                    .map_err(io_error("put"))
            })
        }

        fn contains(&self, url: &str) -> ContainsFuture<'_> {
            let path = self.path_for(url);
            Box::pin(async move { tokio::fs::try_exists(&path).await.map_err(io_error("contains")) })
        }

        fn remove(&self, url: &str) -> CacheFuture<'_> {
            let path = self.path_for(url);
            Box::pin(async move {
                match tokio::fs::remove_file(&path).await {
                    Err(e) if e.kind() != io::ErrorKind::NotFound => Err(io_error("remove")(e)),
                    _ => Ok(()),
                }
            })
        }

        fn clear(&self) -> CacheFuture<'_> {
            Box::pin(async move {
                match tokio::fs::remove_dir_all(&self.dir).await {
                    Err(e) if e.kind() != io::ErrorKind::NotFound => Err(io_error("clear")(e)),
                    _ => Ok(()),
                }
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_filesystem_cache_round_trip() {
            let root = tempfile::tempdir().unwrap();
            let cache = FilesystemCache::new(root.path());

            assert_eq!(cache.get("https://a/model.glb").await.unwrap(), None);
            assert!(!cache.contains("https://a/model.glb").await.unwrap());

            cache
                .put("https://a/model.glb", vec![9, 8, 7])
                .await
                .unwrap();
            assert_eq!(
                cache.get("https://a/model.glb").await.unwrap(),
                Some(vec![9, 8, 7])
            );
            assert!(cache.dir().ends_with(CACHE_NAMESPACE));

            cache.remove("https://a/model.glb").await.unwrap();
            assert_eq!(cache.get("https://a/model.glb").await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_filesystem_cache_clear_missing_dir() {
            let root = tempfile::tempdir().unwrap();
            let cache = FilesystemCache::new(root.path().join("never-created"));
            cache.clear().await.unwrap();
            cache.remove("https://a").await.unwrap();
        }

        #[tokio::test]
        async fn test_filesystem_cache_distinct_urls() {
            let root = tempfile::tempdir().unwrap();
            let cache = FilesystemCache::new(root.path());
            cache.put("https://a", vec![1]).await.unwrap();
            cache.put("https://b", vec![2]).await.unwrap();
            assert_eq!(cache.get("https://a").await.unwrap(), Some(vec![1]));
            assert_eq!(cache.get("https://b").await.unwrap(), Some(vec![2]));

            cache.clear().await.unwrap();
            assert!(!cache.contains("https://a").await.unwrap());
        }
    }
}
