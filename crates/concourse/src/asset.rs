//! The parsed facility model handed to the scene host.

use std::sync::Arc;

use crate::error::Result;
use crate::glb::{GlbDocument, parse_glb};

/// Where a ready asset's bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    /// Read from the persistent cache.
    Cache,
    /// Downloaded from the network.
    Network,
}

/// An immutable, validated 3D asset keyed by URL.
///
/// Cloning is cheap: the raw bytes are shared.
#[derive(Debug, Clone)]
pub struct Asset {
    url: String,
    bytes: Arc<[u8]>,
    document: Arc<GlbDocument>,
}

impl Asset {
    /// Parse raw bytes into an asset.
    pub fn parse(url: &str, bytes: Vec<u8>) -> Result<Self> {
        let document = parse_glb(&bytes)?;
        Ok(Self {
            url: url.to_string(),
            bytes: bytes.into(),
            document: Arc::new(document),
        })
    }

    /// The URL this asset was loaded from.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The raw container bytes.
    #[must_use]
    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    /// The decoded container.
    #[must_use]
    pub fn document(&self) -> &GlbDocument {
        &self.document
    }
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.bytes == other.bytes && self.document == other.document
    }
}
