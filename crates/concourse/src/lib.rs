//! Core of a facility-map viewer: asset loading, POI search and camera choreography.
//!
//! This crate holds everything the viewer does that is not rendering. It
//! downloads and caches the facility model, synthesizes a smooth progress
//! stream for the loading screen, filters points of interest against a search
//! query, and animates the camera between an overview and individual points of
//! interest.
//!
//! # Design principles
//!
//! - **Web-compatible**: Works on desktop and WASM via reqwest
//! - **Runtime-agnostic**: The load pipeline is a plain future; spawn it on any executor
//! - **Frame-driven**: Progress ramps and camera flights advance when the owner ticks them
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use concourse::{AssetLoader, HttpTransport, LoadServices, MemoryCache};
//!
//! let mut loader = AssetLoader::new(LoadServices {
//!     cache: Arc::new(MemoryCache::new()),
//!     transport: Arc::new(HttpTransport::new()),
//! });
//!
//! if let Some(pipeline) = loader.load("https://example.com/station.glb") {
//!     spawn(pipeline);
//! }
//!
//! // Every frame:
//! for (url, update) in loader.update(frame_time) {
//!     // Forward progress, Ready and Failed to the UI.
//! }
//! ```

mod asset;
pub mod cache;
pub mod choreographer;
mod error;
pub mod glb;
pub mod loader;
pub mod poi;
pub mod progress;
pub mod search;
pub mod transport;

pub use asset::{Asset, AssetSource};
#[cfg(not(target_family = "wasm"))]
pub use cache::FilesystemCache;
pub use cache::{CACHE_NAMESPACE, Cache, MemoryCache, NoCache};
pub use choreographer::{CameraPhase, CameraPose, Choreographer, FocusState};
pub use error::{Error, Result};
pub use glb::{GlbDocument, GlbError};
pub use loader::{AssetLoader, LoadPhase, LoadServices, LoadUpdate};
pub use poi::{PoiId, PointOfInterest};
pub use progress::{ProgressAnimator, ProgressTracker};
pub use search::{SearchOutcome, SearchState};
pub use transport::{HttpTransport, Transport};
