//! Launch parameter parsing for the viewer.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used (CLI argument parsing is not available).

use std::path::PathBuf;
use std::sync::Arc;

use bevy::prelude::*;
use concourse::poi::{pois_from_json, station_amenities};
use concourse::{Cache, HttpTransport, LoadServices, PointOfInterest};

/// Default facility model.
pub const DEFAULT_MODEL_URL: &str =
    "https://utfs.io/f/zALdaFej0tyef6wegO2UwhctIHY7xMjLSGQZdrezTXyROqKp";

/// Launch parameters for the viewer.
#[derive(Resource, Debug, Clone)]
pub struct LaunchParams {
    /// URL of the facility model.
    pub url: String,
    /// Root of the persistent cache; the platform temp dir if unset.
    #[cfg_attr(target_family = "wasm", allow(dead_code))]
    pub cache_dir: Option<PathBuf>,
    /// Skip the persistent cache entirely.
    #[cfg_attr(target_family = "wasm", allow(dead_code))]
    pub no_cache: bool,
    /// JSON file with the points of interest.
    pub pois: Option<PathBuf>,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            url: DEFAULT_MODEL_URL.to_string(),
            cache_dir: None,
            no_cache: false,
            pois: None,
        }
    }
}

impl LaunchParams {
    /// Build the cache and transport for this session.
    pub fn services(&self) -> LoadServices {
        LoadServices {
            cache: self.cache(),
            transport: Arc::new(HttpTransport::new()),
        }
    }

    #[cfg(not(target_family = "wasm"))]
    fn cache(&self) -> Arc<dyn Cache> {
        if self.no_cache {
            tracing::info!("persistent cache disabled");
            return Arc::new(concourse::NoCache::new());
        }
        let root = self.cache_dir.clone().unwrap_or_else(std::env::temp_dir);
        let cache = concourse::FilesystemCache::new(root);
        tracing::info!(dir = %cache.dir().display(), "using filesystem cache");
        Arc::new(cache)
    }

    #[cfg(target_family = "wasm")]
    fn cache(&self) -> Arc<dyn Cache> {
        Arc::new(concourse::MemoryCache::new())
    }

    /// Load the points of interest, falling back to the built-in station list.
    pub fn points_of_interest(&self) -> Vec<PointOfInterest> {
        let Some(path) = &self.pois else {
            return station_amenities();
        };

        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| pois_from_json(&json).map_err(|e| e.to_string()));
        match parsed {
            Ok(pois) => {
                tracing::info!(count = pois.len(), path = %path.display(), "loaded points of interest");
                pois
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to load points of interest: {e}");
                station_amenities()
            }
        }
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    #[command(about = "Interactive 3D facility map viewer")]
    struct CliArgs {
        /// URL of the facility model (binary glTF).
        #[arg(long, default_value = DEFAULT_MODEL_URL)]
        url: String,

        /// Directory holding the persistent model cache.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Always download the model; never read or write the cache.
        #[arg(long)]
        no_cache: bool,

        /// JSON file with the points of interest.
        #[arg(long)]
        pois: Option<PathBuf>,
    }

    pub fn parse() -> LaunchParams {
        let args = CliArgs::parse();
        LaunchParams {
            url: args.url,
            cache_dir: args.cache_dir,
            no_cache: args.no_cache,
            pois: args.pois,
        }
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        LaunchParams::default()
    }
}
