//! Interactive 3D facility map viewer using Bevy.
//!
//! Loads the facility model (from the persistent cache when possible),
//! overlays clickable point-of-interest markers, and flies the camera to
//! whatever the search box matches.

mod async_runtime;
mod camera;
mod launch_params;
mod loader;
mod markers;
mod scene;
mod settings;
mod ui;

use async_runtime::AsyncRuntimePlugin;
use bevy::prelude::*;
use camera::CameraPlugin;
use loader::ModelLoaderPlugin;
use markers::{MarkerPlugin, PoiCatalog};
use scene::{ModelSourcePlugin, SceneHostPlugin};
use settings::ViewerSettings;
use ui::UiPlugin;

/// Plugin for the main application.
pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            ModelLoaderPlugin,
            SceneHostPlugin,
            CameraPlugin,
            MarkerPlugin,
            UiPlugin,
        ));
    }
}

fn main() {
    // Initialize tracing for native platforms.
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Initialize tracing for WASM (logs to browser console).
    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let params = launch_params::parse();
    let pois = params.points_of_interest();

    let mut app = App::new();

    #[allow(unused_mut)]
    let mut window = Window {
        title: "concourse".to_string(),
        resolution: (1600, 900).into(),
        position: WindowPosition::Centered(MonitorSelection::Primary),
        ..Default::default()
    };

    // WASM: Fit canvas to parent element and prevent browser event handling.
    #[cfg(target_family = "wasm")]
    {
        window.fit_canvas_to_parent = true;
        window.prevent_default_event_handling = true;
    }

    app.insert_resource(params)
        .insert_resource(ViewerSettings::default())
        .insert_resource(PoiCatalog(pois))
        .insert_resource(ClearColor(Color::srgb(0.05, 0.05, 0.08)));

    // The model source has to be registered before the asset plugin.
    app.add_plugins(ModelSourcePlugin);

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(window),
        ..Default::default()
    }));

    // Add async runtime (Tokio on native, no-op on WASM).
    app.add_plugins(AsyncRuntimePlugin);

    app.add_plugins(AppPlugin).run();
}
