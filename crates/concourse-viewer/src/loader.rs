//! Model loading for the viewer session.
//!
//! Owns the session's single [`AssetLoader`], spawns its pipeline on the
//! platform runtime and republishes its updates as Bevy resources and
//! messages.

use bevy::prelude::*;
use concourse::{Asset, AssetLoader, LoadUpdate};

use crate::async_runtime::TaskSpawner;
use crate::launch_params::LaunchParams;

/// Plugin driving the model load.
pub struct ModelLoaderPlugin;

impl Plugin for ModelLoaderPlugin {
    fn build(&self, app: &mut App) {
        let params = app
            .world()
            .get_resource::<LaunchParams>()
            .cloned()
            .unwrap_or_default();

        app.insert_resource(ModelLoader {
            loader: AssetLoader::new(params.services()),
            url: params.url,
        })
        .init_resource::<LoadProgress>()
        .init_resource::<LoadStatus>()
        .add_message::<RetryLoad>()
        .add_message::<ModelReady>()
        .add_systems(Startup, start_load)
        .add_systems(Update, (retry_load, poll_loader).chain())
        .add_systems(Last, cancel_on_exit);
    }
}

/// The session's loader and the URL it loads.
#[derive(Resource)]
pub struct ModelLoader {
    loader: AssetLoader,
    url: String,
}

impl ModelLoader {
    fn start(&mut self, spawner: &TaskSpawner) {
        if let Some(pipeline) = self.loader.load(&self.url) {
            tracing::info!(url = %self.url, "starting model load");
            spawner.spawn(pipeline);
        }
    }
}

/// Load progress in percent, changed only when the value changes.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq, Deref)]
pub struct LoadProgress(pub u8);

/// Outcome of the model load.
#[derive(Resource, Debug, Default, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

/// Ask for a failed load to be restarted.
#[derive(Message, Debug, Clone, Copy)]
pub struct RetryLoad;

/// The model finished loading and can be spawned.
#[derive(Message, Debug, Clone)]
pub struct ModelReady(pub Asset);

fn start_load(mut loader: ResMut<ModelLoader>, spawner: TaskSpawner) {
    loader.start(&spawner);
}

fn retry_load(
    mut retries: MessageReader<RetryLoad>,
    mut loader: ResMut<ModelLoader>,
    mut status: ResMut<LoadStatus>,
    spawner: TaskSpawner,
) {
    if retries.read().count() == 0 || !matches!(*status, LoadStatus::Failed(_)) {
        return;
    }

    tracing::info!("retrying model load");
    *status = LoadStatus::Loading;
    loader.start(&spawner);
}

/// Forward loader updates to the shell.
fn poll_loader(
    time: Res<Time>,
    mut loader: ResMut<ModelLoader>,
    mut progress: ResMut<LoadProgress>,
    mut status: ResMut<LoadStatus>,
    mut ready: MessageWriter<ModelReady>,
) {
    for (_url, update) in loader.loader.update(time.delta()) {
        match update {
            LoadUpdate::Progress(value) => {
                progress.set_if_neq(LoadProgress(value));
            }
            LoadUpdate::Ready(asset) => {
                *status = LoadStatus::Ready;
                ready.write(ModelReady(asset));
            }
            LoadUpdate::Failed(error) => {
                *status = LoadStatus::Failed(error.to_string());
            }
        }
    }
}

/// Tear down the load when the app exits so no late result is processed.
fn cancel_on_exit(mut exits: MessageReader<AppExit>, mut loader: ResMut<ModelLoader>) {
    if exits.read().count() > 0 {
        loader.loader.cancel_all();
    }
}
