//! Scene host: spawns the loaded facility model and post-processes its materials.
//!
//! The model bytes never touch disk here. They are placed in an in-memory
//! asset source and handed to Bevy's glTF loader from there.

use std::path::Path;

use bevy::asset::io::AssetSourceBuilder;
use bevy::asset::io::memory::{Dir, MemoryAssetReader};
use bevy::camera::primitives::Aabb;
use bevy::platform::collections::HashSet;
use bevy::prelude::*;
use bevy::scene::SceneInstanceReady;

use crate::loader::ModelReady;
use crate::settings::ViewerSettings;
use crate::ui::Search;

/// Name of the in-memory asset source holding the model.
const MODEL_SOURCE: &str = "concourse";
/// Path of the model inside [`MODEL_SOURCE`].
const MODEL_PATH: &str = "model.glb";

/// Roughness and metalness applied to every model material.
const MATERIAL_ROUGHNESS: f32 = 0.5;
const MATERIAL_METALNESS: f32 = 0.5;

/// Registers the in-memory model source.
///
/// Asset sources must exist before `AssetPlugin` is built, so this plugin is
/// added ahead of `DefaultPlugins`.
pub struct ModelSourcePlugin;

impl Plugin for ModelSourcePlugin {
    fn build(&self, app: &mut App) {
        let store = ModelStore::default();
        let root = store.0.clone();
        app.register_asset_source(
            MODEL_SOURCE,
            AssetSourceBuilder::new(move || {
                Box::new(MemoryAssetReader { root: root.clone() })
            }),
        );
        app.insert_resource(store);
    }
}

/// Plugin spawning the model once it is ready.
pub struct SceneHostPlugin;

impl Plugin for SceneHostPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModelMaterials>()
            .add_systems(Startup, spawn_lights)
            .add_systems(
                Update,
                (spawn_model, center_model, apply_search_dimming).chain(),
            );
    }
}

/// In-memory directory backing [`MODEL_SOURCE`].
#[derive(Resource, Default, Clone)]
struct ModelStore(Dir);

/// Root entity of the spawned model.
#[derive(Component)]
pub struct FacilityModel;

/// Marks a model root that still has to be centred on the origin.
#[derive(Component)]
struct PendingCentering;

/// Materials of the spawned model and their original alpha modes.
#[derive(Resource, Default)]
struct ModelMaterials {
    materials: Vec<(Handle<StandardMaterial>, AlphaMode)>,
    dimmed: bool,
}

fn spawn_lights(mut commands: Commands) {
    commands.spawn((
        DirectionalLight {
            illuminance: 10_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(5.0, 10.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn spawn_model(
    mut ready: MessageReader<ModelReady>,
    mut commands: Commands,
    store: Res<ModelStore>,
    asset_server: Res<AssetServer>,
    existing: Query<Entity, With<FacilityModel>>,
) {
    let Some(ModelReady(asset)) = ready.read().last() else {
        return;
    };

    for entity in &existing {
        commands.entity(entity).despawn();
    }

    let document = asset.document();
    tracing::info!(
        url = asset.url(),
        scenes = document.scene_count,
        nodes = document.node_count,
        meshes = document.mesh_count,
        "spawning facility model"
    );

    store
        .0
        .insert_asset(Path::new(MODEL_PATH), asset.bytes().to_vec());
    let scene = asset_server
        .load(GltfAssetLabel::Scene(0).from_asset(format!("{MODEL_SOURCE}://{MODEL_PATH}")));

    commands
        .spawn((
            Name::new("Facility model"),
            FacilityModel,
            PendingCentering,
            SceneRoot(scene),
        ))
        .observe(on_model_scene_ready);
}

/// Adjust material properties once the model's scene is instantiated.
fn on_model_scene_ready(
    trigger: On<SceneInstanceReady>,
    children: Query<&Children>,
    mesh_materials: Query<&MeshMaterial3d<StandardMaterial>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut model_materials: ResMut<ModelMaterials>,
) {
    let mut seen = HashSet::new();
    model_materials.materials.clear();
    model_materials.dimmed = false;

    for entity in children.iter_descendants(trigger.event_target()) {
        let Ok(MeshMaterial3d(handle)) = mesh_materials.get(entity) else {
            continue;
        };
        if !seen.insert(handle.id()) {
            continue;
        }
        if let Some(material) = materials.get_mut(handle) {
            material.perceptual_roughness = MATERIAL_ROUGHNESS;
            material.metallic = MATERIAL_METALNESS;
            model_materials
                .materials
                .push((handle.clone(), material.alpha_mode));
        }
    }

    tracing::info!(materials = model_materials.materials.len(), "facility model ready");
}

/// Shift the model so its bounding box is centred on the origin.
///
/// Bounds are computed after the scene spawns, so this retries each frame
/// until they exist.
fn center_model(
    mut commands: Commands,
    mut roots: Query<(Entity, &mut Transform), With<PendingCentering>>,
    children: Query<&Children>,
    bounds: Query<(&Aabb, &GlobalTransform)>,
) {
    for (root, mut transform) in &mut roots {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for entity in children.iter_descendants(root) {
            let Ok((aabb, global)) = bounds.get(entity) else {
                continue;
            };
            let center = Vec3::from(aabb.center);
            let half = Vec3::from(aabb.half_extents);
            for corner in box_corners(center, half) {
                let world = global.transform_point(corner);
                min = min.min(world);
                max = max.max(world);
            }
        }

        if min.x > max.x {
            continue;
        }

        let center = (min + max) / 2.0;
        transform.translation -= center;
        commands.entity(root).remove::<PendingCentering>();
        tracing::debug!(?center, "centred facility model");
    }
}

fn box_corners(center: Vec3, half: Vec3) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let sign = Vec3::new(
            if i & 1 == 0 { -1.0 } else { 1.0 },
            if i & 2 == 0 { -1.0 } else { 1.0 },
            if i & 4 == 0 { -1.0 } else { 1.0 },
        );
        *corner = center + half * sign;
    }
    corners
}

/// Fade the model while a search query is active.
fn apply_search_dimming(
    search: Res<Search>,
    settings: Res<ViewerSettings>,
    mut model_materials: ResMut<ModelMaterials>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let dimmed = search.state.is_active();
    if dimmed == model_materials.dimmed {
        return;
    }
    model_materials.dimmed = dimmed;

    let opacity = if dimmed { settings.dim_opacity } else { 1.0 };
    for (handle, original_mode) in &model_materials.materials {
        if let Some(material) = materials.get_mut(handle) {
            material.base_color.set_alpha(opacity);
            material.alpha_mode = if dimmed {
                AlphaMode::Blend
            } else {
                *original_mode
            };
        }
    }
    tracing::debug!(opacity, "model opacity changed");
}

#[cfg(test)]
mod tests {
    use concourse::poi::station_amenities;

    use super::*;
    use crate::settings::SEARCH_DIM_OPACITY;

    fn dimming_app() -> (App, Handle<StandardMaterial>) {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<Assets<StandardMaterial>>()
            .init_resource::<Search>()
            .insert_resource(ViewerSettings::default())
            .add_systems(Update, apply_search_dimming);

        let handle = app
            .world_mut()
            .resource_mut::<Assets<StandardMaterial>>()
            .add(StandardMaterial {
                alpha_mode: AlphaMode::Mask(0.5),
                ..default()
            });
        app.insert_resource(ModelMaterials {
            materials: vec![(handle.clone(), AlphaMode::Mask(0.5))],
            dimmed: false,
        });
        (app, handle)
    }

    fn set_query(app: &mut App, query: &str) {
        let pois = station_amenities();
        app.world_mut()
            .resource_mut::<Search>()
            .state
            .set_query(&pois, query);
    }

    fn material(app: &App, handle: &Handle<StandardMaterial>) -> (f32, AlphaMode) {
        let material = app
            .world()
            .resource::<Assets<StandardMaterial>>()
            .get(handle)
            .unwrap();
        (material.base_color.alpha(), material.alpha_mode)
    }

    #[test]
    fn test_active_query_dims_model() {
        let (mut app, handle) = dimming_app();
        app.update();
        assert_eq!(material(&app, &handle), (1.0, AlphaMode::Mask(0.5)));

        set_query(&mut app, "ticket");
        app.update();
        let (alpha, mode) = material(&app, &handle);
        assert!((alpha - SEARCH_DIM_OPACITY).abs() < 1e-6);
        assert_eq!(mode, AlphaMode::Blend);
    }

    #[test]
    fn test_cleared_query_restores_original_alpha_mode() {
        let (mut app, handle) = dimming_app();
        set_query(&mut app, "platform");
        app.update();

        set_query(&mut app, "");
        app.update();
        assert_eq!(material(&app, &handle), (1.0, AlphaMode::Mask(0.5)));
        assert!(!app.world().resource::<ModelMaterials>().dimmed);
    }

    #[test]
    fn test_query_without_matches_still_dims() {
        let (mut app, handle) = dimming_app();
        set_query(&mut app, "escalator");
        app.update();
        assert_eq!(material(&app, &handle).1, AlphaMode::Blend);
    }

    #[test]
    fn test_box_corners_span_extents() {
        let corners = box_corners(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 3.0));
        let min = corners.iter().copied().fold(Vec3::INFINITY, Vec3::min);
        let max = corners.iter().copied().fold(Vec3::NEG_INFINITY, Vec3::max);
        assert_eq!(min, Vec3::new(0.0, -2.0, -3.0));
        assert_eq!(max, Vec3::new(2.0, 2.0, 3.0));
    }
}
