//! Orbit camera driven by the choreographer.
//!
//! The camera orbits and pans around a look-at target under mouse control. Focus and reset
//! requests hand control to [`Choreographer`], which owns the camera until
//! its animation ends; user input is ignored meanwhile.
//!
//! The choreographer's [`FocusState`] is mirrored into [`CameraFocus`] every
//! frame so the UI can render the reset control without the camera code
//! touching the UI.
//!
//! Requests that arrive mid-flight are dropped, not queued. The search box
//! records where it wants the camera in [`SearchTarget`], and once the camera
//! is idle it is sent there if it ended up somewhere else.

use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy_egui::EguiContexts;
use concourse::{CameraPose, Choreographer, FocusState, PoiId};

use crate::markers::PoiCatalog;
use crate::settings::ViewerSettings;

/// Largest pitch away from the horizon, just short of the poles.
const MAX_PITCH: f32 = 1.5;

/// Plugin for the orbit camera and its choreography.
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        let settings = app
            .world()
            .get_resource::<ViewerSettings>()
            .cloned()
            .unwrap_or_default();

        app.insert_resource(CameraDirector(settings.choreographer()))
            .init_resource::<CameraFocus>()
            .init_resource::<SearchTarget>()
            .add_message::<FocusRequest>()
            .add_message::<ResetViewRequest>()
            .add_systems(Startup, spawn_camera)
            .add_systems(
                Update,
                (
                    handle_camera_requests,
                    animate_camera,
                    orbit_input,
                    publish_focus_state,
                    follow_search_target,
                )
                    .chain(),
            );
    }
}

/// Marker for the viewer camera.
#[derive(Component)]
pub struct MainCamera;

/// Orbit controls state: the point the camera circles and looks at.
#[derive(Component, Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub target: Vec3,
}

/// The session's camera choreographer.
#[derive(Resource, Deref, DerefMut)]
pub struct CameraDirector(pub Choreographer);

/// Focus signal for the UI shell.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq, Deref)]
pub struct CameraFocus(pub FocusState);

/// Where the search box last asked the camera to go.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    /// No outstanding search destination.
    #[default]
    None,
    /// The current top match.
    Poi(PoiId),
    /// The query was emptied.
    Overview,
}

/// Fly the camera to a point of interest.
#[derive(Message, Debug, Clone, Copy)]
pub struct FocusRequest(pub PoiId);

/// Fly the camera back to the overview.
#[derive(Message, Debug, Clone, Copy)]
pub struct ResetViewRequest;

fn spawn_camera(mut commands: Commands, settings: Res<ViewerSettings>) {
    let pose = settings.overview;
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(pose.position).looking_at(pose.target, Vec3::Y),
        Projection::Perspective(PerspectiveProjection {
            fov: settings.fov_degrees.to_radians(),
            near: 0.05,
            far: 5000.0,
            ..default()
        }),
        MainCamera,
        OrbitCamera {
            target: pose.target,
        },
    ));
}

/// Apply a pose to the camera, the equivalent of an orbit-controls `update()`.
fn apply_pose(transform: &mut Transform, orbit: &mut OrbitCamera, pose: CameraPose) {
    orbit.target = pose.target;
    transform.translation = pose.position;
    if pose.position != pose.target {
        transform.look_at(pose.target, Vec3::Y);
    }
}

fn handle_camera_requests(
    mut focus_requests: MessageReader<FocusRequest>,
    mut reset_requests: MessageReader<ResetViewRequest>,
    mut director: ResMut<CameraDirector>,
    catalog: Res<PoiCatalog>,
    camera: Single<(&Transform, &OrbitCamera), With<MainCamera>>,
) {
    let (transform, orbit) = *camera;
    let current = CameraPose {
        position: transform.translation,
        target: orbit.target,
    };

    for FocusRequest(id) in focus_requests.read() {
        director.focus_by_id(current, &catalog, *id);
    }
    for _ in reset_requests.read() {
        director.reset(current);
    }
}

fn animate_camera(
    time: Res<Time>,
    mut director: ResMut<CameraDirector>,
    camera: Single<(&mut Transform, &mut OrbitCamera), With<MainCamera>>,
) {
    let Some(pose) = director.tick(time.delta()) else {
        return;
    };
    let (mut transform, mut orbit) = camera.into_inner();
    apply_pose(&mut transform, &mut orbit, pose);
}

/// Rotate `offset` (camera minus target) by yaw about the vertical axis and
/// pitch toward or away from it.
fn orbit_offset(offset: Vec3, yaw: f32, pitch: f32) -> Vec3 {
    let radius = offset.length();
    if radius <= f32::EPSILON {
        return offset;
    }
    let current_yaw = offset.x.atan2(offset.z);
    let current_pitch = (offset.y / radius).clamp(-1.0, 1.0).asin();

    let yaw = current_yaw + yaw;
    let pitch = (current_pitch + pitch).clamp(-MAX_PITCH, MAX_PITCH);
    Vec3::new(
        radius * pitch.cos() * yaw.sin(),
        radius * pitch.sin(),
        radius * pitch.cos() * yaw.cos(),
    )
}

/// Scale `offset` by `factor`, keeping its length within `[min, max]`.
fn zoom_offset(offset: Vec3, factor: f32, min: f32, max: f32) -> Vec3 {
    let radius = offset.length();
    if radius <= f32::EPSILON {
        return offset;
    }
    offset * ((radius * factor).clamp(min, max) / radius)
}

/// World-space shift of the orbit target for a pan drag.
///
/// Dragging right moves the scene right, so the target moves left along the
/// camera's own axes. Speed scales with distance to the target.
fn pan_shift(rotation: Quat, drag: Vec2, distance: f32, sensitivity: f32) -> Vec3 {
    let right = rotation * Vec3::X;
    let up = rotation * Vec3::Y;
    (right * -drag.x + up * drag.y) * distance * sensitivity
}

/// Left-drag to orbit, right-drag to pan, scroll to zoom.
fn orbit_input(
    mut mouse_motion: MessageReader<MouseMotion>,
    mut scroll_events: MessageReader<MouseWheel>,
    mouse: Res<ButtonInput<MouseButton>>,
    settings: Res<ViewerSettings>,
    director: Res<CameraDirector>,
    mut contexts: EguiContexts,
    camera: Single<(&mut Transform, &mut OrbitCamera), With<MainCamera>>,
) {
    let drag: Vec2 = mouse_motion.read().map(|event| event.delta).sum();
    let scroll: f32 = scroll_events
        .read()
        .map(|event| match event.unit {
            // Normalize scroll value: web reports pixels, native reports lines.
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y / 120.0,
        })
        .sum();

    if director.is_animating() {
        return;
    }

    let egui_wants_pointer = contexts
        .ctx_mut()
        .ok()
        .is_some_and(|ctx| ctx.is_pointer_over_area());
    if egui_wants_pointer {
        return;
    }

    let (mut transform, mut orbit) = camera.into_inner();
    let mut offset = transform.translation - orbit.target;
    let mut target = orbit.target;

    if mouse.pressed(MouseButton::Left) && drag != Vec2::ZERO {
        offset = orbit_offset(
            offset,
            -drag.x * settings.orbit_sensitivity,
            drag.y * settings.orbit_sensitivity,
        );
    }
    if mouse.pressed(MouseButton::Right) && drag != Vec2::ZERO {
        target += pan_shift(
            transform.rotation,
            drag,
            offset.length(),
            settings.pan_sensitivity,
        );
    }
    if scroll != 0.0 {
        offset = zoom_offset(
            offset,
            1.1_f32.powf(-scroll),
            settings.min_distance,
            settings.max_distance,
        );
    }

    let pose = CameraPose {
        position: target + offset,
        target,
    };
    if pose.position != transform.translation || pose.target != orbit.target {
        apply_pose(&mut transform, &mut orbit, pose);
    }
}

fn publish_focus_state(director: Res<CameraDirector>, mut focus: ResMut<CameraFocus>) {
    focus.set_if_neq(CameraFocus(director.focus_state()));
}

/// Re-issue the search destination once the camera is idle and elsewhere.
fn follow_search_target(
    focus: Res<CameraFocus>,
    mut target: ResMut<SearchTarget>,
    mut focus_requests: MessageWriter<FocusRequest>,
    mut reset_requests: MessageWriter<ResetViewRequest>,
) {
    if focus.animating {
        return;
    }

    match *target {
        SearchTarget::None => {}
        SearchTarget::Poi(id) if focus.focused == Some(id) => *target = SearchTarget::None,
        SearchTarget::Poi(id) => {
            tracing::debug!(poi = %id, "camera missed search match, refocusing");
            focus_requests.write(FocusRequest(id));
        }
        SearchTarget::Overview if focus.focused.is_none() => *target = SearchTarget::None,
        SearchTarget::Overview => {
            tracing::debug!("camera still focused after search cleared, resetting");
            reset_requests.write(ResetViewRequest);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::time::TimeUpdateStrategy;
    use concourse::CameraPhase;
    use concourse::poi::station_amenities;

    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_orbit_preserves_radius() {
        let offset = Vec3::new(0.0, 2.0, 10.0);
        let rotated = orbit_offset(offset, 0.7, 0.3);
        assert!((rotated.length() - offset.length()).abs() < 1e-4);
    }

    #[test]
    fn test_orbit_yaw_quarter_turn() {
        let rotated = orbit_offset(Vec3::new(0.0, 0.0, 5.0), std::f32::consts::FRAC_PI_2, 0.0);
        assert!(close(rotated, Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_orbit_pitch_is_clamped() {
        let rotated = orbit_offset(Vec3::new(0.0, 0.0, 5.0), 0.0, 10.0);
        assert!((rotated.y / 5.0 - MAX_PITCH.sin()).abs() < 1e-4);
    }

    #[test]
    fn test_pan_moves_against_drag() {
        let shift = pan_shift(Quat::IDENTITY, Vec2::new(10.0, 0.0), 10.0, 0.001);
        assert!(close(shift, Vec3::new(-0.1, 0.0, 0.0)));

        // Dragging down lifts the target along the camera's up axis.
        let shift = pan_shift(Quat::IDENTITY, Vec2::new(0.0, 5.0), 2.0, 0.01);
        assert!(close(shift, Vec3::new(0.0, 0.1, 0.0)));
    }

    #[test]
    fn test_pan_follows_camera_yaw() {
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let shift = pan_shift(rotation, Vec2::new(-10.0, 0.0), 1.0, 0.1);
        // The camera's right axis now points down -Z.
        assert!(close(shift, Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_zoom_clamps_distance() {
        let offset = Vec3::new(0.0, 0.0, 10.0);
        assert!(close(zoom_offset(offset, 0.5, 0.1, 1000.0), Vec3::new(0.0, 0.0, 5.0)));
        assert!(close(zoom_offset(offset, 1e-6, 0.1, 1000.0), Vec3::new(0.0, 0.0, 0.1)));
        assert!(close(zoom_offset(offset, 1e6, 0.1, 1000.0), Vec3::new(0.0, 0.0, 1000.0)));
    }

    #[test]
    fn test_focus_signal_follows_director() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(CameraDirector(ViewerSettings::default().choreographer()))
            .insert_resource(PoiCatalog(station_amenities()))
            .init_resource::<CameraFocus>()
            .init_resource::<SearchTarget>()
            .add_message::<FocusRequest>()
            .add_message::<ResetViewRequest>()
            .add_systems(
                Update,
                (handle_camera_requests, publish_focus_state).chain(),
            );
        app.world_mut().spawn((
            Transform::from_xyz(0.0, 2.0, 10.0),
            MainCamera,
            OrbitCamera {
                target: Vec3::ZERO,
            },
        ));

        app.world_mut().write_message(FocusRequest(PoiId(2)));
        app.update();
        assert_eq!(
            app.world().resource::<CameraFocus>().0,
            FocusState {
                focused: Some(PoiId(2)),
                animating: true,
            }
        );

        // Unknown ids leave the focus untouched.
        app.world_mut().write_message(FocusRequest(PoiId(42)));
        app.update();
        assert_eq!(app.world().resource::<CameraFocus>().focused, Some(PoiId(2)));
    }

    fn choreographed_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)))
            .insert_resource(CameraDirector(ViewerSettings::default().choreographer()))
            .insert_resource(PoiCatalog(station_amenities()))
            .init_resource::<CameraFocus>()
            .init_resource::<SearchTarget>()
            .add_message::<FocusRequest>()
            .add_message::<ResetViewRequest>()
            .add_systems(
                Update,
                (
                    handle_camera_requests,
                    animate_camera,
                    publish_focus_state,
                    follow_search_target,
                )
                    .chain(),
            );
        app.world_mut().spawn((
            Transform::from_xyz(0.0, 2.0, 10.0),
            MainCamera,
            OrbitCamera {
                target: Vec3::ZERO,
            },
        ));
        app
    }

    /// Mimic the search box: record the destination and ask for it once.
    fn search_for(app: &mut App, target: SearchTarget) {
        *app.world_mut().resource_mut::<SearchTarget>() = target;
        match target {
            SearchTarget::Poi(id) => {
                app.world_mut().write_message(FocusRequest(id));
            }
            SearchTarget::Overview => {
                app.world_mut().write_message(ResetViewRequest);
            }
            SearchTarget::None => {}
        }
    }

    fn run_frames(app: &mut App, frames: usize) {
        for _ in 0..frames {
            app.update();
        }
    }

    #[test]
    fn test_match_changed_mid_flight_is_followed_once_idle() {
        let mut app = choreographed_app();
        search_for(&mut app, SearchTarget::Poi(PoiId(1)));
        app.update();
        assert_eq!(app.world().resource::<CameraDirector>().phase(), CameraPhase::Focusing(PoiId(1)));

        // The top match moves on while the first flight is still running.
        search_for(&mut app, SearchTarget::Poi(PoiId(2)));
        app.update();
        assert_eq!(app.world().resource::<CameraDirector>().phase(), CameraPhase::Focusing(PoiId(1)));

        run_frames(&mut app, 60);
        assert_eq!(
            app.world().resource::<CameraFocus>().0,
            FocusState {
                focused: Some(PoiId(2)),
                animating: false,
            }
        );
        assert_eq!(*app.world().resource::<SearchTarget>(), SearchTarget::None);
    }

    #[test]
    fn test_query_cleared_mid_flight_returns_to_overview() {
        let mut app = choreographed_app();
        search_for(&mut app, SearchTarget::Poi(PoiId(3)));
        app.update();

        search_for(&mut app, SearchTarget::Overview);
        app.update();
        assert_eq!(app.world().resource::<CameraDirector>().phase(), CameraPhase::Focusing(PoiId(3)));

        run_frames(&mut app, 60);
        assert_eq!(app.world().resource::<CameraDirector>().phase(), CameraPhase::Overview);
        assert_eq!(app.world().resource::<CameraFocus>().focused, None);
        assert_eq!(*app.world().resource::<SearchTarget>(), SearchTarget::None);
    }

    #[test]
    fn test_label_focus_without_search_target_stays() {
        let mut app = choreographed_app();
        app.world_mut().write_message(FocusRequest(PoiId(2)));
        run_frames(&mut app, 30);
        assert_eq!(app.world().resource::<CameraDirector>().phase(), CameraPhase::Focused(PoiId(2)));
    }
}
