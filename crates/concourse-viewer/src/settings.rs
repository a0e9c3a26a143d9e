//! Tunables shared by the viewer plugins.

use std::time::Duration;

use bevy::prelude::*;
use concourse::choreographer::{DEFAULT_CAMERA_OFFSET, FOCUS_DURATION, OVERVIEW_POSE};
use concourse::{CameraPose, Choreographer};

/// Opacity of the model while a search query is active.
pub const SEARCH_DIM_OPACITY: f32 = 0.3;

/// Viewer-wide settings.
#[derive(Resource, Debug, Clone)]
pub struct ViewerSettings {
    /// Length of focus and reset animations.
    pub focus_duration: Duration,
    /// Camera offset for points of interest without their own.
    pub camera_offset: Vec3,
    /// Initial camera pose.
    pub overview: CameraPose,
    /// Model opacity while searching.
    pub dim_opacity: f32,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Closest the orbit camera may get to its target.
    pub min_distance: f32,
    /// Farthest the orbit camera may get from its target.
    pub max_distance: f32,
    /// Orbit speed in radians per pixel of mouse drag.
    pub orbit_sensitivity: f32,
    /// Pan speed per pixel of mouse drag, scaled by distance to the target.
    pub pan_sensitivity: f32,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            focus_duration: FOCUS_DURATION,
            camera_offset: DEFAULT_CAMERA_OFFSET,
            overview: OVERVIEW_POSE,
            dim_opacity: SEARCH_DIM_OPACITY,
            fov_degrees: 75.0,
            min_distance: 0.1,
            max_distance: 1000.0,
            orbit_sensitivity: 0.005,
            pan_sensitivity: 0.001,
        }
    }
}

impl ViewerSettings {
    /// A choreographer configured from these settings.
    #[must_use]
    pub fn choreographer(&self) -> Choreographer {
        Choreographer::new(self.overview, self.focus_duration).with_default_offset(self.camera_offset)
    }
}
