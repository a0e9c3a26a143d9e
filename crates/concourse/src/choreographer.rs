//! Camera choreography between the overview and individual points of interest.
//!
//! The choreographer does not own a camera. Callers hand it the current
//! [`CameraPose`] when requesting a transition and apply the pose returned by
//! [`Choreographer::tick`] every frame until the animation ends.
//!
//! ```text
//!             focus(poi)               done
//! Overview ───────────────► Focusing ────────► Focused
//!    ▲                                           │  │
//!    │ done                    reset()           │  │ focus(other)
//!    └──────── Resetting ◄───────────────────────┘  └──► Focusing
//! ```
//!
//! Requests made while an animation is in flight are dropped, not queued.

use std::time::Duration;

use glam::Vec3;

use crate::poi::{PoiId, PointOfInterest};

/// Time a focus or reset animation takes.
pub const FOCUS_DURATION: Duration = Duration::from_millis(1500);

/// Camera offset from a point of interest that does not specify its own.
pub const DEFAULT_CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 2.0, 5.0);

/// Where the camera sits before anything is focused.
pub const OVERVIEW_POSE: CameraPose = CameraPose {
    position: Vec3::new(0.0, 2.0, 10.0),
    target: Vec3::ZERO,
};

/// Camera position plus the point it looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

impl CameraPose {
    /// Interpolate position and target by the same factor.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            target: self.target.lerp(other.target, t),
        }
    }
}

/// Cubic ease-in-out on `[0, 1]`.
#[must_use]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Which stage of choreography the camera is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraPhase {
    #[default]
    Overview,
    Focusing(PoiId),
    Focused(PoiId),
    Resetting,
}

/// Focus information for the UI shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusState {
    /// The focused (or being focused) point of interest.
    pub focused: Option<PoiId>,
    /// Whether a camera animation is in flight.
    pub animating: bool,
}

#[derive(Debug, Clone)]
struct Flight {
    from: CameraPose,
    to: CameraPose,
    elapsed: Duration,
}

/// Owns camera focus and reset animations for one session.
#[derive(Debug, Clone)]
pub struct Choreographer {
    phase: CameraPhase,
    flight: Option<Flight>,
    overview: CameraPose,
    duration: Duration,
    default_offset: Vec3,
}

impl Default for Choreographer {
    fn default() -> Self {
        Self::new(OVERVIEW_POSE, FOCUS_DURATION)
    }
}

impl Choreographer {
    #[must_use]
    pub fn new(overview: CameraPose, duration: Duration) -> Self {
        Self {
            phase: CameraPhase::Overview,
            flight: None,
            overview,
            duration,
            default_offset: DEFAULT_CAMERA_OFFSET,
        }
    }

    /// Use `offset` for points of interest without their own camera offset.
    #[must_use]
    pub fn with_default_offset(mut self, offset: Vec3) -> Self {
        self.default_offset = offset;
        self
    }

    #[must_use]
    pub fn phase(&self) -> CameraPhase {
        self.phase
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        matches!(
            self.phase,
            CameraPhase::Focusing(_) | CameraPhase::Resetting
        )
    }

    #[must_use]
    pub fn focus_state(&self) -> FocusState {
        let focused = match self.phase {
            CameraPhase::Focusing(id) | CameraPhase::Focused(id) => Some(id),
            CameraPhase::Overview | CameraPhase::Resetting => None,
        };
        FocusState {
            focused,
            animating: self.is_animating(),
        }
    }

    /// The pose that frames `poi`.
    #[must_use]
    pub fn pose_for(&self, poi: &PointOfInterest) -> CameraPose {
        CameraPose {
            position: poi.position + poi.camera_offset.unwrap_or(self.default_offset),
            target: poi.position,
        }
    }

    /// Start flying from `current` to `poi`.
    ///
    /// Returns `false` if the request was dropped because an animation is in
    /// flight.
    pub fn focus(&mut self, current: CameraPose, poi: &PointOfInterest) -> bool {
        if self.is_animating() {
            tracing::debug!(poi = %poi.id, phase = ?self.phase, "focus dropped, camera is animating");
            return false;
        }

        tracing::info!(poi = %poi.id, name = poi.name, "focusing camera");
        self.flight = Some(Flight {
            from: current,
            to: self.pose_for(poi),
            elapsed: Duration::ZERO,
        });
        self.phase = CameraPhase::Focusing(poi.id);
        true
    }

    /// Resolve `id` in `pois` and focus it.
    ///
    /// An unknown id is logged and ignored.
    pub fn focus_by_id(&mut self, current: CameraPose, pois: &[PointOfInterest], id: PoiId) -> bool {
        match pois.iter().find(|poi| poi.id == id) {
            Some(poi) => self.focus(current, poi),
            None => {
                tracing::warn!(poi = %id, "focus target not found");
                false
            }
        }
    }

    /// Fly back to the overview pose.
    ///
    /// Only a settled `Focused` camera can be reset.
    pub fn reset(&mut self, current: CameraPose) -> bool {
        if !matches!(self.phase, CameraPhase::Focused(_)) {
            tracing::debug!(phase = ?self.phase, "reset dropped");
            return false;
        }

        tracing::info!("resetting camera to overview");
        self.flight = Some(Flight {
            from: current,
            to: self.overview,
            elapsed: Duration::ZERO,
        });
        self.phase = CameraPhase::Resetting;
        true
    }

    /// Advance the animation by `delta`.
    ///
    /// Returns the pose to apply this frame, or `None` when idle. The final
    /// frame of an animation returns exactly the destination pose.
    pub fn tick(&mut self, delta: Duration) -> Option<CameraPose> {
        let flight = self.flight.as_mut()?;
        flight.elapsed += delta;

        if flight.elapsed < self.duration {
            let t = flight.elapsed.as_secs_f32() / self.duration.as_secs_f32();
            return Some(flight.from.lerp(flight.to, ease_in_out_cubic(t)));
        }

        let destination = flight.to;
        self.flight = None;
        self.phase = match self.phase {
            CameraPhase::Focusing(id) => CameraPhase::Focused(id),
            CameraPhase::Resetting => CameraPhase::Overview,
            settled => settled,
        };
        tracing::debug!(phase = ?self.phase, "camera animation finished");
        Some(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poi::station_amenities;

    const FRAME: Duration = Duration::from_millis(16);

    fn poi5() -> PointOfInterest {
        PointOfInterest {
            id: PoiId(5),
            name: "Lift".to_string(),
            description: String::new(),
            tags: Vec::new(),
            position: Vec3::new(1.0, 2.0, 3.0),
            camera_offset: None,
            image: None,
        }
    }

    /// Tick until idle, returning every applied pose.
    fn settle(choreographer: &mut Choreographer) -> Vec<CameraPose> {
        let mut poses = Vec::new();
        while let Some(pose) = choreographer.tick(FRAME) {
            poses.push(pose);
            if !choreographer.is_animating() {
                break;
            }
        }
        poses
    }

    #[test]
    fn test_easing_endpoints_and_symmetry() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
        assert!(ease_in_out_cubic(0.25) < 0.25);
        assert!(ease_in_out_cubic(0.75) > 0.75);
    }

    #[test]
    fn test_focus_then_settle() {
        let mut c = Choreographer::default();
        let poi = poi5();
        assert!(c.focus(OVERVIEW_POSE, &poi));
        assert_eq!(c.phase(), CameraPhase::Focusing(PoiId(5)));
        assert_eq!(
            c.focus_state(),
            FocusState {
                focused: Some(PoiId(5)),
                animating: true
            }
        );

        let poses = settle(&mut c);
        // 1.5 s at 16 ms per frame.
        assert_eq!(poses.len(), 94);
        assert_eq!(
            poses.last(),
            Some(&CameraPose {
                position: Vec3::new(1.0, 4.0, 8.0),
                target: Vec3::new(1.0, 2.0, 3.0),
            })
        );
        assert_eq!(c.phase(), CameraPhase::Focused(PoiId(5)));
        assert!(!c.focus_state().animating);
        assert_eq!(c.tick(FRAME), None);
    }

    #[test]
    fn test_position_and_target_move_together() {
        let mut c = Choreographer::default();
        let poi = poi5();
        c.focus(OVERVIEW_POSE, &poi);
        let to = c.pose_for(&poi);

        for pose in settle(&mut c) {
            let dp = (pose.position - OVERVIEW_POSE.position).length()
                / (to.position - OVERVIEW_POSE.position).length();
            let dt = (pose.target - OVERVIEW_POSE.target).length()
                / (to.target - OVERVIEW_POSE.target).length();
            assert!((dp - dt).abs() < 1e-4);
        }
    }

    #[test]
    fn test_focus_during_focus_is_dropped() {
        let pois = station_amenities();
        let mut c = Choreographer::default();
        assert!(c.focus(OVERVIEW_POSE, &pois[1]));
        c.tick(Duration::from_millis(500));
        assert!(!c.focus(OVERVIEW_POSE, &pois[0]));
        assert_eq!(c.phase(), CameraPhase::Focusing(pois[1].id));
    }

    #[test]
    fn test_reset_during_focus_is_dropped() {
        let mut c = Choreographer::default();
        c.focus(OVERVIEW_POSE, &poi5());
        c.tick(Duration::from_millis(700));
        assert!(!c.reset(OVERVIEW_POSE));
        assert_eq!(c.phase(), CameraPhase::Focusing(PoiId(5)));

        // The focus animation still completes; the camera never snaps back.
        let last = settle(&mut c).pop().unwrap();
        assert_eq!(last.target, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(c.phase(), CameraPhase::Focused(PoiId(5)));
    }

    #[test]
    fn test_reset_returns_to_overview() {
        let mut c = Choreographer::default();
        let poi = poi5();
        c.focus(OVERVIEW_POSE, &poi);
        settle(&mut c);

        assert!(c.reset(c.pose_for(&poi)));
        assert_eq!(c.phase(), CameraPhase::Resetting);
        assert_eq!(c.focus_state().focused, None);
        assert!(!c.focus(OVERVIEW_POSE, &poi));

        assert_eq!(settle(&mut c).last(), Some(&OVERVIEW_POSE));
        assert_eq!(c.phase(), CameraPhase::Overview);
    }

    #[test]
    fn test_reset_from_overview_is_noop() {
        let mut c = Choreographer::default();
        assert!(!c.reset(OVERVIEW_POSE));
        assert_eq!(c.tick(FRAME), None);
    }

    #[test]
    fn test_refocus_from_focused() {
        let pois = station_amenities();
        let mut c = Choreographer::default();
        c.focus(OVERVIEW_POSE, &pois[0]);
        settle(&mut c);
        assert!(c.focus(c.pose_for(&pois[0]), &pois[2]));
        settle(&mut c);
        assert_eq!(c.phase(), CameraPhase::Focused(pois[2].id));
    }

    #[test]
    fn test_unknown_id_is_ignored() {
        let pois = station_amenities();
        let mut c = Choreographer::default();
        assert!(!c.focus_by_id(OVERVIEW_POSE, &pois, PoiId(99)));
        assert_eq!(c.phase(), CameraPhase::Overview);
        assert!(c.focus_by_id(OVERVIEW_POSE, &pois, PoiId(3)));
    }

    #[test]
    fn test_custom_offset_and_default_override() {
        let mut poi = poi5();
        let c = Choreographer::default().with_default_offset(Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(c.pose_for(&poi).position, Vec3::new(1.0, 2.0, 4.0));
        poi.camera_offset = Some(Vec3::X);
        assert_eq!(c.pose_for(&poi).position, Vec3::new(2.0, 2.0, 3.0));
    }
}
