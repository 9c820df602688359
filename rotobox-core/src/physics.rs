// ============================================================================
// rotobox-core/src/physics.rs
// ============================================================================
//
// RECTANGLE PHYSICS: Deterministic per-frame motion of the overlay rectangle
//
// The rectangle starts at the frame center, translates by a constant velocity
// each frame and bounces elastically off the frame edges. Half the diagonal of
// the unrotated rectangle is used as the collision margin on both axes, so the
// rectangle stays fully inside the frame at any rotation. Rotation is a pure
// function of the frame index.
//
// State is a plain value advanced by `step`; `RectanglePhysics` wraps it for
// callers that want to feed frame indices one by one.

use crate::config::{DEFAULT_FPS, OverlayConfig};

/// Frame size and rate of the video being rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    /// Always positive and finite.
    pub fps: f64,
}

impl FrameGeometry {
    /// Creates a geometry, substituting [`DEFAULT_FPS`] for an unusable rate.
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self::with_fallback_fps(width, height, fps, DEFAULT_FPS)
    }

    /// Creates a geometry, substituting `fallback` when `fps` is not a
    /// positive finite number.
    pub fn with_fallback_fps(width: u32, height: u32, fps: f64, fallback: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            log::debug!("Unusable frame rate {fps}, using {fallback}");
            fallback
        };
        Self { width, height, fps }
    }

    /// Presentation time of `frame_index` in seconds.
    pub fn timestamp(&self, frame_index: u64) -> f64 {
        frame_index as f64 / self.fps
    }
}

/// Immutable motion parameters derived from the overlay configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsParams {
    /// Collision margin: half the rectangle's diagonal.
    pub half_diagonal: f64,
    pub rotation_period_secs: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
}

impl PhysicsParams {
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self {
            half_diagonal: config.half_diagonal(),
            rotation_period_secs: config.rotation_period_secs,
            velocity_x: config.velocity_x,
            velocity_y: config.velocity_y,
        }
    }
}

/// Position, rotation and velocity of the rectangle after one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleState {
    pub center_x: f64,
    pub center_y: f64,
    pub angle_degrees: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
}

impl RectangleState {
    /// Centered in the frame, unrotated, moving at the configured velocity.
    pub fn initial(geometry: &FrameGeometry, params: &PhysicsParams) -> Self {
        Self {
            center_x: f64::from(geometry.width) / 2.0,
            center_y: f64::from(geometry.height) / 2.0,
            angle_degrees: 0.0,
            velocity_x: params.velocity_x,
            velocity_y: params.velocity_y,
        }
    }
}

/// Rotation angle at `frame_index`, in degrees within `[0, 360)`.
pub fn angle_at(frame_index: u64, fps: f64, rotation_period_secs: f64) -> f64 {
    (360.0 * frame_index as f64) / (fps * rotation_period_secs) % 360.0
}

/// Advances `state` by one frame.
///
/// Moves the center by the current velocity, then resolves each axis
/// independently: a center closer to an edge than the margin is clamped to
/// the margin and that axis's velocity is pointed back into the frame. A
/// corner hit therefore flips both axes in the same frame.
pub fn step(
    state: &RectangleState,
    frame_index: u64,
    params: &PhysicsParams,
    geometry: &FrameGeometry,
) -> RectangleState {
    let (center_x, velocity_x) = bounce_axis(
        state.center_x + state.velocity_x,
        state.velocity_x,
        params.half_diagonal,
        f64::from(geometry.width),
    );
    let (center_y, velocity_y) = bounce_axis(
        state.center_y + state.velocity_y,
        state.velocity_y,
        params.half_diagonal,
        f64::from(geometry.height),
    );

    RectangleState {
        center_x,
        center_y,
        angle_degrees: angle_at(frame_index, geometry.fps, params.rotation_period_secs),
        velocity_x,
        velocity_y,
    }
}

/// Resolves one axis. Returns the new position and velocity.
fn bounce_axis(position: f64, velocity: f64, margin: f64, extent: f64) -> (f64, f64) {
    // Frame narrower than the rectangle's diagonal: no position satisfies
    // both margins, so the center stays pinned at the midpoint.
    if 2.0 * margin > extent {
        return (extent / 2.0, velocity);
    }

    if position - margin < 0.0 {
        (margin, velocity.abs())
    } else if position + margin > extent {
        (extent - margin, -velocity.abs())
    } else {
        (position, velocity)
    }
}

/// Stateful driver around [`step`] owned by exactly one render job.
#[derive(Debug, Clone)]
pub struct RectanglePhysics {
    params: PhysicsParams,
    geometry: FrameGeometry,
    state: RectangleState,
}

impl RectanglePhysics {
    pub fn new(geometry: FrameGeometry, params: PhysicsParams) -> Self {
        Self {
            state: RectangleState::initial(&geometry, &params),
            params,
            geometry,
        }
    }

    /// Advances to `frame_index` and returns the new state.
    ///
    /// Must be called once per frame with strictly increasing indices.
    pub fn update(&mut self, frame_index: u64) -> RectangleState {
        self.state = step(&self.state, frame_index, &self.params, &self.geometry);
        self.state
    }

    pub fn state(&self) -> &RectangleState {
        &self.state
    }
}
