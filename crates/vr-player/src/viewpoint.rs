use crate::engine::MediaEngine;
use crate::orientation::types::MotionSample;

/// Horizontal field of view applied with every viewpoint update, in degrees.
pub const DEFAULT_FOV: f32 = 80.0;

/// Offset applied by redraw-only updates, in degrees.
pub const REDRAW_PERTURBATION: f32 = 0.01;

/// Camera orientation inside a spherical video, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewpoint {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Viewpoint {
    pub const ZERO: Viewpoint = Viewpoint {
        yaw: 0.0,
        pitch: 0.0,
        roll: 0.0,
    };

    pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }

    /// The remote sends head-relative orientation; the video sphere rotates
    /// the opposite way.
    pub fn from_motion(sample: &MotionSample) -> Self {
        Self {
            yaw: -sample.yaw as f32,
            pitch: -sample.pitch as f32,
            roll: -sample.roll as f32,
        }
    }

    fn axis_mut(&mut self, axis: usize) -> &mut f32 {
        match axis {
            0 => &mut self.yaw,
            1 => &mut self.pitch,
            _ => &mut self.roll,
        }
    }
}

/// Anything that can be polled for fresh motion samples.
pub trait MotionSource {
    /// The newest sample, or `None` if nothing changed since the last call.
    fn latest_motion(&mut self) -> Option<MotionSample>;
}

/// Drives the engine's video viewpoint once per frame tick.
///
/// Keeps two viewpoints: the user viewpoint (last sample applied) and the
/// redraw viewpoint (the user viewpoint nudged on one axis). Some engine
/// versions only recompute the projection when the viewpoint changes, so a
/// tick without a new sample applies the redraw viewpoint instead.
pub struct ViewpointController {
    enabled: bool,
    fov: f32,
    perturbation: f32,
    user: Viewpoint,
    redraw: Viewpoint,
    redraw_count: u32,
}

impl ViewpointController {
    pub fn new(fov: f32, perturbation: f32) -> Self {
        Self {
            enabled: false,
            fov,
            perturbation,
            user: Viewpoint::ZERO,
            redraw: Viewpoint::ZERO,
            redraw_count: 0,
        }
    }

    pub fn enable_per_frame_updates(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::debug!("Per-frame viewpoint updates {}", if enabled { "on" } else { "off" });
        }
        self.enabled = enabled;
    }

    pub fn per_frame_updates(&self) -> bool {
        self.enabled
    }

    pub fn user_viewpoint(&self) -> Viewpoint {
        self.user
    }

    pub fn redraw_viewpoint(&self) -> Viewpoint {
        self.redraw
    }

    /// Back to (0, 0, 0); called on media change.
    pub fn reset(&mut self) {
        self.user = Viewpoint::ZERO;
        self.redraw = Viewpoint::ZERO;
        self.redraw_count = 0;
    }

    /// Per-frame update. Returns the viewpoint that was applied, for observers.
    pub fn on_frame_tick(
        &mut self,
        engine: &mut dyn MediaEngine,
        source: &mut dyn MotionSource,
    ) -> Option<Viewpoint> {
        if !self.enabled {
            return None;
        }
        match source.latest_motion() {
            Some(sample) => {
                self.user = Viewpoint::from_motion(&sample);
                self.apply(engine, self.user);
                Some(self.user)
            }
            None => self.trigger_redraw(engine),
        }
    }

    /// Apply a redraw-only viewpoint: the user viewpoint with ±perturbation
    /// on one axis. The axis cycles yaw → pitch → roll and the sign
    /// alternates, so consecutive redraws always differ from each other.
    pub fn trigger_redraw(&mut self, engine: &mut dyn MediaEngine) -> Option<Viewpoint> {
        if !self.enabled {
            return None;
        }
        let axis = (self.redraw_count % 3) as usize;
        let sign = if self.redraw_count % 2 == 0 { 1.0 } else { -1.0 };
        self.redraw_count = (self.redraw_count + 1) % 6;

        self.redraw = self.user;
        *self.redraw.axis_mut(axis) += sign * self.perturbation;
        self.apply(engine, self.redraw);
        Some(self.redraw)
    }

    fn apply(&self, engine: &mut dyn MediaEngine, vp: Viewpoint) {
        let rc = engine.update_viewpoint(vp.yaw, vp.pitch, vp.roll, self.fov, true);
        if rc != 0 {
            log::error!(
                "update_viewpoint({}, {}, {}) failed with {rc}",
                vp.yaw,
                vp.pitch,
                vp.roll
            );
        }
    }
}

impl Default for ViewpointController {
    fn default() -> Self {
        Self::new(DEFAULT_FOV, REDRAW_PERTURBATION)
    }
}
