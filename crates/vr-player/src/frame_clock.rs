use std::time::{Duration, Instant};

use crate::timer::Timer;

/// Interval used before any media has reported a frame rate.
const FALLBACK_FPS: f64 = 30.0;

/// Paces viewpoint updates and playback UI at roughly the media's frame rate.
///
/// Not phase-locked to decoded frames; the engine produces the pixels.
#[derive(Debug, Clone)]
pub struct FrameClock {
    timer: Timer,
    fps: f64,
    rate: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            timer: Timer::repeating(interval_for(FALLBACK_FPS, 1.0)),
            fps: FALLBACK_FPS,
            rate: 1.0,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if !self.timer.is_active() {
            log::debug!("Frame clock started at {:.3} fps", self.fps * self.rate);
        }
        self.timer.start(now);
    }

    pub fn stop(&mut self) {
        if self.timer.is_active() {
            log::debug!("Frame clock stopped");
        }
        self.timer.stop();
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_active()
    }

    /// Reprogram the tick interval to `1000 / (fps × playback_rate)` ms.
    /// Non-positive inputs fall back to defaults.
    pub fn set_rate(&mut self, fps: f64, playback_rate: f64, now: Instant) {
        self.fps = if fps > 0.0 { fps } else { FALLBACK_FPS };
        self.rate = if playback_rate > 0.0 { playback_rate } else { 1.0 };
        self.timer.set_interval(interval_for(self.fps, self.rate), now);
    }

    pub fn interval(&self) -> Duration {
        self.timer.interval()
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Returns true when a tick is due.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.timer.poll(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

fn interval_for(fps: f64, rate: f64) -> Duration {
    Duration::from_secs_f64(1.0 / (fps * rate))
}

/// Playback slider position in [0, 1].
///
/// Each tick extrapolates one frame forward. A `position_changed` value from
/// the engine is authoritative and replaces the extrapolation on the next tick.
#[derive(Debug, Clone, Default)]
pub struct SliderTracker {
    position: f32,
    step: f32,
    pending: Option<f32>,
}

impl SliderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// New media: back to zero, one frame per `1 / (fps × duration)`.
    pub fn reset(&mut self, duration_seconds: f64, fps: f64) {
        self.position = 0.0;
        self.pending = None;
        let frames = duration_seconds * fps;
        self.step = if frames > 0.0 { (1.0 / frames) as f32 } else { 0.0 };
    }

    pub fn on_position_changed(&mut self, position: f32) {
        self.pending = Some(position.clamp(0.0, 1.0));
    }

    /// Advance one frame and return the new position.
    pub fn on_tick(&mut self) -> f32 {
        self.position = match self.pending.take() {
            Some(authoritative) => authoritative,
            None => (self.position + self.step).min(1.0),
        };
        self.position
    }

    pub fn position(&self) -> f32 {
        self.position
    }
}
