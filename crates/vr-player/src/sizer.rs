use crate::error::SettingsError;
use crate::host::{Size, WindowHost};
use crate::playlist::MediaEntry;
use crate::settings::{keys, SettingsStore};

/// Frame size used when no media (or no known dimensions) is loaded.
pub const DEFAULT_MEDIA_SIZE: Size = Size::new(600, 360);

/// The frame was resized to the given scale.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameResized(pub f64);

/// Computes and applies the player frame size.
#[derive(Debug, Default)]
pub struct FrameSizer {
    last_target: Option<Size>,
}

impl FrameSizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intrinsic pixel size of `entry`, or the default when unknown.
    pub fn media_size(entry: Option<&MediaEntry>) -> Size {
        entry
            .map(MediaEntry::info)
            .filter(|info| info.has_dimensions())
            .map_or(DEFAULT_MEDIA_SIZE, |info| Size::new(info.width, info.height))
    }

    pub fn scale(settings: &SettingsStore) -> f64 {
        settings.view_scale()
    }

    /// Last size requested from the host, after clamping.
    pub fn last_target(&self) -> Option<Size> {
        self.last_target
    }

    /// Persist `scale` and resize the frame to the media size at that scale.
    /// Invalid scales are rejected and nothing changes.
    pub fn set_scale(
        &mut self,
        settings: &mut SettingsStore,
        host: &mut dyn WindowHost,
        entry: Option<&MediaEntry>,
        scale: f64,
    ) -> Result<FrameResized, SettingsError> {
        settings.set(keys::VIEW_SCALE, scale)?;
        self.resize(host, scaled(Self::media_size(entry), scale));
        Ok(FrameResized(scale))
    }

    /// Fit the frame to new media when auto-resize is on; otherwise only
    /// recompute the video area.
    pub fn on_media_changed(
        &mut self,
        settings: &SettingsStore,
        host: &mut dyn WindowHost,
        entry: Option<&MediaEntry>,
    ) -> Option<FrameResized> {
        if !settings.auto_resize() {
            host.update_content_rect();
            return None;
        }
        let scale = Self::scale(settings);
        self.resize(host, scaled(Self::media_size(entry), scale));
        Some(FrameResized(scale))
    }

    fn resize(&mut self, host: &mut dyn WindowHost, target: Size) {
        let target = match host.containing_display() {
            Some(display) => target.clamp_to(display.size()),
            None => target,
        };
        // Panels are hidden so the frame itself, not the chrome, gets the size
        let hidden = host.hide_side_panels();
        host.resize_frame(target);
        host.update_content_rect();
        host.restore_side_panels(&hidden);
        log::debug!("Frame resized to {}x{}", target.width, target.height);
        self.last_target = Some(target);
    }
}

fn scaled(size: Size, scale: f64) -> Size {
    let dim = |v: u32| (f64::from(v) * scale).round().max(1.0) as u32;
    Size::new(dim(size.width), dim(size.height))
}
