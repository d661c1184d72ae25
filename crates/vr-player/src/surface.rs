use crate::engine::{EngineState, MediaEngine};
use crate::error::CoreError;
use crate::host::{Display, ParentId, Rect, VideoSurface, WindowState};

/// How the engine's video output is routed to a native window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// X window id.
    Linux,
    /// HWND.
    Windows,
    /// NSView pointer.
    MacOs,
}

impl Platform {
    pub fn current() -> Result<Self, CoreError> {
        if cfg!(target_os = "linux") {
            Ok(Platform::Linux)
        } else if cfg!(target_os = "windows") {
            Ok(Platform::Windows)
        } else if cfg!(target_os = "macos") {
            Ok(Platform::MacOs)
        } else {
            Err(CoreError::UnsupportedPlatform(std::env::consts::OS))
        }
    }

    fn bind(self, engine: &mut dyn MediaEngine, raw: u64) -> bool {
        match self {
            Platform::Linux => match u32::try_from(raw) {
                Ok(xid) => engine.set_xwindow(xid),
                Err(_) => {
                    log::error!("Window handle {raw:#x} is not a valid X window id");
                    return false;
                }
            },
            Platform::Windows | Platform::MacOs => match usize::try_from(raw) {
                Ok(ptr) if self == Platform::Windows => engine.set_hwnd(ptr),
                Ok(ptr) => engine.set_nsobject(ptr),
                Err(_) => {
                    log::error!("Window handle {raw:#x} does not fit a pointer");
                    return false;
                }
            },
        }
        true
    }
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    parent: Option<ParentId>,
    geometry: Rect,
    state: WindowState,
}

/// Owns the native window the engine renders into and keeps the engine's
/// output bound to whatever handle that window currently has.
pub struct OutputSurface {
    platform: Platform,
    surface: Box<dyn VideoSurface>,
    bound: Option<u64>,
    windowed: Option<Placement>,
}

impl OutputSurface {
    pub fn new(surface: Box<dyn VideoSurface>) -> Result<Self, CoreError> {
        Ok(Self::with_platform(Platform::current()?, surface))
    }

    pub fn with_platform(platform: Platform, surface: Box<dyn VideoSurface>) -> Self {
        Self {
            platform,
            surface,
            bound: None,
            windowed: None,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Handle the engine output currently points at.
    pub fn bound_handle(&self) -> Option<u64> {
        self.bound
    }

    pub fn surface(&self) -> &dyn VideoSurface {
        self.surface.as_ref()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.windowed.is_some()
    }

    /// Bind the engine's video output to the surface's current handle.
    pub fn attach(&mut self, engine: &mut dyn MediaEngine) -> bool {
        let raw = self.surface.raw_handle();
        if self.platform.bind(engine, raw) {
            log::debug!("Video output bound to {raw:#x}");
            self.bound = Some(raw);
            true
        } else {
            false
        }
    }

    /// Re-bind after the handle changed without losing the playback position.
    pub fn reattach_preserving_state(&mut self, engine: &mut dyn MediaEngine) {
        let state = engine.get_state();
        log::debug!("Rebinding video output while {}", state.display_name());
        match state {
            EngineState::Buffering | EngineState::Playing => {
                let time = engine.get_time();
                engine.stop();
                self.attach(engine);
                engine.play();
                engine.set_time(time);
            }
            EngineState::Opening => {
                engine.stop();
                self.attach(engine);
                engine.play();
            }
            EngineState::Paused => {
                let time = engine.get_time();
                engine.stop();
                self.attach(engine);
                engine.play();
                engine.set_time(time);
                engine.pause();
            }
            EngineState::Ended => {
                engine.stop();
                self.attach(engine);
                engine.play();
                engine.pause();
                engine.set_time(-1);
            }
            EngineState::Stopped | EngineState::Error | EngineState::Idle => {
                engine.play();
                self.attach(engine);
                engine.stop();
            }
        }
    }

    /// Detach the surface from its parent and cover `display`.
    /// Returns false if already fullscreen.
    pub fn start_fullscreen(&mut self, engine: &mut dyn MediaEngine, display: &Display) -> bool {
        if self.windowed.is_some() {
            return false;
        }
        self.windowed = Some(Placement {
            parent: self.surface.parent(),
            geometry: self.surface.geometry(),
            state: self.surface.window_state(),
        });
        self.surface.set_parent(None);
        self.surface.set_geometry(display.geometry);
        self.surface.set_window_state(WindowState::Fullscreen);
        log::info!("Fullscreen on {}", display.name);
        self.reattach_preserving_state(engine);
        true
    }

    /// Return to the parent and window state saved by `start_fullscreen`.
    /// Returns false if not fullscreen.
    pub fn stop_fullscreen(&mut self, engine: &mut dyn MediaEngine) -> bool {
        let Some(placement) = self.windowed.take() else {
            return false;
        };
        self.surface.set_parent(placement.parent);
        self.surface.set_geometry(placement.geometry);
        self.surface.set_window_state(placement.state);
        log::info!("Leaving fullscreen");
        self.reattach_preserving_state(engine);
        true
    }
}
