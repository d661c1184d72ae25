//! Window-system boundary.
//!
//! The core never talks to a toolkit directly. It drives a [`VideoSurface`]
//! (the native child window the engine renders into) and a [`WindowHost`]
//! (the top-level frame with its dockable side panels). The headless
//! implementations below keep everything in memory and serve the `player`
//! binary and tests.

/// Rectangle in desktop pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Shrink to fit inside `bounds`, keeping each side independent.
    pub fn clamp_to(self, bounds: Size) -> Size {
        Size::new(self.width.min(bounds.width), self.height.min(bounds.height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowState {
    #[default]
    Normal,
    Maximized,
    Fullscreen,
}

/// A physical display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    pub name: String,
    pub geometry: Rect,
    pub primary: bool,
}

/// Widget that can host the video surface as a child.
pub type ParentId = u64;

/// The native child window the engine draws into.
///
/// Reparenting may recreate the native window, so callers must re-read
/// [`VideoSurface::raw_handle`] after [`VideoSurface::set_parent`].
pub trait VideoSurface {
    /// X window id, HWND or NSView pointer, depending on the platform.
    fn raw_handle(&self) -> u64;
    /// `None` while the surface is a top-level window.
    fn parent(&self) -> Option<ParentId>;
    fn set_parent(&mut self, parent: Option<ParentId>);
    fn geometry(&self) -> Rect;
    fn set_geometry(&mut self, geometry: Rect);
    fn window_state(&self) -> WindowState;
    fn set_window_state(&mut self, state: WindowState);
}

/// The top-level player frame.
pub trait WindowHost {
    fn displays(&self) -> Vec<Display>;
    /// Geometry of the display currently holding the frame.
    fn containing_display(&self) -> Option<Rect>;
    fn frame_size(&self) -> Size;
    fn resize_frame(&mut self, size: Size);
    /// Recompute the video area inside the frame without resizing the frame.
    fn update_content_rect(&mut self);
    /// Hide visible side panels; returns the names that were hidden.
    fn hide_side_panels(&mut self) -> Vec<String>;
    fn restore_side_panels(&mut self, panels: &[String]);
}

/// In-memory surface. Every reparent allocates a new handle, like toolkits
/// that recreate the native window when it leaves or joins a parent.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    handle: u64,
    next_handle: u64,
    parent: Option<ParentId>,
    geometry: Rect,
    state: WindowState,
}

impl HeadlessSurface {
    pub fn new(parent: ParentId, geometry: Rect) -> Self {
        Self {
            handle: 0x0400_0001,
            next_handle: 0x0400_0002,
            parent: Some(parent),
            geometry,
            state: WindowState::Normal,
        }
    }
}

impl VideoSurface for HeadlessSurface {
    fn raw_handle(&self) -> u64 {
        self.handle
    }

    fn parent(&self) -> Option<ParentId> {
        self.parent
    }

    fn set_parent(&mut self, parent: Option<ParentId>) {
        if self.parent != parent {
            self.parent = parent;
            self.handle = self.next_handle;
            self.next_handle += 1;
        }
    }

    fn geometry(&self) -> Rect {
        self.geometry
    }

    fn set_geometry(&mut self, geometry: Rect) {
        self.geometry = geometry;
    }

    fn window_state(&self) -> WindowState {
        self.state
    }

    fn set_window_state(&mut self, state: WindowState) {
        self.state = state;
    }
}

#[derive(Debug, Clone)]
struct Panel {
    name: String,
    visible: bool,
}

/// In-memory frame with a fixed set of displays and side panels.
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    displays: Vec<Display>,
    frame: Size,
    panels: Vec<Panel>,
    /// Every size passed to `resize_frame`, with the panels hidden at the time.
    pub resizes: Vec<(Size, Vec<String>)>,
    pub content_updates: usize,
}

impl HeadlessHost {
    pub fn new(displays: Vec<Display>, frame: Size) -> Self {
        Self {
            displays,
            frame,
            panels: Vec::new(),
            resizes: Vec::new(),
            content_updates: 0,
        }
    }

    /// One 1920×1080 primary display, 600×360 frame, playlist panel shown.
    pub fn single_display() -> Self {
        let mut host = Self::new(
            vec![Display {
                name: "headless-0".into(),
                geometry: Rect::new(0, 0, 1920, 1080),
                primary: true,
            }],
            Size::new(600, 360),
        );
        host.add_panel("playlist", true);
        host
    }

    pub fn add_panel(&mut self, name: &str, visible: bool) {
        self.panels.push(Panel {
            name: name.to_string(),
            visible,
        });
    }

    pub fn panel_visible(&self, name: &str) -> bool {
        self.panels.iter().any(|p| p.name == name && p.visible)
    }

    fn hidden_panels(&self) -> Vec<String> {
        self.panels
            .iter()
            .filter(|p| !p.visible)
            .map(|p| p.name.clone())
            .collect()
    }
}

impl WindowHost for HeadlessHost {
    fn displays(&self) -> Vec<Display> {
        self.displays.clone()
    }

    fn containing_display(&self) -> Option<Rect> {
        self.displays
            .iter()
            .find(|d| d.primary)
            .or_else(|| self.displays.first())
            .map(|d| d.geometry)
    }

    fn frame_size(&self) -> Size {
        self.frame
    }

    fn resize_frame(&mut self, size: Size) {
        self.frame = size;
        let hidden = self.hidden_panels();
        self.resizes.push((size, hidden));
    }

    fn update_content_rect(&mut self) {
        self.content_updates += 1;
    }

    fn hide_side_panels(&mut self) -> Vec<String> {
        let mut hidden = Vec::new();
        for panel in self.panels.iter_mut().filter(|p| p.visible) {
            panel.visible = false;
            hidden.push(panel.name.clone());
        }
        hidden
    }

    fn restore_side_panels(&mut self, panels: &[String]) {
        for panel in self.panels.iter_mut() {
            if panels.contains(&panel.name) {
                panel.visible = true;
            }
        }
    }
}
