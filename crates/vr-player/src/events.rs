//! Typed message bus between producer threads and the event context.
//!
//! Producers (engine threads, socket I/O threads, the stdin console) hold an
//! [`EventPoster`] and enqueue [`CoreEvent`]s. The event context is the single
//! receiver and drains them in order. Observers of the core subscribe to
//! [`Notification`]s and each gets its own channel, one message per state
//! change, never coalesced.

use std::path::PathBuf;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::engine::{EngineEvent, EngineState};
use crate::loop_mode::LoopMode;
use crate::orientation::types::{SocketEvent, SocketState};
use crate::playlist::EntryId;
use crate::viewpoint::Viewpoint;

/// User actions, posted by whatever front end drives the core.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(usize),
    Play,
    Pause,
    TogglePause,
    Stop,
    /// Seek to a time in milliseconds.
    Seek(i64),
    SkipNext,
    SkipPrevious,
    AddPaths(Vec<PathBuf>),
    RemoveRows(Vec<usize>),
    MoveRow { from: usize, to: usize },
    RotateLoopMode,
    SetScale(f64),
    SetVolume(i64),
    /// Fullscreen on the display at this index.
    StartFullscreen(usize),
    StopFullscreen,
    /// Connect to the given URL, or the persisted one when `None`.
    Connect(Option<String>),
    Disconnect,
    Shutdown,
}

/// Everything the event context reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    Engine(EngineEvent),
    /// `generation` identifies the connection attempt that produced the event.
    Socket { generation: u64, event: SocketEvent },
    Command(Command),
}

/// Outbound state changes for status labels, playlist views and dialogs.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    SocketStateChanged(SocketState),
    ViewpointUpdated(Viewpoint),
    MediaChanged {
        row: usize,
        id: EntryId,
        path: PathBuf,
        spherical: bool,
    },
    RowCountChanged(usize),
    CurrentChanged(Option<usize>),
    FrameResized(f64),
    LoopModeChanged(LoopMode),
    /// Slider position in [0, 1].
    PositionChanged(f32),
    PlaybackStateChanged(EngineState),
    VolumeChanged(i64),
    LoadFailed { path: Option<PathBuf>, reason: String },
    FullscreenChanged(bool),
}

/// Cloneable sending half of the event bus.
#[derive(Debug, Clone)]
pub struct EventPoster {
    tx: Sender<CoreEvent>,
}

impl EventPoster {
    pub fn post(&self, event: CoreEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("Event context gone, dropping event");
        }
    }

    pub fn engine(&self, event: EngineEvent) {
        self.post(CoreEvent::Engine(event));
    }

    pub fn socket(&self, generation: u64, event: SocketEvent) {
        self.post(CoreEvent::Socket { generation, event });
    }

    pub fn command(&self, command: Command) {
        self.post(CoreEvent::Command(command));
    }
}

/// Receiving half, owned by the event context.
pub struct EventBus {
    tx: Sender<CoreEvent>,
    rx: Receiver<CoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn poster(&self) -> EventPoster {
        EventPoster { tx: self.tx.clone() }
    }

    /// Next event if one is already queued.
    pub fn try_next(&self) -> Option<CoreEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next event, giving up at `deadline` (or waiting forever when `None`).
    pub fn next_before(&self, deadline: Option<Instant>) -> Option<CoreEvent> {
        match deadline {
            Some(deadline) => match self.rx.recv_deadline(deadline) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
            },
            // The bus keeps its own sender alive, so this only returns on an event.
            None => self.rx.recv().ok(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Fan-out point for notifications. Each subscriber owns its own channel;
/// with no subscribers nothing is kept.
pub struct Notifier {
    subscribers: Vec<Sender<Notification>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self { subscribers: Vec::new() }
    }

    /// Deliver to every live subscriber. Subscribers whose receiver was
    /// dropped are forgotten.
    pub fn emit(&mut self, notification: Notification) {
        log::trace!("notify {notification:?}");
        self.subscribers.retain(|tx| tx.send(notification.clone()).is_ok());
    }

    /// A receiver that sees every notification emitted after this call.
    pub fn subscribe(&mut self) -> Receiver<Notification> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
