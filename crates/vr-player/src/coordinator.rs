use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::engine::{EngineEvent, EngineState, MediaEngine};
use crate::error::{LoadError, ProbeError, SettingsError};
use crate::events::{Command, CoreEvent, EventBus, EventPoster, Notification, Notifier};
use crate::filters;
use crate::frame_clock::{FrameClock, SliderTracker};
use crate::host::WindowHost;
use crate::loop_mode::{LoopMode, LoopState};
use crate::orientation::{OrientationClient, SocketState, DEFAULT_RECONNECT_INTERVAL};
use crate::player::{PlayerContext, PlayerEvent, PlaylistPlayer};
use crate::playlist::{EntryId, MediaEntry, MediaInfo, PlaylistModel};
use crate::probe::DEFAULT_PROBE_TIMEOUT;
use crate::settings::{keys, SettingValue, SettingsStore};
use crate::sizer::{FrameResized, FrameSizer};
use crate::surface::OutputSurface;
use crate::timer;
use crate::viewpoint::{ViewpointController, DEFAULT_FOV, REDRAW_PERTURBATION};

/// Runtime knobs that are not persisted.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub reconnect_interval: Duration,
    pub fov: f32,
    pub perturbation: f32,
    pub probe_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            fov: DEFAULT_FOV,
            perturbation: REDRAW_PERTURBATION,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Metadata lookup used when paths are added to the playlist.
pub type ProbeFn = Box<dyn Fn(&Path) -> Result<MediaInfo, ProbeError>>;

/// Owns every component and the single engine handle, and runs the event
/// context: engine callbacks, socket events and user commands are drained
/// from one queue and timers fire between them.
pub struct Coordinator<E: MediaEngine> {
    config: CoordinatorConfig,
    engine: E,
    bus: EventBus,
    notifier: Notifier,
    settings: SettingsStore,
    playlist: PlaylistModel,
    player: PlaylistPlayer,
    loop_state: LoopState,
    viewpoint: ViewpointController,
    orientation: OrientationClient,
    clock: FrameClock,
    slider: SliderTracker,
    surface: OutputSurface,
    sizer: FrameSizer,
    host: Box<dyn WindowHost>,
    probe: ProbeFn,
    running: bool,
}

impl<E: MediaEngine> Coordinator<E> {
    pub fn new(
        config: CoordinatorConfig,
        mut engine: E,
        surface: OutputSurface,
        host: Box<dyn WindowHost>,
        settings: SettingsStore,
        probe: ProbeFn,
    ) -> Self {
        let bus = EventBus::new();
        engine.subscribe(bus.poster());
        filters::apply_all(&mut engine, &settings);

        let orientation = OrientationClient::new(bus.poster(), config.reconnect_interval);
        let viewpoint = ViewpointController::new(config.fov, config.perturbation);
        let loop_state = LoopState::new(settings.loop_mode());

        Self {
            config,
            engine,
            bus,
            notifier: Notifier::new(),
            settings,
            playlist: PlaylistModel::new(),
            player: PlaylistPlayer::new(),
            loop_state,
            viewpoint,
            orientation,
            clock: FrameClock::new(),
            slider: SliderTracker::new(),
            surface,
            sizer: FrameSizer::new(),
            host,
            probe,
            running: true,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn poster(&self) -> EventPoster {
        self.bus.poster()
    }

    /// Subscribe to notifications emitted from now on.
    pub fn notifications(&mut self) -> Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn playlist(&self) -> &PlaylistModel {
        &self.playlist
    }

    pub fn player(&self) -> &PlaylistPlayer {
        &self.player
    }

    pub fn viewpoint(&self) -> &ViewpointController {
        &self.viewpoint
    }

    pub fn surface(&self) -> &OutputSurface {
        &self.surface
    }

    pub fn host(&self) -> &dyn WindowHost {
        self.host.as_ref()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_state.mode()
    }

    pub fn socket_state(&self) -> SocketState {
        self.orientation.state()
    }

    pub fn current_entry(&self) -> Option<&MediaEntry> {
        self.player.current().and_then(|id| self.playlist.get(id))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Add paths and load the first one without playing (CLI startup).
    pub fn open_paths(&mut self, paths: &[PathBuf]) {
        self.add_paths(paths);
        if !self.playlist.is_empty() {
            let result = self.with_player(|p, ctx| p.cue(ctx, 0));
            self.apply_load(result, Instant::now());
        }
    }

    /// Validated settings write; re-applies whatever the key drives.
    pub fn set_setting(
        &mut self,
        key: &str,
        value: impl Into<SettingValue>,
    ) -> Result<(), SettingsError> {
        if key == keys::VIEW_SCALE {
            let scale = match value.into() {
                SettingValue::Float(f) => f,
                SettingValue::Int(i) => i as f64,
                _ => {
                    return Err(SettingsError::TypeMismatch {
                        key: key.to_string(),
                        expected: "a number",
                    });
                }
            };
            return self.set_scale(scale);
        }

        self.settings.set(key, value)?;
        if filters::is_image_key(key) {
            filters::apply_image_adjust(&mut self.engine, &self.settings);
        } else if filters::is_equalizer_key(key) {
            filters::apply_equalizer(&mut self.engine, &self.settings);
        } else if key == keys::VOLUME {
            filters::apply_volume(&mut self.engine, &self.settings);
            self.notifier.emit(Notification::VolumeChanged(self.settings.volume()));
        } else if key == keys::LOOP_MODE {
            self.loop_state.set(self.settings.loop_mode());
            self.notifier.emit(Notification::LoopModeChanged(self.loop_state.mode()));
        }
        Ok(())
    }

    /// Run until a `Shutdown` command is handled.
    pub fn run(&mut self) {
        log::info!("Event loop started");
        while self.running {
            self.run_once(None);
        }
        log::info!("Event loop finished");
    }

    /// Wait for one event (or the next due timer, or `limit`), handle it, fire
    /// due timers. Returns false once shut down.
    pub fn run_once(&mut self, limit: Option<Instant>) -> bool {
        let deadline = timer::earliest(&[self.next_deadline(), limit]);
        if let Some(event) = self.bus.next_before(deadline) {
            self.handle(event, Instant::now());
        }
        while self.running {
            let Some(event) = self.bus.try_next() else {
                break;
            };
            self.handle(event, Instant::now());
        }
        self.fire_timers(Instant::now());
        self.running
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        timer::earliest(&[self.clock.deadline(), self.orientation.next_deadline()])
    }

    pub fn handle(&mut self, event: CoreEvent, now: Instant) {
        match event {
            CoreEvent::Engine(ev) => self.on_engine_event(ev, now),
            CoreEvent::Socket { generation, event } => {
                if let Some(state) = self.orientation.on_socket_event(generation, event, now) {
                    self.notifier.emit(Notification::SocketStateChanged(state));
                }
            }
            CoreEvent::Command(cmd) => self.on_command(cmd, now),
        }
    }

    pub fn fire_timers(&mut self, now: Instant) {
        if let Some(state) = self.orientation.poll_timers(now) {
            self.notifier.emit(Notification::SocketStateChanged(state));
        }
        if self.clock.poll(now) {
            self.on_frame_tick();
        }
    }

    fn on_frame_tick(&mut self) {
        if let Some(vp) = self.viewpoint.on_frame_tick(&mut self.engine, &mut self.orientation) {
            self.notifier.emit(Notification::ViewpointUpdated(vp));
        }
        let position = self.slider.on_tick();
        self.notifier.emit(Notification::PositionChanged(position));
    }

    fn on_engine_event(&mut self, event: EngineEvent, now: Instant) {
        log::trace!("engine event {event:?}");
        match event {
            EngineEvent::Opening => self.playback_state(EngineState::Opening),
            EngineEvent::Playing => {
                self.clock.start(now);
                self.playback_state(EngineState::Playing);
            }
            EngineEvent::Paused => {
                self.clock.stop();
                self.playback_state(EngineState::Paused);
            }
            // Stopping never advances the playlist; current stays where it is.
            EngineEvent::Stopped => {
                self.clock.stop();
                self.playback_state(EngineState::Stopped);
            }
            // End and error events are queued; a load may have replaced the
            // media they were about since they were posted.
            EngineEvent::EndReached if self.engine.get_state() != EngineState::Ended => {
                log::debug!("Ignoring end of media that is no longer loaded");
            }
            EngineEvent::EncounteredError if self.engine.get_state() != EngineState::Error => {
                log::debug!("Ignoring error for media that is no longer loaded");
            }
            EngineEvent::EndReached => {
                self.clock.stop();
                self.playback_state(EngineState::Ended);
                let ev = self.with_player(|p, ctx| p.on_end_reached(ctx));
                self.apply_player_event(ev, now);
            }
            EngineEvent::PositionChanged(position) => self.slider.on_position_changed(position),
            EngineEvent::MediaChanged => log::debug!("Engine media changed"),
            EngineEvent::AudioVolume(volume) => {
                let volume = (f64::from(volume) * 100.0).round() as i64;
                self.notifier.emit(Notification::VolumeChanged(volume));
            }
            EngineEvent::Vout(count) => {
                if count > 0 && self.surface.attach(&mut self.engine) {
                    self.redraw();
                }
            }
            EngineEvent::EncounteredError => {
                log::error!("Engine reported a playback error");
                self.clock.stop();
                let path = self.current_entry().map(|e| e.path().to_path_buf());
                self.playback_state(EngineState::Error);
                self.notifier.emit(Notification::LoadFailed {
                    path,
                    reason: "engine error".into(),
                });
                let ev = self.with_player(|p, ctx| p.on_playback_error(ctx));
                self.apply_player_event(ev, now);
            }
        }
    }

    fn on_command(&mut self, command: Command, now: Instant) {
        log::debug!("command {command:?}");
        match command {
            Command::Load(index) => {
                let result = self.with_player(|p, ctx| p.load(ctx, index));
                self.apply_load(result, now);
            }
            Command::Play => {
                let result = self.with_player(|p, ctx| p.play(ctx));
                self.apply_load(result, now);
            }
            Command::Pause => self.with_player(|p, ctx| p.pause(ctx)),
            Command::TogglePause => {
                let result = self.with_player(|p, ctx| p.toggle_pause(ctx));
                self.apply_load(result, now);
            }
            Command::Stop => self.with_player(|p, ctx| p.stop(ctx)),
            Command::Seek(ms) => {
                let ev = self.with_player(|p, ctx| p.seek(ctx, ms));
                self.apply_player_event(ev, now);
            }
            Command::SkipNext => {
                let ev = self.with_player(|p, ctx| p.skip_next(ctx));
                self.apply_player_event(ev, now);
            }
            Command::SkipPrevious => {
                let ev = self.with_player(|p, ctx| p.skip_previous(ctx));
                self.apply_player_event(ev, now);
            }
            Command::AddPaths(paths) => self.add_paths(&paths),
            Command::RemoveRows(rows) => self.remove_rows(&rows, now),
            Command::MoveRow { from, to } => {
                let before = self.player.current_row(&self.playlist);
                if let Some(changed) = self.playlist.move_row(from, to) {
                    self.notifier.emit(Notification::RowCountChanged(changed.0));
                    let after = self.player.current_row(&self.playlist);
                    if after != before {
                        self.notifier.emit(Notification::CurrentChanged(after));
                    }
                }
            }
            Command::RotateLoopMode => {
                let mode = self.loop_state.rotate();
                if let Err(e) = self.settings.set(keys::LOOP_MODE, mode.as_str()) {
                    log::warn!("Failed to persist loop mode: {e}");
                }
                self.notifier.emit(Notification::LoopModeChanged(mode));
            }
            Command::SetScale(scale) => {
                if let Err(e) = self.set_scale(scale) {
                    log::warn!("Scale {scale} rejected: {e}");
                }
            }
            Command::SetVolume(volume) => {
                if let Err(e) = self.set_setting(keys::VOLUME, volume) {
                    log::warn!("Volume {volume} rejected: {e}");
                }
            }
            Command::StartFullscreen(index) => {
                let Some(display) = self.host.displays().into_iter().nth(index) else {
                    log::warn!("No display {index}");
                    return;
                };
                if self.surface.start_fullscreen(&mut self.engine, &display) {
                    self.notifier.emit(Notification::FullscreenChanged(true));
                    self.redraw();
                }
            }
            Command::StopFullscreen => {
                if self.surface.stop_fullscreen(&mut self.engine) {
                    self.notifier.emit(Notification::FullscreenChanged(false));
                    self.redraw();
                }
            }
            Command::Connect(url) => {
                if let Some(url) = &url {
                    if let Err(e) = self.settings.set(keys::URL, url.as_str()) {
                        log::warn!("Failed to persist URL: {e}");
                    }
                }
                let url = url.unwrap_or_else(|| self.settings.url().to_string());
                if let Some(state) = self.orientation.connect(&url) {
                    self.notifier.emit(Notification::SocketStateChanged(state));
                }
            }
            Command::Disconnect => {
                if let Some(state) = self.orientation.disconnect() {
                    self.notifier.emit(Notification::SocketStateChanged(state));
                }
            }
            Command::Shutdown => {
                log::info!("Shutting down");
                self.clock.stop();
                if let Some(state) = self.orientation.disconnect() {
                    self.notifier.emit(Notification::SocketStateChanged(state));
                }
                self.engine.stop();
                self.running = false;
            }
        }
    }

    fn add_paths(&mut self, paths: &[PathBuf]) {
        if let Some(changed) = self.playlist.add_paths(paths, &*self.probe) {
            self.notifier.emit(Notification::RowCountChanged(changed.0));
        }
    }

    fn remove_rows(&mut self, rows: &[usize], now: Instant) {
        let before = self.player.current_row(&self.playlist);
        let removed: Vec<(usize, EntryId)> = rows
            .iter()
            .filter_map(|&row| self.playlist.entry_at(row).map(|e| (row, e.id())))
            .collect();
        let Some(changed) = self.playlist.remove_indices(rows) else {
            return;
        };
        self.notifier.emit(Notification::RowCountChanged(changed.0));

        let ev = self.with_player(|p, ctx| p.unload(ctx, &removed));
        let ev = match ev {
            PlayerEvent::None => self.with_player(|p, ctx| p.on_row_count_changed(ctx, changed.0)),
            other => other,
        };
        let reloaded = matches!(ev, PlayerEvent::MediaChanged { .. } | PlayerEvent::Cleared);
        self.apply_player_event(ev, now);
        if !reloaded {
            let after = self.player.current_row(&self.playlist);
            if after != before {
                self.notifier.emit(Notification::CurrentChanged(after));
            }
        }
    }

    fn set_scale(&mut self, scale: f64) -> Result<(), SettingsError> {
        let entry = self.player.current().and_then(|id| self.playlist.get(id));
        let FrameResized(scale) = self
            .sizer
            .set_scale(&mut self.settings, self.host.as_mut(), entry, scale)?;
        self.notifier.emit(Notification::FrameResized(scale));
        self.redraw();
        Ok(())
    }

    fn apply_load(&mut self, result: Result<PlayerEvent, LoadError>, now: Instant) {
        match result {
            Ok(ev) => self.apply_player_event(ev, now),
            Err(e) => {
                let path = match &e {
                    LoadError::MissingPath(p) => Some(p.clone()),
                    _ => None,
                };
                self.notifier.emit(Notification::LoadFailed {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn apply_player_event(&mut self, event: PlayerEvent, now: Instant) {
        match event {
            PlayerEvent::None | PlayerEvent::Stopped => {}
            PlayerEvent::MediaChanged { row, id } => self.on_media_loaded(row, id, now),
            PlayerEvent::Restarted | PlayerEvent::Rewound => {
                self.slider.on_position_changed(0.0);
            }
            PlayerEvent::Seeked => {
                let position = self.engine.get_position();
                self.slider.on_position_changed(position);
            }
            PlayerEvent::Cleared => {
                self.clock.stop();
                self.viewpoint.reset();
                self.notifier.emit(Notification::CurrentChanged(None));
            }
        }
    }

    /// New media is in the engine; reprogram everything that depends on it
    /// before the next tick can fire.
    fn on_media_loaded(&mut self, row: usize, id: EntryId, now: Instant) {
        let Some(entry) = self.playlist.get(id) else {
            return;
        };
        self.clock.stop();
        self.viewpoint.reset();

        let info = entry.info();
        let fps = info.pacing_fps();
        self.clock.set_rate(fps, f64::from(self.engine.get_rate()), now);
        self.slider.reset(info.duration_seconds, fps);

        self.notifier.emit(Notification::MediaChanged {
            row,
            id,
            path: entry.path().to_path_buf(),
            spherical: entry.is_spherical(),
        });
        self.notifier.emit(Notification::CurrentChanged(Some(row)));

        let resized = self
            .sizer
            .on_media_changed(&self.settings, self.host.as_mut(), Some(entry));
        filters::apply_all(&mut self.engine, &self.settings);
        if let Some(FrameResized(scale)) = resized {
            self.notifier.emit(Notification::FrameResized(scale));
            self.redraw();
        }
    }

    fn redraw(&mut self) {
        if let Some(vp) = self.viewpoint.trigger_redraw(&mut self.engine) {
            self.notifier.emit(Notification::ViewpointUpdated(vp));
        }
    }

    fn playback_state(&mut self, state: EngineState) {
        log::info!("Playback {}", state.display_name());
        self.notifier.emit(Notification::PlaybackStateChanged(state));
    }

    fn with_player<R>(
        &mut self,
        f: impl FnOnce(&mut PlaylistPlayer, &mut PlayerContext<'_>) -> R,
    ) -> R {
        let mut ctx = PlayerContext {
            engine: &mut self.engine,
            playlist: &self.playlist,
            viewpoint: &mut self.viewpoint,
            loop_mode: self.loop_state.mode(),
        };
        f(&mut self.player, &mut ctx)
    }
}
