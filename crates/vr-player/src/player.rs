use crate::engine::MediaEngine;
use crate::error::LoadError;
use crate::loop_mode::LoopMode;
use crate::playlist::{EntryId, PlaylistModel};
use crate::viewpoint::ViewpointController;

/// What a player transition did, for the coordinator to fan out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Nothing changed.
    None,
    /// A new entry is loaded into the engine.
    MediaChanged { row: usize, id: EntryId },
    /// Same entry restarted from the beginning (loop one).
    Restarted,
    /// Seeked back to the start of the current entry.
    Rewound,
    /// Seeked within the current entry.
    Seeked,
    /// Engine stopped; `current` stays set.
    Stopped,
    /// Engine stopped and `current` cleared.
    Cleared,
}

/// Everything a transition touches besides the player itself.
pub struct PlayerContext<'a> {
    pub engine: &'a mut dyn MediaEngine,
    pub playlist: &'a PlaylistModel,
    pub viewpoint: &'a mut ViewpointController,
    pub loop_mode: LoopMode,
}

/// Owns the current entry reference and advances through the playlist.
///
/// `current` is `None` exactly when the engine has no media, and the
/// viewpoint controller's per-frame flag always matches the current entry.
#[derive(Debug, Default)]
pub struct PlaylistPlayer {
    current: Option<EntryId>,
}

impl PlaylistPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<EntryId> {
        self.current
    }

    pub fn current_row(&self, playlist: &PlaylistModel) -> Option<usize> {
        self.current.and_then(|id| playlist.row_of(id))
    }

    /// Stop, load the entry at `index` and play it.
    pub fn load(
        &mut self,
        ctx: &mut PlayerContext<'_>,
        index: usize,
    ) -> Result<PlayerEvent, LoadError> {
        self.open(ctx, index, true)
    }

    /// Like [`load`](Self::load) but leaves playback stopped.
    pub fn cue(
        &mut self,
        ctx: &mut PlayerContext<'_>,
        index: usize,
    ) -> Result<PlayerEvent, LoadError> {
        self.open(ctx, index, false)
    }

    /// Resume playback, or load the first entry when nothing is current.
    pub fn play(&mut self, ctx: &mut PlayerContext<'_>) -> Result<PlayerEvent, LoadError> {
        if self.current.is_none() {
            return self.load(ctx, 0);
        }
        ctx.engine.play();
        Ok(PlayerEvent::None)
    }

    pub fn pause(&self, ctx: &mut PlayerContext<'_>) {
        if ctx.engine.is_playing() {
            ctx.engine.pause();
        }
    }

    pub fn toggle_pause(&mut self, ctx: &mut PlayerContext<'_>) -> Result<PlayerEvent, LoadError> {
        if ctx.engine.is_playing() {
            ctx.engine.pause();
            Ok(PlayerEvent::None)
        } else {
            self.play(ctx)
        }
    }

    /// Stop playback. The current entry stays loaded.
    pub fn stop(&self, ctx: &mut PlayerContext<'_>) {
        ctx.engine.stop();
    }

    pub fn seek(&self, ctx: &mut PlayerContext<'_>, ms: i64) -> PlayerEvent {
        if self.current.is_none() {
            return PlayerEvent::None;
        }
        ctx.engine.set_time(ms);
        PlayerEvent::Seeked
    }

    /// Media-finished policy.
    pub fn on_end_reached(&mut self, ctx: &mut PlayerContext<'_>) -> PlayerEvent {
        let Some(row) = self.current_row(ctx.playlist) else {
            return PlayerEvent::None;
        };
        if ctx.loop_mode == LoopMode::One {
            ctx.engine.set_time(0);
            ctx.engine.play();
            return PlayerEvent::Restarted;
        }
        self.advance_from(ctx, row + 1)
    }

    /// The engine gave up on the current entry. Skip to the next playable one
    /// (wrapping under loop=all) but never reload the entry that just failed.
    pub fn on_playback_error(&mut self, ctx: &mut PlayerContext<'_>) -> PlayerEvent {
        let Some(row) = self.current_row(ctx.playlist) else {
            ctx.engine.stop();
            return PlayerEvent::Stopped;
        };
        match next_playable(ctx.playlist, row + 1, ctx.loop_mode == LoopMode::All) {
            Some(next) if next != row => self.load_or_stop(ctx, next),
            _ => {
                log::info!("No playable entry after failed row {row}");
                ctx.engine.stop();
                PlayerEvent::Stopped
            }
        }
    }

    pub fn skip_next(&mut self, ctx: &mut PlayerContext<'_>) -> PlayerEvent {
        match self.current_row(ctx.playlist) {
            Some(row) => self.advance_from(ctx, row + 1),
            None => PlayerEvent::None,
        }
    }

    /// Previous playable entry, or back to the start of this one.
    pub fn skip_previous(&mut self, ctx: &mut PlayerContext<'_>) -> PlayerEvent {
        let Some(row) = self.current_row(ctx.playlist) else {
            return PlayerEvent::None;
        };
        let previous = (0..row).rev().find(|&r| is_playable(ctx.playlist, r));
        match previous {
            Some(prev) => self.load_or_stop(ctx, prev),
            None => {
                ctx.engine.set_time(0);
                PlayerEvent::Rewound
            }
        }
    }

    /// Reconcile after rows were removed. `removed` holds the pre-removal row
    /// and id of every removed entry; `ctx.playlist` is the post-removal list.
    pub fn unload(
        &mut self,
        ctx: &mut PlayerContext<'_>,
        removed: &[(usize, EntryId)],
    ) -> PlayerEvent {
        let Some(current) = self.current else {
            return PlayerEvent::None;
        };
        let Some(&(old_row, _)) = removed.iter().find(|(_, id)| *id == current) else {
            return PlayerEvent::None;
        };
        if ctx.playlist.is_empty() {
            return self.clear(ctx);
        }
        // First surviving entry after the removed current one
        let shift = removed.iter().filter(|(r, _)| *r < old_row).count();
        let next = old_row - shift;
        match next_playable(ctx.playlist, next, ctx.loop_mode == LoopMode::All) {
            Some(row) => self.load_or_stop(ctx, row),
            None => self.clear(ctx),
        }
    }

    pub fn on_row_count_changed(
        &mut self,
        ctx: &mut PlayerContext<'_>,
        count: usize,
    ) -> PlayerEvent {
        if count == 0 && self.current.is_some() {
            self.clear(ctx)
        } else {
            PlayerEvent::None
        }
    }

    fn advance_from(&mut self, ctx: &mut PlayerContext<'_>, from: usize) -> PlayerEvent {
        match next_playable(ctx.playlist, from, ctx.loop_mode == LoopMode::All) {
            Some(row) => self.load_or_stop(ctx, row),
            None => {
                log::info!("End of playlist");
                ctx.engine.stop();
                PlayerEvent::Stopped
            }
        }
    }

    fn load_or_stop(&mut self, ctx: &mut PlayerContext<'_>, row: usize) -> PlayerEvent {
        match self.open(ctx, row, true) {
            Ok(event) => event,
            Err(_) => PlayerEvent::Stopped,
        }
    }

    fn open(
        &mut self,
        ctx: &mut PlayerContext<'_>,
        index: usize,
        play: bool,
    ) -> Result<PlayerEvent, LoadError> {
        let playlist = ctx.playlist;
        let entry = match playlist.entry_at(index) {
            Some(entry) if entry.path().exists() => entry,
            Some(entry) => {
                let err = LoadError::MissingPath(entry.path().to_path_buf());
                return Err(self.fail(ctx, err));
            }
            None if playlist.is_empty() => return Err(self.fail(ctx, LoadError::EmptyPlaylist)),
            None => {
                let len = playlist.row_count();
                return Err(self.fail(ctx, LoadError::InvalidIndex { index, len }));
            }
        };

        ctx.engine.stop();
        self.current = Some(entry.id());
        ctx.engine.set_mrl(entry.path());
        ctx.viewpoint.enable_per_frame_updates(entry.is_spherical());
        log::info!("Loaded [{index}] {}", entry.display_title());
        if play {
            ctx.engine.play();
        }
        Ok(PlayerEvent::MediaChanged {
            row: index,
            id: entry.id(),
        })
    }

    fn fail(&self, ctx: &mut PlayerContext<'_>, err: LoadError) -> LoadError {
        log::warn!("Load failed: {err}");
        ctx.engine.stop();
        err
    }

    fn clear(&mut self, ctx: &mut PlayerContext<'_>) -> PlayerEvent {
        ctx.engine.stop();
        self.current = None;
        ctx.viewpoint.enable_per_frame_updates(false);
        PlayerEvent::Cleared
    }
}

fn is_playable(playlist: &PlaylistModel, row: usize) -> bool {
    playlist.entry_at(row).is_some_and(|e| e.path().exists())
}

/// First row at or after `from` whose file exists, wrapping to the top when
/// `wrap` is set. Each row is checked at most once.
fn next_playable(playlist: &PlaylistModel, from: usize, wrap: bool) -> Option<usize> {
    let len = playlist.row_count();
    let from = from.min(len);
    let wrapped = if wrap { 0..from } else { 0..0 };
    (from..len).chain(wrapped).find(|&row| {
        let playable = is_playable(playlist, row);
        if !playable {
            log::warn!("Skipping missing file at row {row}");
        }
        playable
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{media_files, playlist_of, EngineCall, MockEngine};

    struct Rig {
        _dir: tempfile::TempDir,
        engine: MockEngine,
        playlist: PlaylistModel,
        viewpoint: ViewpointController,
        player: PlaylistPlayer,
    }

    impl Rig {
        /// Entries named `*.vr.mp4` are spherical.
        fn new(names: &[&str]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let paths = media_files(dir.path(), names);
            Self {
                _dir: dir,
                engine: MockEngine::new(),
                playlist: playlist_of(&paths),
                viewpoint: ViewpointController::default(),
                player: PlaylistPlayer::new(),
            }
        }

        fn with<R>(
            &mut self,
            mode: LoopMode,
            f: impl FnOnce(&mut PlaylistPlayer, &mut PlayerContext<'_>) -> R,
        ) -> R {
            let mut ctx = PlayerContext {
                engine: &mut self.engine,
                playlist: &self.playlist,
                viewpoint: &mut self.viewpoint,
                loop_mode: mode,
            };
            f(&mut self.player, &mut ctx)
        }

        fn current_row(&self) -> Option<usize> {
            self.player.current_row(&self.playlist)
        }

        fn remove(&mut self, rows: &[usize], mode: LoopMode) -> PlayerEvent {
            let removed: Vec<_> = rows
                .iter()
                .filter_map(|&r| self.playlist.entry_at(r).map(|e| (r, e.id())))
                .collect();
            let _ = self.playlist.remove_indices(rows);
            self.with(mode, |p, ctx| p.unload(ctx, &removed))
        }
    }

    #[test]
    fn load_sets_mrl_plays_and_flags_spherical() {
        let mut rig = Rig::new(&["a.mp4", "s.vr.mp4"]);
        let ev = rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 1)).unwrap();
        assert!(matches!(ev, PlayerEvent::MediaChanged { row: 1, .. }));
        assert!(rig.viewpoint.per_frame_updates());
        let path = rig.playlist.entry_at(1).unwrap().path().to_path_buf();
        assert_eq!(
            rig.engine.calls(),
            &[EngineCall::Stop, EngineCall::SetMrl(path), EngineCall::Play]
        );

        rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 0)).unwrap();
        assert!(!rig.viewpoint.per_frame_updates());
        assert_eq!(rig.current_row(), Some(0));
    }

    #[test]
    fn cue_does_not_play() {
        let mut rig = Rig::new(&["a.mp4"]);
        rig.with(LoopMode::Off, |p, ctx| p.cue(ctx, 0)).unwrap();
        assert!(!rig.engine.calls().contains(&EngineCall::Play));
        assert_eq!(rig.current_row(), Some(0));
    }

    #[test]
    fn failed_load_keeps_prior_current_and_stops() {
        let mut rig = Rig::new(&["a.mp4"]);
        rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 0)).unwrap();
        let prior = rig.player.current();

        let err = rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 5)).unwrap_err();
        assert_eq!(err, LoadError::InvalidIndex { index: 5, len: 1 });
        assert_eq!(rig.player.current(), prior);
        assert_eq!(rig.engine.calls().last(), Some(&EngineCall::Stop));

        let _ = rig.playlist.append("/nonexistent/clip.mp4".into(), Default::default());
        let err = rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 1)).unwrap_err();
        assert!(matches!(err, LoadError::MissingPath(_)));
        assert_eq!(rig.player.current(), prior);
    }

    #[test]
    fn load_on_empty_playlist() {
        let mut rig = Rig::new(&[]);
        let err = rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 0)).unwrap_err();
        assert_eq!(err, LoadError::EmptyPlaylist);
        assert!(rig.player.current().is_none());
    }

    #[test]
    fn end_of_last_entry_with_loop_off_stops_and_keeps_current() {
        let mut rig = Rig::new(&["a.mp4", "b.mp4"]);
        rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 0)).unwrap();
        let ev = rig.with(LoopMode::Off, |p, ctx| p.on_end_reached(ctx));
        assert!(matches!(ev, PlayerEvent::MediaChanged { row: 1, .. }));

        let ev = rig.with(LoopMode::Off, |p, ctx| p.on_end_reached(ctx));
        assert_eq!(ev, PlayerEvent::Stopped);
        assert_eq!(rig.current_row(), Some(1));
        assert_eq!(rig.engine.calls().last(), Some(&EngineCall::Stop));
    }

    #[test]
    fn loop_one_restarts_current() {
        let mut rig = Rig::new(&["a.mp4", "b.mp4"]);
        rig.with(LoopMode::One, |p, ctx| p.load(ctx, 0)).unwrap();
        rig.engine.clear_calls();
        let ev = rig.with(LoopMode::One, |p, ctx| p.on_end_reached(ctx));
        assert_eq!(ev, PlayerEvent::Restarted);
        assert_eq!(rig.engine.calls(), &[EngineCall::SetTime(0), EngineCall::Play]);
        assert_eq!(rig.current_row(), Some(0));
    }

    #[test]
    fn loop_all_wraps_to_first() {
        let mut rig = Rig::new(&["a.mp4", "b.mp4"]);
        rig.with(LoopMode::All, |p, ctx| p.load(ctx, 1)).unwrap();
        let ev = rig.with(LoopMode::All, |p, ctx| p.on_end_reached(ctx));
        assert!(matches!(ev, PlayerEvent::MediaChanged { row: 0, .. }));
        assert_eq!(rig.engine.calls().last(), Some(&EngineCall::Play));
    }

    #[test]
    fn single_entry_loop_all_reloads_itself() {
        let mut rig = Rig::new(&["a.mp4"]);
        rig.with(LoopMode::All, |p, ctx| p.load(ctx, 0)).unwrap();
        let ev = rig.with(LoopMode::All, |p, ctx| p.on_end_reached(ctx));
        assert!(matches!(ev, PlayerEvent::MediaChanged { row: 0, .. }));
    }

    #[test]
    fn auto_advance_skips_missing_files() {
        let mut rig = Rig::new(&["a.mp4", "b.mp4", "c.mp4"]);
        std::fs::remove_file(rig.playlist.entry_at(1).unwrap().path()).unwrap();
        rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 0)).unwrap();
        let ev = rig.with(LoopMode::Off, |p, ctx| p.on_end_reached(ctx));
        assert!(matches!(ev, PlayerEvent::MediaChanged { row: 2, .. }));
    }

    #[test]
    fn skip_next_and_previous() {
        let mut rig = Rig::new(&["a.mp4", "b.mp4"]);
        rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 0)).unwrap();

        let ev = rig.with(LoopMode::Off, |p, ctx| p.skip_previous(ctx));
        assert_eq!(ev, PlayerEvent::Rewound);
        assert_eq!(rig.engine.calls().last(), Some(&EngineCall::SetTime(0)));

        rig.with(LoopMode::Off, |p, ctx| p.skip_next(ctx));
        assert_eq!(rig.current_row(), Some(1));
        assert_eq!(rig.with(LoopMode::Off, |p, ctx| p.skip_next(ctx)), PlayerEvent::Stopped);

        rig.with(LoopMode::Off, |p, ctx| p.skip_previous(ctx));
        assert_eq!(rig.current_row(), Some(0));

        rig.with(LoopMode::All, |p, ctx| p.load(ctx, 1)).unwrap();
        rig.with(LoopMode::All, |p, ctx| p.skip_next(ctx));
        assert_eq!(rig.current_row(), Some(0));
    }

    #[test]
    fn play_without_current_loads_first_entry() {
        let mut rig = Rig::new(&["a.mp4", "b.mp4"]);
        let ev = rig.with(LoopMode::Off, |p, ctx| p.play(ctx)).unwrap();
        assert!(matches!(ev, PlayerEvent::MediaChanged { row: 0, .. }));

        let ev = rig.with(LoopMode::Off, |p, ctx| p.toggle_pause(ctx)).unwrap();
        assert_eq!(ev, PlayerEvent::None);
        assert_eq!(rig.engine.calls().last(), Some(&EngineCall::Pause));
        rig.with(LoopMode::Off, |p, ctx| p.toggle_pause(ctx)).unwrap();
        assert_eq!(rig.engine.calls().last(), Some(&EngineCall::Play));
    }

    #[test]
    fn seek_requires_current() {
        let mut rig = Rig::new(&["a.mp4"]);
        assert_eq!(rig.with(LoopMode::Off, |p, ctx| p.seek(ctx, 1500)), PlayerEvent::None);
        assert!(rig.engine.calls().is_empty());
        rig.with(LoopMode::Off, |p, ctx| p.cue(ctx, 0)).unwrap();
        assert_eq!(rig.with(LoopMode::Off, |p, ctx| p.seek(ctx, 1500)), PlayerEvent::Seeked);
        assert_eq!(rig.engine.calls().last(), Some(&EngineCall::SetTime(1500)));
    }

    #[test]
    fn playback_error_skips_to_next_entry() {
        let mut rig = Rig::new(&["a.mp4", "b.mp4"]);
        rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 0)).unwrap();
        let ev = rig.with(LoopMode::Off, |p, ctx| p.on_playback_error(ctx));
        assert!(matches!(ev, PlayerEvent::MediaChanged { row: 1, .. }));
        assert_eq!(rig.current_row(), Some(1));

        let ev = rig.with(LoopMode::Off, |p, ctx| p.on_playback_error(ctx));
        assert_eq!(ev, PlayerEvent::Stopped);
        assert_eq!(rig.current_row(), Some(1));
        assert_eq!(rig.engine.calls().last(), Some(&EngineCall::Stop));
    }

    #[test]
    fn playback_error_never_reloads_the_failed_entry() {
        let mut rig = Rig::new(&["a.mp4"]);
        rig.with(LoopMode::All, |p, ctx| p.load(ctx, 0)).unwrap();
        rig.engine.clear_calls();
        let ev = rig.with(LoopMode::All, |p, ctx| p.on_playback_error(ctx));
        assert_eq!(ev, PlayerEvent::Stopped);
        assert_eq!(rig.engine.calls(), &[EngineCall::Stop]);
    }

    #[test]
    fn removing_current_loads_next_survivor() {
        let mut rig = Rig::new(&["a.mp4", "b.mp4", "c.mp4", "d.mp4"]);
        rig.with(LoopMode::All, |p, ctx| p.load(ctx, 1)).unwrap();
        let c = rig.playlist.entry_at(2).unwrap().id();

        let ev = rig.remove(&[0, 1], LoopMode::All);
        assert_eq!(ev, PlayerEvent::MediaChanged { row: 0, id: c });
        assert_eq!(rig.player.current(), Some(c));
    }

    #[test]
    fn removing_last_current_wraps_under_loop_all() {
        let mut rig = Rig::new(&["a.mp4", "b.mp4"]);
        rig.with(LoopMode::All, |p, ctx| p.load(ctx, 1)).unwrap();
        let ev = rig.remove(&[1], LoopMode::All);
        assert!(matches!(ev, PlayerEvent::MediaChanged { row: 0, .. }));
    }

    #[test]
    fn removing_last_current_without_loop_clears() {
        let mut rig = Rig::new(&["a.mp4", "b.mp4"]);
        rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 1)).unwrap();
        assert_eq!(rig.remove(&[1], LoopMode::Off), PlayerEvent::Cleared);
        assert!(rig.player.current().is_none());
        assert_eq!(rig.engine.calls().last(), Some(&EngineCall::Stop));
    }

    #[test]
    fn removing_other_rows_keeps_current() {
        let mut rig = Rig::new(&["a.mp4", "b.mp4", "c.mp4"]);
        rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 2)).unwrap();
        let id = rig.player.current();
        assert_eq!(rig.remove(&[0], LoopMode::Off), PlayerEvent::None);
        assert_eq!(rig.player.current(), id);
        assert_eq!(rig.current_row(), Some(1));
    }

    #[test]
    fn removing_everything_clears() {
        let mut rig = Rig::new(&["s.vr.mp4", "b.mp4"]);
        rig.with(LoopMode::All, |p, ctx| p.load(ctx, 0)).unwrap();
        assert_eq!(rig.remove(&[0, 1], LoopMode::All), PlayerEvent::Cleared);
        assert!(rig.player.current().is_none());
        assert!(!rig.viewpoint.per_frame_updates());

        let ev = rig.with(LoopMode::All, |p, ctx| p.on_row_count_changed(ctx, 0));
        assert_eq!(ev, PlayerEvent::None, "already cleared");
    }

    #[test]
    fn row_count_zero_clears_current() {
        let mut rig = Rig::new(&["a.mp4"]);
        rig.with(LoopMode::Off, |p, ctx| p.load(ctx, 0)).unwrap();
        let ev = rig.with(LoopMode::Off, |p, ctx| p.on_row_count_changed(ctx, 0));
        assert_eq!(ev, PlayerEvent::Cleared);
        assert!(rig.player.current().is_none());
    }
}
