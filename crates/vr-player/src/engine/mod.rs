pub mod headless;
pub mod types;

use std::path::Path;

use crate::events::EventPoster;
pub use types::{AdjustOption, EngineEvent, EngineState, Equalizer, EQ_BANDS};

/// The native media-playback engine, consumed through the operations the core needs.
///
/// Only `PlaylistPlayer` issues transport transitions, only `OutputSurface` issues
/// output-binding calls and only `ViewpointController` issues viewpoint updates.
/// Engine callbacks are never invoked on the caller's stack: implementations post
/// `EngineEvent`s through the poster handed to [`MediaEngine::subscribe`].
pub trait MediaEngine {
    /// Register the event context that receives engine callbacks.
    fn subscribe(&mut self, poster: EventPoster);

    fn set_mrl(&mut self, mrl: &Path);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    fn get_state(&self) -> EngineState;
    /// Current time in milliseconds, -1 when nothing is loaded.
    fn get_time(&self) -> i64;
    /// Seek to `ms`. A negative value seeks to the end of the media.
    fn set_time(&mut self, ms: i64);
    fn get_position(&self) -> f32;
    fn set_position(&mut self, position: f32);
    fn get_rate(&self) -> f32;

    // Output binding, one per platform.
    fn set_xwindow(&mut self, window_id: u32);
    fn set_hwnd(&mut self, hwnd: usize);
    fn set_nsobject(&mut self, view: usize);

    /// Returns 0 on success.
    fn update_viewpoint(
        &mut self,
        yaw: f32,
        pitch: f32,
        roll: f32,
        fov: f32,
        absolute: bool,
    ) -> i32;

    fn audio_get_volume(&self) -> i32;
    fn audio_set_volume(&mut self, volume: i32);
    /// `None` disables the equalizer.
    fn set_equalizer(&mut self, equalizer: Option<&Equalizer>);

    fn video_set_adjust_int(&mut self, option: AdjustOption, value: i32);
    fn video_set_adjust_float(&mut self, option: AdjustOption, value: f32);
    fn video_get_adjust_float(&self, option: AdjustOption) -> f32;
}
