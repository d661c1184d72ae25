//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::engine::{AdjustOption, EngineState, Equalizer, MediaEngine};
use crate::events::EventPoster;
use crate::playlist::{EntryId, MediaEntry, MediaInfo, PlaylistModel};

/// One recorded engine call. Getters are not recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    SetMrl(PathBuf),
    Play,
    Pause,
    Stop,
    SetTime(i64),
    SetPosition(f32),
    SetXWindow(u32),
    SetHwnd(usize),
    SetNsObject(usize),
    UpdateViewpoint {
        yaw: f32,
        pitch: f32,
        roll: f32,
        fov: f32,
        absolute: bool,
    },
    SetVolume(i32),
    SetEqualizer(Option<Equalizer>),
    AdjustInt(AdjustOption, i32),
    AdjustFloat(AdjustOption, f32),
}

/// Engine that records every call and keeps just enough state for the
/// transport getters to answer sensibly.
#[derive(Debug, Default)]
pub struct MockEngine {
    calls: Vec<EngineCall>,
    pub state: EngineState,
    pub time: i64,
    pub position: f32,
    pub rate: f32,
    pub volume: i32,
    pub mrl: Option<PathBuf>,
    /// Returned from `update_viewpoint`.
    pub viewpoint_result: i32,
    pub adjust: HashMap<AdjustOption, f32>,
    pub poster: Option<EventPoster>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            rate: 1.0,
            volume: 100,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn viewpoints(&self) -> Vec<(f32, f32, f32)> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                EngineCall::UpdateViewpoint { yaw, pitch, roll, .. } => Some((yaw, pitch, roll)),
                _ => None,
            })
            .collect()
    }
}

impl MediaEngine for MockEngine {
    fn subscribe(&mut self, poster: EventPoster) {
        self.poster = Some(poster);
    }

    fn set_mrl(&mut self, mrl: &Path) {
        self.mrl = Some(mrl.to_path_buf());
        self.time = 0;
        self.calls.push(EngineCall::SetMrl(mrl.to_path_buf()));
    }

    fn play(&mut self) {
        self.state = EngineState::Playing;
        self.calls.push(EngineCall::Play);
    }

    fn pause(&mut self) {
        self.state = EngineState::Paused;
        self.calls.push(EngineCall::Pause);
    }

    fn stop(&mut self) {
        self.state = EngineState::Stopped;
        self.calls.push(EngineCall::Stop);
    }

    fn is_playing(&self) -> bool {
        self.state == EngineState::Playing
    }

    fn get_state(&self) -> EngineState {
        self.state
    }

    fn get_time(&self) -> i64 {
        if self.mrl.is_none() && self.time == 0 { -1 } else { self.time }
    }

    fn set_time(&mut self, ms: i64) {
        self.time = ms;
        self.calls.push(EngineCall::SetTime(ms));
    }

    fn get_position(&self) -> f32 {
        self.position
    }

    fn set_position(&mut self, position: f32) {
        self.position = position;
        self.calls.push(EngineCall::SetPosition(position));
    }

    fn get_rate(&self) -> f32 {
        self.rate
    }

    fn set_xwindow(&mut self, window_id: u32) {
        self.calls.push(EngineCall::SetXWindow(window_id));
    }

    fn set_hwnd(&mut self, hwnd: usize) {
        self.calls.push(EngineCall::SetHwnd(hwnd));
    }

    fn set_nsobject(&mut self, view: usize) {
        self.calls.push(EngineCall::SetNsObject(view));
    }

    fn update_viewpoint(
        &mut self,
        yaw: f32,
        pitch: f32,
        roll: f32,
        fov: f32,
        absolute: bool,
    ) -> i32 {
        self.calls.push(EngineCall::UpdateViewpoint {
            yaw,
            pitch,
            roll,
            fov,
            absolute,
        });
        self.viewpoint_result
    }

    fn audio_get_volume(&self) -> i32 {
        self.volume
    }

    fn audio_set_volume(&mut self, volume: i32) {
        self.volume = volume;
        self.calls.push(EngineCall::SetVolume(volume));
    }

    fn set_equalizer(&mut self, equalizer: Option<&Equalizer>) {
        self.calls.push(EngineCall::SetEqualizer(equalizer.copied()));
    }

    fn video_set_adjust_int(&mut self, option: AdjustOption, value: i32) {
        self.calls.push(EngineCall::AdjustInt(option, value));
    }

    fn video_set_adjust_float(&mut self, option: AdjustOption, value: f32) {
        self.adjust.insert(option, value);
        self.calls.push(EngineCall::AdjustFloat(option, value));
    }

    fn video_get_adjust_float(&self, option: AdjustOption) -> f32 {
        self.adjust.get(&option).copied().unwrap_or(0.0)
    }
}

/// 2 s at 25 fps, 1280×720. Names containing `.vr.` are spherical.
pub fn info_for(name: &str) -> MediaInfo {
    MediaInfo {
        width: 1280,
        height: 720,
        frame_count: 50,
        avg_frame_rate: 25.0,
        r_frame_rate: 25.0,
        duration_seconds: 2.0,
        spherical: name.contains(".vr."),
        ..MediaInfo::default()
    }
}

pub fn entry_with_size(id: u64, width: u32, height: u32) -> MediaEntry {
    let info = MediaInfo {
        width,
        height,
        ..MediaInfo::default()
    };
    MediaEntry::new(EntryId(id), PathBuf::from(format!("/media/{id}.mp4")), info)
}

/// Create empty files under `dir` so entries pass the existence check.
pub fn media_files(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, b"").unwrap();
            path
        })
        .collect()
}

pub fn playlist_of(paths: &[PathBuf]) -> PlaylistModel {
    let mut playlist = PlaylistModel::new();
    let _ = playlist.add_paths(paths, &|p: &Path| {
        Ok(info_for(&p.file_name().unwrap().to_string_lossy()))
    });
    playlist
}
