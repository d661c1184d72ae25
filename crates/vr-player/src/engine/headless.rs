//! Engine that simulates a transport clock without decoding anything.
//!
//! Time advances from wall-clock while playing, scaled by the playback rate.
//! A ticker thread posts position updates and `EndReached` once the clock
//! passes the media duration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{AdjustOption, EngineEvent, EngineState, Equalizer, MediaEngine};
use crate::events::EventPoster;

/// Ticker period.
const TICK: Duration = Duration::from_millis(10);
/// How often `PositionChanged` is posted while playing.
const POSITION_INTERVAL: Duration = Duration::from_millis(250);

/// Looks up the duration of a media file. `None` plays forever.
pub type DurationResolver = Box<dyn Fn(&Path) -> Option<Duration> + Send>;

#[derive(Debug)]
struct Transport {
    state: EngineState,
    mrl: Option<PathBuf>,
    duration_ms: Option<f64>,
    /// Media time at `anchor`.
    base_ms: f64,
    anchor: Instant,
    rate: f64,
    vout_pending: bool,
    last_position_post: Instant,
    poster: Option<EventPoster>,
}

impl Transport {
    fn time_ms(&self, now: Instant) -> f64 {
        let t = if self.state == EngineState::Playing {
            self.base_ms + now.duration_since(self.anchor).as_secs_f64() * 1000.0 * self.rate
        } else {
            self.base_ms
        };
        match self.duration_ms {
            Some(d) => t.min(d),
            None => t,
        }
    }

    /// Fold elapsed playing time into `base_ms`.
    fn settle(&mut self, now: Instant) {
        self.base_ms = self.time_ms(now);
        self.anchor = now;
    }

    fn post(&self, event: EngineEvent) {
        if let Some(poster) = &self.poster {
            poster.engine(event);
        }
    }

    fn set_state(&mut self, state: EngineState, event: EngineEvent) {
        self.state = state;
        self.post(event);
    }
}

/// Thread-backed stand-in for the native engine.
pub struct HeadlessEngine {
    transport: Arc<Mutex<Transport>>,
    durations: DurationResolver,
    shutdown: Arc<AtomicBool>,
    ticker: Option<JoinHandle<()>>,
    volume: i32,
    equalizer: Option<Equalizer>,
    adjust_enabled: bool,
    adjust: HashMap<AdjustOption, f32>,
    output: Option<u64>,
}

impl HeadlessEngine {
    /// `args` are engine init arguments; `--rate=<f>` sets the playback rate.
    pub fn new(args: &[String], durations: DurationResolver) -> anyhow::Result<Self> {
        let mut rate = 1.0;
        for arg in args {
            match arg.strip_prefix("--rate=") {
                Some(value) => {
                    rate = value
                        .parse::<f64>()
                        .ok()
                        .filter(|r| *r > 0.0)
                        .ok_or_else(|| anyhow::anyhow!("invalid engine rate '{value}'"))?;
                }
                None => log::debug!("Headless engine ignoring argument {arg}"),
            }
        }

        let now = Instant::now();
        let transport = Arc::new(Mutex::new(Transport {
            state: EngineState::Idle,
            mrl: None,
            duration_ms: None,
            base_ms: 0.0,
            anchor: now,
            rate,
            vout_pending: false,
            last_position_post: now,
            poster: None,
        }));
        let shutdown = Arc::new(AtomicBool::new(false));
        let ticker = spawn_ticker(transport.clone(), shutdown.clone())?;
        log::info!("Headless engine started (rate {rate})");

        Ok(Self {
            transport,
            durations,
            shutdown,
            ticker: Some(ticker),
            volume: 100,
            equalizer: None,
            adjust_enabled: false,
            adjust: HashMap::new(),
            output: None,
        })
    }

    /// Handle the video output is currently bound to.
    pub fn output(&self) -> Option<u64> {
        self.output
    }

    pub fn equalizer(&self) -> Option<Equalizer> {
        self.equalizer
    }

    pub fn adjust_enabled(&self) -> bool {
        self.adjust_enabled
    }

    fn lock(&self) -> MutexGuard<'_, Transport> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bind_output(&mut self, handle: u64) {
        self.output = Some(handle);
    }
}

fn spawn_ticker(
    transport: Arc<Mutex<Transport>>,
    shutdown: Arc<AtomicBool>,
) -> anyhow::Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("vr-player-engine".into())
        .spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                thread::sleep(TICK);
                let mut t = transport.lock().unwrap_or_else(PoisonError::into_inner);
                if t.state != EngineState::Playing {
                    continue;
                }
                let now = Instant::now();
                let time = t.time_ms(now);
                let since_post = now.duration_since(t.last_position_post);
                let duration_ms = t.duration_ms;
                match duration_ms {
                    Some(duration) if time >= duration => {
                        t.settle(now);
                        t.set_state(EngineState::Ended, EngineEvent::EndReached);
                    }
                    Some(duration) if since_post >= POSITION_INTERVAL => {
                        t.last_position_post = now;
                        let position = if duration > 0.0 { (time / duration) as f32 } else { 0.0 };
                        t.post(EngineEvent::PositionChanged(position));
                    }
                    _ => {}
                }
            }
        })?;
    Ok(handle)
}

impl MediaEngine for HeadlessEngine {
    fn subscribe(&mut self, poster: EventPoster) {
        self.lock().poster = Some(poster);
    }

    fn set_mrl(&mut self, mrl: &Path) {
        let duration = (self.durations)(mrl);
        let now = Instant::now();
        let mut t = self.lock();
        t.mrl = Some(mrl.to_path_buf());
        t.duration_ms = duration.map(|d| d.as_secs_f64() * 1000.0);
        t.base_ms = 0.0;
        t.anchor = now;
        t.state = EngineState::Idle;
        t.vout_pending = true;
        t.post(EngineEvent::MediaChanged);
    }

    fn play(&mut self) {
        let now = Instant::now();
        let mut t = self.lock();
        if t.mrl.is_none() {
            log::debug!("play() with no media");
            return;
        }
        let state = t.state;
        match state {
            EngineState::Playing => return,
            EngineState::Paused => {}
            EngineState::Ended => {
                let base = t.base_ms;
                if t.duration_ms.is_some_and(|d| base >= d) {
                    t.base_ms = 0.0;
                }
            }
            _ => t.set_state(EngineState::Opening, EngineEvent::Opening),
        }
        t.anchor = now;
        t.last_position_post = now;
        t.set_state(EngineState::Playing, EngineEvent::Playing);
        if t.vout_pending {
            t.vout_pending = false;
            t.post(EngineEvent::Vout(1));
        }
    }

    fn pause(&mut self) {
        let now = Instant::now();
        let mut t = self.lock();
        if t.state == EngineState::Playing {
            t.settle(now);
            t.set_state(EngineState::Paused, EngineEvent::Paused);
        }
    }

    fn stop(&mut self) {
        let mut t = self.lock();
        if t.mrl.is_none() || t.state == EngineState::Stopped {
            return;
        }
        t.base_ms = 0.0;
        if t.state != EngineState::Idle {
            t.vout_pending = true;
        }
        t.set_state(EngineState::Stopped, EngineEvent::Stopped);
    }

    fn is_playing(&self) -> bool {
        self.lock().state == EngineState::Playing
    }

    fn get_state(&self) -> EngineState {
        self.lock().state
    }

    fn get_time(&self) -> i64 {
        let t = self.lock();
        if t.mrl.is_none() {
            return -1;
        }
        t.time_ms(Instant::now()).round() as i64
    }

    fn set_time(&mut self, ms: i64) {
        let now = Instant::now();
        let mut t = self.lock();
        if t.mrl.is_none() {
            return;
        }
        let target = if ms < 0 {
            t.duration_ms.unwrap_or(0.0)
        } else {
            ms as f64
        };
        let duration = t.duration_ms;
        t.base_ms = duration.map_or(target, |d| target.min(d));
        t.anchor = now;
    }

    fn get_position(&self) -> f32 {
        let t = self.lock();
        match t.duration_ms {
            Some(d) if d > 0.0 => (t.time_ms(Instant::now()) / d) as f32,
            _ => 0.0,
        }
    }

    fn set_position(&mut self, position: f32) {
        let duration = self.lock().duration_ms;
        if let Some(d) = duration {
            self.set_time((f64::from(position.clamp(0.0, 1.0)) * d) as i64);
        }
    }

    fn get_rate(&self) -> f32 {
        self.lock().rate as f32
    }

    fn set_xwindow(&mut self, window_id: u32) {
        self.bind_output(u64::from(window_id));
    }

    fn set_hwnd(&mut self, hwnd: usize) {
        self.bind_output(hwnd as u64);
    }

    fn set_nsobject(&mut self, view: usize) {
        self.bind_output(view as u64);
    }

    fn update_viewpoint(
        &mut self,
        _yaw: f32,
        _pitch: f32,
        _roll: f32,
        fov: f32,
        _absolute: bool,
    ) -> i32 {
        if (1.0..=179.0).contains(&fov) { 0 } else { -1 }
    }

    fn audio_get_volume(&self) -> i32 {
        self.volume
    }

    fn audio_set_volume(&mut self, volume: i32) {
        let volume = volume.clamp(0, 100);
        if volume != self.volume {
            self.volume = volume;
            self.lock().post(EngineEvent::AudioVolume(volume as f32 / 100.0));
        }
    }

    fn set_equalizer(&mut self, equalizer: Option<&Equalizer>) {
        self.equalizer = equalizer.copied();
    }

    fn video_set_adjust_int(&mut self, option: AdjustOption, value: i32) {
        if option == AdjustOption::Enable {
            self.adjust_enabled = value != 0;
        }
    }

    fn video_set_adjust_float(&mut self, option: AdjustOption, value: f32) {
        self.adjust.insert(option, value);
    }

    fn video_get_adjust_float(&self, option: AdjustOption) -> f32 {
        self.adjust.get(&option).copied().unwrap_or(0.0)
    }
}

impl Drop for HeadlessEngine {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.ticker.take() {
            let _ = handle.join();
        }
    }
}
