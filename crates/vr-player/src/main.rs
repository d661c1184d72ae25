use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use vr_player::coordinator::{Coordinator, CoordinatorConfig, ProbeFn};
use vr_player::engine::headless::{DurationResolver, HeadlessEngine};
use vr_player::error::CoreError;
use vr_player::events::{Command, EventPoster, Notification};
use vr_player::host::{HeadlessHost, HeadlessSurface, Rect};
use vr_player::settings::SettingsStore;
use vr_player::surface::{OutputSurface, Platform};
use vr_player::{logging, probe};

const USAGE: &str = "usage: player [--url ws://host:port] [FILE...]";

const CONSOLE_HELP: &str = "commands: play, pause, toggle, stop, next, prev, load <row>, \
seek <ms>, loop, scale <f>, volume <n>, fullscreen [display], windowed, \
connect [url], disconnect, remove <row>..., quit";

struct Args {
    url: Option<String>,
    paths: Vec<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Option<Args>> {
    let mut url = None;
    let mut paths = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--url" => url = Some(args.next().context("--url needs a value")?),
            _ => paths.push(PathBuf::from(arg)),
        }
    }
    Ok(Some(Args { url, paths }))
}

fn required<'a>(arg: Option<&'a str>, verb: &str, what: &str) -> Result<&'a str, String> {
    arg.ok_or_else(|| format!("{verb} needs {what}"))
}

/// One console line to a command. `Ok(None)` for blank lines.
fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    let number = |what: &str| required(arg, verb, what);

    let command = match verb {
        "play" => Command::Play,
        "pause" => Command::Pause,
        "toggle" => Command::TogglePause,
        "stop" => Command::Stop,
        "next" => Command::SkipNext,
        "prev" => Command::SkipPrevious,
        "loop" => Command::RotateLoopMode,
        "load" => Command::Load(number("a row")?.parse().map_err(|e| format!("bad row: {e}"))?),
        "seek" => Command::Seek(
            number("milliseconds")?
                .parse()
                .map_err(|e| format!("bad time: {e}"))?,
        ),
        "scale" => Command::SetScale(
            number("a scale")?
                .parse()
                .map_err(|e| format!("bad scale: {e}"))?,
        ),
        "volume" => Command::SetVolume(
            number("a volume")?
                .parse()
                .map_err(|e| format!("bad volume: {e}"))?,
        ),
        "fullscreen" => Command::StartFullscreen(match arg {
            Some(index) => index.parse().map_err(|e| format!("bad display: {e}"))?,
            None => 0,
        }),
        "windowed" => Command::StopFullscreen,
        "connect" => Command::Connect(arg.map(str::to_string)),
        "disconnect" => Command::Disconnect,
        "remove" => {
            let rows = arg
                .into_iter()
                .chain(words)
                .map(|w| w.parse::<usize>().map_err(|e| format!("bad row '{w}': {e}")))
                .collect::<Result<Vec<_>, _>>()?;
            if rows.is_empty() {
                return Err("remove needs at least one row".into());
            }
            Command::RemoveRows(rows)
        }
        "quit" | "exit" => Command::Shutdown,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(command))
}

fn spawn_console(poster: EventPoster) -> Result<()> {
    thread::Builder::new()
        .name("vr-player-console".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        let quit = command == Command::Shutdown;
                        poster.command(command);
                        if quit {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::warn!("{e}");
                        eprintln!("{CONSOLE_HELP}");
                    }
                }
            }
            log::debug!("Console closed");
            poster.command(Command::Shutdown);
        })?;
    Ok(())
}

fn describe(n: &Notification) -> String {
    match n {
        Notification::SocketStateChanged(state) => format!("orientation server: {state}"),
        Notification::MediaChanged { row, path, spherical, .. } => format!(
            "now playing [{row}] {}{}",
            path.display(),
            if *spherical { " (360°)" } else { "" }
        ),
        Notification::RowCountChanged(count) => format!("playlist: {count} entries"),
        Notification::LoopModeChanged(mode) => format!("loop: {}", mode.as_str()),
        Notification::FrameResized(scale) => format!("scale: {scale}"),
        Notification::PlaybackStateChanged(state) => format!("state: {}", state.display_name()),
        Notification::VolumeChanged(volume) => format!("volume: {volume}"),
        Notification::LoadFailed { path, reason } => match path {
            Some(path) => format!("cannot play {}: {reason}", path.display()),
            None => format!("cannot play: {reason}"),
        },
        Notification::FullscreenChanged(on) => format!("fullscreen: {on}"),
        Notification::CurrentChanged(row) => format!("current row: {row:?}"),
        Notification::ViewpointUpdated(_) | Notification::PositionChanged(_) => String::new(),
    }
}

fn main() -> Result<()> {
    logging::init();

    let Some(args) = parse_args(std::env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };

    let platform = Platform::current()?;
    log::info!("Video output binding: {platform:?}");
    if !probe::ffprobe_available() {
        return Err(CoreError::ProbeUnavailable.into());
    }

    let config = CoordinatorConfig::default();
    let settings = SettingsStore::load();

    let mut engine_args: Vec<String> = std::env::var("VLC_ARGS")
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    if !settings.hw_accel() {
        engine_args.push("--avcodec-hw=none".into());
    }
    let timeout = config.probe_timeout;
    let durations: DurationResolver = Box::new(move |path: &Path| {
        probe::probe(path, timeout)
            .ok()
            .map(|info| info.duration_seconds)
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    });
    let engine = HeadlessEngine::new(&engine_args, durations)
        .map_err(|e| CoreError::EngineUnavailable(e.to_string()))?;

    let surface = OutputSurface::with_platform(
        platform,
        Box::new(HeadlessSurface::new(1, Rect::new(0, 0, 600, 360))),
    );
    let host = Box::new(HeadlessHost::single_display());
    let probe_fn: ProbeFn = Box::new(move |path: &Path| probe::probe(path, timeout));
    let mut coordinator = Coordinator::new(config, engine, surface, host, settings, probe_fn);

    let notifications = coordinator.notifications();
    let printer = thread::Builder::new()
        .name("vr-player-status".into())
        .spawn(move || {
            for n in notifications.iter() {
                let line = describe(&n);
                if !line.is_empty() {
                    println!("{line}");
                }
            }
        })?;

    coordinator.open_paths(&args.paths);
    coordinator.poster().command(Command::Connect(args.url));
    spawn_console(coordinator.poster())?;
    eprintln!("{CONSOLE_HELP}");

    coordinator.run();
    drop(coordinator);
    if printer.join().is_err() {
        log::warn!("Status thread panicked");
    }
    Ok(())
}
