//! Media metadata via an `ffprobe` subprocess.
//!
//! - `ffprobe -print_format json -show_streams -show_format` runs once per path at insert time
//! - the run is killed if it exceeds the caller's timeout
//! - spherical media is recognised by the "Spherical Mapping" side data on the video stream

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ProbeError;
use crate::playlist::{MediaInfo, Rational};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const SPHERICAL_SIDE_DATA: &str = "Spherical Mapping";

/// Check if ffprobe is available on the system. Cached per process.
pub fn ffprobe_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        Command::new("ffprobe")
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

/// Probe `path`, giving up after `timeout`.
pub fn probe(path: &Path, timeout: Duration) -> Result<MediaInfo, ProbeError> {
    if !ffprobe_available() {
        return Err(ProbeError::Unavailable);
    }

    let mut child = Command::new("ffprobe")
        .args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    // Drain stdout on a helper thread so a chatty ffprobe cannot block on a full pipe
    let mut stdout = child.stdout.take().ok_or(ProbeError::Failed)?;
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf);
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            log::warn!("ffprobe timed out on {}", path.display());
            return Err(ProbeError::Timeout(timeout));
        }
        thread::sleep(Duration::from_millis(10));
    };

    let output = reader.join().unwrap_or_default();
    if !status.success() {
        return Err(ProbeError::Failed);
    }

    let json: serde_json::Value = serde_json::from_slice(&output)?;
    parse_probe_output(&json)
}

/// Build `MediaInfo` from ffprobe's JSON document.
pub fn parse_probe_output(json: &serde_json::Value) -> Result<MediaInfo, ProbeError> {
    let streams = json["streams"].as_array().ok_or(ProbeError::NoVideoStream)?;
    let video = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or(ProbeError::NoVideoStream)?;

    let format = &json["format"];

    let duration_seconds = number_or_string(&format["duration"])
        .or_else(|| number_or_string(&video["duration"]))
        .unwrap_or(0.0);

    let frame_count = number_or_string(&video["nb_frames"]).map_or(0, |f| f as u64);

    let mut tags: BTreeMap<String, String> = BTreeMap::new();
    for source in [&format["tags"], &video["tags"]] {
        if let Some(map) = source.as_object() {
            for (k, v) in map {
                if let Some(s) = v.as_str() {
                    tags.entry(k.to_lowercase()).or_insert_with(|| s.to_string());
                }
            }
        }
    }
    let title = tags.get("title").cloned();

    let spherical = video["side_data_list"]
        .as_array()
        .is_some_and(|list| {
            list.iter()
                .any(|sd| sd["side_data_type"].as_str() == Some(SPHERICAL_SIDE_DATA))
        });

    Ok(MediaInfo {
        width: video["width"].as_u64().unwrap_or(0) as u32,
        height: video["height"].as_u64().unwrap_or(0) as u32,
        frame_count,
        has_b_frames: video["has_b_frames"].as_u64().unwrap_or(0) > 0,
        avg_frame_rate: parse_frame_rate(video["avg_frame_rate"].as_str().unwrap_or("0/0")),
        r_frame_rate: parse_frame_rate(video["r_frame_rate"].as_str().unwrap_or("0/0")),
        duration_seconds,
        duration_ts: video["duration_ts"].as_i64().unwrap_or(0),
        time_base: parse_rational(video["time_base"].as_str().unwrap_or("0/1")),
        title,
        tags,
        spherical,
    })
}

/// ffprobe emits most numbers as strings.
fn number_or_string(v: &serde_json::Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse::<f64>().ok()))
}

fn parse_rational(s: &str) -> Rational {
    match s.split_once('/') {
        Some((num, den)) => Rational {
            num: num.trim().parse().unwrap_or(0),
            den: den.trim().parse().unwrap_or(1),
        },
        None => Rational {
            num: s.trim().parse().unwrap_or(0),
            den: 1,
        },
    }
}

/// `30000/1001` → 29.97. Zero denominators (ffprobe's "0/0") give 0.
fn parse_frame_rate(rate: &str) -> f64 {
    if let Some((num, den)) = rate.split_once('/') {
        let n: f64 = num.parse().unwrap_or(0.0);
        let d: f64 = den.parse().unwrap_or(0.0);
        if d > 0.0 { n / d } else { 0.0 }
    } else {
        rate.parse().unwrap_or(0.0)
    }
}
