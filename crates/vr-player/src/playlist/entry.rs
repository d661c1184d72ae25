use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Stable identity of a playlist entry, assigned at insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

/// Rational number as reported by the prober (`num/den`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: i64,
    pub den: i64,
}

impl Rational {
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self { num: 0, den: 1 }
    }
}

/// Probed media metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: u64,
    pub has_b_frames: bool,
    pub avg_frame_rate: f64,
    pub r_frame_rate: f64,
    pub duration_seconds: f64,
    pub duration_ts: i64,
    pub time_base: Rational,
    pub title: Option<String>,
    pub tags: BTreeMap<String, String>,
    /// Spherical-mapping side data present on the video stream.
    pub spherical: bool,
}

impl MediaInfo {
    /// Placeholder for files the prober could not read.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Frame rate used to pace per-frame work: average rate, falling back to
    /// the real base rate, then 30 fps.
    pub fn pacing_fps(&self) -> f64 {
        [self.avg_frame_rate, self.r_frame_rate]
            .into_iter()
            .find(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(30.0)
    }

    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// One playlist item. Immutable after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEntry {
    id: EntryId,
    path: PathBuf,
    info: MediaInfo,
}

impl MediaEntry {
    pub fn new(id: EntryId, path: PathBuf, info: MediaInfo) -> Self {
        Self { id, path, info }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    pub fn is_spherical(&self) -> bool {
        self.info.spherical
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }

    /// Title tag, or the file name when the media has none.
    pub fn display_title(&self) -> String {
        self.info
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.file_name())
    }
}
