use std::path::PathBuf;

use thiserror::Error;

/// Rejected settings reads and writes.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown settings key '{0}'")]
    UnknownKey(String),
    #[error("settings key '{key}' expects {expected}")]
    TypeMismatch { key: String, expected: &'static str },
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Why a playlist entry could not be loaded into the engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("playlist index {index} out of range (len {len})")]
    InvalidIndex { index: usize, len: usize },
    #[error("media file does not exist: {0}")]
    MissingPath(PathBuf),
    #[error("playlist is empty")]
    EmptyPlaylist,
}

/// Metadata probing failures.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("ffprobe is not installed or not on PATH")]
    Unavailable,
    #[error("ffprobe failed to execute: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("ffprobe timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("ffprobe returned non-zero exit code")]
    Failed,
    #[error("failed to parse ffprobe JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no video stream found")]
    NoVideoStream,
}

/// Fatal initialization failures. The binary exits non-zero on any of these.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported platform: no native video output binding for '{0}'")]
    UnsupportedPlatform(&'static str),
    #[error("media engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("metadata probe unavailable: ffprobe not found")]
    ProbeUnavailable,
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
