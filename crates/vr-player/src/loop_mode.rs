use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Playlist repeat policy consulted when an entry finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    #[default]
    Off,
    One,
    All,
}

impl LoopMode {
    pub const ALL: &[LoopMode] = &[LoopMode::Off, LoopMode::One, LoopMode::All];

    /// Next mode in the off → one → all → off cycle.
    pub fn next(self) -> Self {
        match self {
            LoopMode::Off => LoopMode::One,
            LoopMode::One => LoopMode::All,
            LoopMode::All => LoopMode::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoopMode::Off => "off",
            LoopMode::One => "one",
            LoopMode::All => "all",
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoopMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(LoopMode::Off),
            "one" => Ok(LoopMode::One),
            "all" => Ok(LoopMode::All),
            other => Err(format!("unknown loop mode '{other}'")),
        }
    }
}

/// Holder for the current mode. Persistence goes through the settings store
/// (see `Coordinator::rotate_loop_mode`).
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopState {
    mode: LoopMode,
}

impl LoopState {
    pub fn new(mode: LoopMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    pub fn set(&mut self, mode: LoopMode) {
        self.mode = mode;
    }

    /// Advance one step and return the new mode.
    pub fn rotate(&mut self) -> LoopMode {
        self.mode = self.mode.next();
        self.mode
    }
}
