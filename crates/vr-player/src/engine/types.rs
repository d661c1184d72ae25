use serde::{Deserialize, Serialize};

/// Transport state reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Nothing loaded or nothing special happening.
    #[default]
    Idle,
    Opening,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Ended,
    Error,
}

impl EngineState {
    pub fn display_name(&self) -> &'static str {
        match self {
            EngineState::Idle => "Idle",
            EngineState::Opening => "Opening",
            EngineState::Buffering => "Buffering",
            EngineState::Playing => "Playing",
            EngineState::Paused => "Paused",
            EngineState::Stopped => "Stopped",
            EngineState::Ended => "Ended",
            EngineState::Error => "Error",
        }
    }
}

/// Engine callback classes, delivered to the event context as posted events.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Playing,
    Paused,
    Stopped,
    Opening,
    EndReached,
    /// Authoritative playback position in [0, 1].
    PositionChanged(f32),
    MediaChanged,
    /// Audio volume in [0, 1].
    AudioVolume(f32),
    /// Number of active video outputs.
    Vout(u32),
    EncounteredError,
}

/// Image adjustment filter options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjustOption {
    Enable,
    Contrast,
    Brightness,
    Hue,
    Saturation,
    Gamma,
}

impl AdjustOption {
    pub const FLOATS: &[AdjustOption] = &[
        AdjustOption::Contrast,
        AdjustOption::Brightness,
        AdjustOption::Hue,
        AdjustOption::Saturation,
        AdjustOption::Gamma,
    ];
}

/// Number of equalizer bands the engine exposes.
pub const EQ_BANDS: usize = 10;

/// Ten-band equalizer with preamp, all values in dB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equalizer {
    pub preamp: f32,
    pub amps: [f32; EQ_BANDS],
}

impl Default for Equalizer {
    fn default() -> Self {
        Self {
            preamp: 0.0,
            amps: [0.0; EQ_BANDS],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_state_default_is_idle() {
        assert_eq!(EngineState::default(), EngineState::Idle);
        assert_eq!(EngineState::Ended.display_name(), "Ended");
    }

    #[test]
    fn equalizer_default_is_flat() {
        let eq = Equalizer::default();
        assert!(eq.preamp.abs() < 1e-9);
        assert!(eq.amps.iter().all(|a| a.abs() < 1e-9));
    }

    #[test]
    fn float_adjust_options_exclude_enable() {
        assert_eq!(AdjustOption::FLOATS.len(), 5);
        assert!(!AdjustOption::FLOATS.contains(&AdjustOption::Enable));
    }
}
