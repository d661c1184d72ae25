use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::Serialize;

use crate::error::SettingsError;

pub mod keys {
    pub const LOOP_MODE: &str = "loop_mode";
    pub const STAY_ON_TOP: &str = "stay_on_top";
    pub const VIEW_SCALE: &str = "view_scale";
    pub const AUTO_RESIZE: &str = "auto_resize";
    pub const COLOR_THEME: &str = "color_theme";
    pub const URL: &str = "url";
    pub const VOLUME: &str = "volume";
    pub const META_TAGS: &str = "meta_tags";
    pub const IMAGE_EFFECTS_ENABLE: &str = "image_effects_enable";
    pub const IMAGE_EFFECTS_CONTRAST: &str = "image_effects_contrast";
    pub const IMAGE_EFFECTS_BRIGHTNESS: &str = "image_effects_brightness";
    pub const IMAGE_EFFECTS_SATURATION: &str = "image_effects_saturation";
    pub const IMAGE_EFFECTS_GAMMA: &str = "image_effects_gamma";
    pub const IMAGE_EFFECTS_HUE: &str = "image_effects_hue";
    pub const AUDIO_EQ_ENABLE: &str = "audio_eq_enable";
    pub const AUDIO_EQ_PREAMP: &str = "audio_eq_preamp";
    pub const AUDIO_EQ_USER_PRESETS: &str = "audio_eq_user_presets";
    pub const HW_ACCEL: &str = "hw_accel";

    /// Key of equalizer band `index` (0-9).
    pub fn audio_eq_amp(index: usize) -> String {
        format!("audio_eq_amp_{index}")
    }
}

/// Orientation server the client connects to until the user picks another.
pub const DEFAULT_URL: &str = "ws://127.0.0.1:8765";

/// Playlist columns shown by default.
pub const DEFAULT_META_TAGS: &[&str] = &["title", "duration", "resolution", "frame_rate"];

/// The zoom levels the frame can be scaled to.
pub const VIEW_SCALES: &[f64] = &[0.25, 0.5, 1.0, 2.0];

/// A stored setting value. Serializes to the native JSON type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
    Presets(BTreeMap<String, BTreeMap<String, f64>>),
}

impl SettingValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "a boolean",
            SettingValue::Int(_) => "an integer",
            SettingValue::Float(_) => "a number",
            SettingValue::Text(_) => "a string",
            SettingValue::List(_) => "a list of strings",
            SettingValue::Presets(_) => "a map of presets",
        }
    }

    fn same_kind(&self, other: &SettingValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Float(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Text(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::Text(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Free,
    OneOfText(&'static [&'static str]),
    OneOfFloat(&'static [f64]),
    IntRange { min: i64, max: i64 },
    FloatRange { min: f64, max: f64 },
}

#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: String,
    pub default: SettingValue,
    pub constraint: Constraint,
}

impl SettingDef {
    fn new(
        key: impl Into<String>,
        default: impl Into<SettingValue>,
        constraint: Constraint,
    ) -> Self {
        Self {
            key: key.into(),
            default: default.into(),
            constraint,
        }
    }

    /// Check `value` against this key's type and constraint.
    ///
    /// Integers are accepted for numeric keys since the conversion is exact for
    /// every value the constraints allow.
    pub fn validate(&self, value: SettingValue) -> Result<SettingValue, SettingsError> {
        let value = match (&self.default, value) {
            (SettingValue::Float(_), SettingValue::Int(i)) => SettingValue::Float(i as f64),
            (_, v) => v,
        };
        if !value.same_kind(&self.default) {
            return Err(SettingsError::TypeMismatch {
                key: self.key.clone(),
                expected: self.default.kind_name(),
            });
        }

        let invalid = |reason: String| SettingsError::InvalidValue {
            key: self.key.clone(),
            reason,
        };

        match (&self.constraint, &value) {
            (Constraint::Free, _) => {}
            (Constraint::OneOfText(options), SettingValue::Text(s)) => {
                if !options.iter().any(|o| *o == s.as_str()) {
                    return Err(invalid(format!("'{s}' is not one of {options:?}")));
                }
            }
            (Constraint::OneOfFloat(options), SettingValue::Float(f)) => {
                if !options.iter().any(|o| (o - f).abs() < 1e-9) {
                    return Err(invalid(format!("{f} is not one of {options:?}")));
                }
            }
            (Constraint::IntRange { min, max }, SettingValue::Int(i)) => {
                if i < min || i > max {
                    return Err(invalid(format!("{i} is outside [{min}, {max}]")));
                }
            }
            (Constraint::FloatRange { min, max }, SettingValue::Float(f)) => {
                if !f.is_finite() || f < min || f > max {
                    return Err(invalid(format!("{f} is outside [{min}, {max}]")));
                }
            }
            _ => {}
        }
        Ok(value)
    }

    /// Convert a value read back from the settings file.
    pub fn from_json(&self, json: &serde_json::Value) -> Result<SettingValue, SettingsError> {
        let mismatch = || SettingsError::TypeMismatch {
            key: self.key.clone(),
            expected: self.default.kind_name(),
        };
        let value = match &self.default {
            SettingValue::Bool(_) => SettingValue::Bool(json.as_bool().ok_or_else(mismatch)?),
            SettingValue::Int(_) => SettingValue::Int(json.as_i64().ok_or_else(mismatch)?),
            SettingValue::Float(_) => SettingValue::Float(json.as_f64().ok_or_else(mismatch)?),
            SettingValue::Text(_) => {
                SettingValue::Text(json.as_str().ok_or_else(mismatch)?.to_string())
            }
            SettingValue::List(_) => SettingValue::List(
                serde_json::from_value(json.clone()).map_err(|_| mismatch())?,
            ),
            SettingValue::Presets(_) => SettingValue::Presets(
                serde_json::from_value(json.clone()).map_err(|_| mismatch())?,
            ),
        };
        self.validate(value)
    }
}

/// Every recognized key with its default and constraint.
pub fn schema() -> &'static [SettingDef] {
    static SCHEMA: OnceLock<Vec<SettingDef>> = OnceLock::new();
    SCHEMA.get_or_init(build_schema)
}

/// Definition for `key`, if it is part of the schema.
pub fn lookup(key: &str) -> Option<&'static SettingDef> {
    schema().iter().find(|d| d.key == key)
}

fn build_schema() -> Vec<SettingDef> {
    use keys::*;

    let eq_range = Constraint::FloatRange { min: -20.0, max: 20.0 };

    let mut defs = vec![
        SettingDef::new(LOOP_MODE, "off", Constraint::OneOfText(&["off", "one", "all"])),
        SettingDef::new(STAY_ON_TOP, false, Constraint::Free),
        SettingDef::new(VIEW_SCALE, 1.0, Constraint::OneOfFloat(VIEW_SCALES)),
        SettingDef::new(AUTO_RESIZE, false, Constraint::Free),
        SettingDef::new(COLOR_THEME, "dark", Constraint::OneOfText(&["light", "dark"])),
        SettingDef::new(URL, DEFAULT_URL, Constraint::Free),
        SettingDef::new(VOLUME, 50i64, Constraint::IntRange { min: 1, max: 100 }),
        SettingDef::new(
            META_TAGS,
            SettingValue::List(DEFAULT_META_TAGS.iter().map(|s| (*s).to_string()).collect()),
            Constraint::Free,
        ),
        SettingDef::new(IMAGE_EFFECTS_ENABLE, false, Constraint::Free),
        SettingDef::new(
            IMAGE_EFFECTS_CONTRAST,
            1.0,
            Constraint::FloatRange { min: 0.0, max: 2.0 },
        ),
        SettingDef::new(
            IMAGE_EFFECTS_BRIGHTNESS,
            1.0,
            Constraint::FloatRange { min: 0.0, max: 2.0 },
        ),
        SettingDef::new(
            IMAGE_EFFECTS_SATURATION,
            1.0,
            Constraint::FloatRange { min: 0.0, max: 3.0 },
        ),
        SettingDef::new(
            IMAGE_EFFECTS_GAMMA,
            1.0,
            Constraint::FloatRange { min: 0.01, max: 10.0 },
        ),
        SettingDef::new(
            IMAGE_EFFECTS_HUE,
            0.0,
            Constraint::FloatRange { min: -180.0, max: 180.0 },
        ),
        SettingDef::new(AUDIO_EQ_ENABLE, false, Constraint::Free),
        SettingDef::new(AUDIO_EQ_PREAMP, 0.0, eq_range.clone()),
    ];
    for band in 0..crate::engine::EQ_BANDS {
        defs.push(SettingDef::new(audio_eq_amp(band), 0.0, eq_range.clone()));
    }
    defs.push(SettingDef::new(
        AUDIO_EQ_USER_PRESETS,
        SettingValue::Presets(BTreeMap::new()),
        Constraint::Free,
    ));
    defs.push(SettingDef::new(HW_ACCEL, true, Constraint::Free));
    defs
}
