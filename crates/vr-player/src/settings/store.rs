use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::schema::{self, keys, SettingValue};
use crate::engine::{Equalizer, EQ_BANDS};
use crate::error::SettingsError;
use crate::loop_mode::LoopMode;

/// Typed persistent key/value store validated against [`schema::schema`].
///
/// Every accepted write is persisted immediately when the store has a path.
pub struct SettingsStore {
    values: BTreeMap<String, SettingValue>,
    path: Option<PathBuf>,
}

impl SettingsStore {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vr-player").join("settings.json"))
    }

    /// Load from the platform user-config location.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::open(path),
            None => {
                log::warn!("No user config directory, settings will not persist");
                Self::in_memory()
            }
        }
    }

    /// Load from `path`. Missing or unreadable files yield defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<serde_json::Value>(&contents) {
                Ok(json) => {
                    log::info!("Loaded settings from {}", path.display());
                    parse_values(&json)
                }
                Err(e) => {
                    log::warn!("Failed to parse settings {}: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(_) => {
                log::info!("No settings found at {}, using defaults", path.display());
                BTreeMap::new()
            }
        };
        Self {
            values,
            path: Some(path),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            values: BTreeMap::new(),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current value of `key`, or its schema default when never written.
    pub fn get(&self, key: &str) -> Result<&SettingValue, SettingsError> {
        let def = schema::lookup(key).ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        Ok(self.values.get(key).unwrap_or(&def.default))
    }

    /// Validate and store `value`. Rejected writes leave the prior value in place.
    pub fn set(&mut self, key: &str, value: impl Into<SettingValue>) -> Result<(), SettingsError> {
        let def = schema::lookup(key).ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        let value = def.validate(value.into())?;
        if self.values.get(key) == Some(&value) {
            return Ok(());
        }
        self.values.insert(key.to_string(), value);
        if let Err(e) = self.save() {
            log::error!("Failed to persist settings: {e}");
        }
        Ok(())
    }

    /// Forget a stored value so reads return the default again.
    pub fn reset(&mut self, key: &str) -> Result<(), SettingsError> {
        if schema::lookup(key).is_none() {
            return Err(SettingsError::UnknownKey(key.to_string()));
        }
        if self.values.remove(key).is_some() {
            if let Err(e) = self.save() {
                log::error!("Failed to persist settings: {e}");
            }
        }
        Ok(())
    }

    /// Write every schema key. No-op for in-memory stores.
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut snapshot = serde_json::Map::new();
        for def in schema::schema() {
            let value = self.values.get(&def.key).unwrap_or(&def.default);
            snapshot.insert(def.key.clone(), serde_json::to_value(value)?);
        }
        let json = serde_json::to_string_pretty(&serde_json::Value::Object(snapshot))?;
        std::fs::write(path, json)?;
        log::debug!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, SettingsError> {
        match self.get(key)? {
            SettingValue::Bool(b) => Ok(*b),
            _ => Err(mismatch(key, "a boolean")),
        }
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, SettingsError> {
        match self.get(key)? {
            SettingValue::Int(i) => Ok(*i),
            _ => Err(mismatch(key, "an integer")),
        }
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, SettingsError> {
        match self.get(key)? {
            SettingValue::Float(f) => Ok(*f),
            _ => Err(mismatch(key, "a number")),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<&str, SettingsError> {
        match self.get(key)? {
            SettingValue::Text(s) => Ok(s),
            _ => Err(mismatch(key, "a string")),
        }
    }

    pub fn get_list(&self, key: &str) -> Result<&[String], SettingsError> {
        match self.get(key)? {
            SettingValue::List(l) => Ok(l),
            _ => Err(mismatch(key, "a list of strings")),
        }
    }

    // Typed accessors for the keys the core reads. The schema guarantees the
    // types, so these fall back to defaults instead of failing.

    pub fn loop_mode(&self) -> LoopMode {
        self.get_str(keys::LOOP_MODE)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn view_scale(&self) -> f64 {
        self.get_f64(keys::VIEW_SCALE).unwrap_or(1.0)
    }

    pub fn auto_resize(&self) -> bool {
        self.get_bool(keys::AUTO_RESIZE).unwrap_or(false)
    }

    pub fn volume(&self) -> i64 {
        self.get_i64(keys::VOLUME).unwrap_or(50)
    }

    pub fn url(&self) -> &str {
        self.get_str(keys::URL).unwrap_or(schema::DEFAULT_URL)
    }

    pub fn hw_accel(&self) -> bool {
        self.get_bool(keys::HW_ACCEL).unwrap_or(true)
    }

    pub fn meta_tags(&self) -> Vec<String> {
        self.get_list(keys::META_TAGS)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    /// Persisted equalizer bands, or `None` when the equalizer is disabled.
    pub fn equalizer(&self) -> Option<Equalizer> {
        if !self.get_bool(keys::AUDIO_EQ_ENABLE).unwrap_or(false) {
            return None;
        }
        let mut eq = Equalizer {
            preamp: self.get_f64(keys::AUDIO_EQ_PREAMP).unwrap_or(0.0) as f32,
            amps: [0.0; EQ_BANDS],
        };
        for (band, amp) in eq.amps.iter_mut().enumerate() {
            *amp = self.get_f64(&keys::audio_eq_amp(band)).unwrap_or(0.0) as f32;
        }
        Some(eq)
    }
}

fn mismatch(key: &str, expected: &'static str) -> SettingsError {
    SettingsError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

/// Keep every schema key whose stored value is valid. Invalid entries fall
/// back to their default with a warning; unknown keys are dropped.
fn parse_values(json: &serde_json::Value) -> BTreeMap<String, SettingValue> {
    let mut values = BTreeMap::new();
    let Some(object) = json.as_object() else {
        log::warn!("Settings file is not a JSON object, using defaults");
        return values;
    };
    for def in schema::schema() {
        let Some(raw) = object.get(&def.key) else {
            continue;
        };
        match def.from_json(raw) {
            Ok(value) => {
                values.insert(def.key.clone(), value);
            }
            Err(e) => log::warn!("Ignoring stored setting: {e}"),
        }
    }
    values
}
