//! Persisted image-adjust, equalizer and volume values pushed into the engine.

use crate::engine::{AdjustOption, MediaEngine};
use crate::settings::{keys, SettingsStore};

/// Setting key backing a float adjust option.
pub fn adjust_key(option: AdjustOption) -> &'static str {
    match option {
        AdjustOption::Enable => keys::IMAGE_EFFECTS_ENABLE,
        AdjustOption::Contrast => keys::IMAGE_EFFECTS_CONTRAST,
        AdjustOption::Brightness => keys::IMAGE_EFFECTS_BRIGHTNESS,
        AdjustOption::Hue => keys::IMAGE_EFFECTS_HUE,
        AdjustOption::Saturation => keys::IMAGE_EFFECTS_SATURATION,
        AdjustOption::Gamma => keys::IMAGE_EFFECTS_GAMMA,
    }
}

pub fn is_image_key(key: &str) -> bool {
    key.starts_with("image_effects_")
}

pub fn is_equalizer_key(key: &str) -> bool {
    key == keys::AUDIO_EQ_ENABLE || key == keys::AUDIO_EQ_PREAMP || key.starts_with("audio_eq_amp_")
}

/// Enable/disable the adjust filter and push every float value when enabled.
pub fn apply_image_adjust(engine: &mut dyn MediaEngine, settings: &SettingsStore) {
    let enabled = settings.get_bool(keys::IMAGE_EFFECTS_ENABLE).unwrap_or(false);
    engine.video_set_adjust_int(AdjustOption::Enable, i32::from(enabled));
    if !enabled {
        return;
    }
    for &option in AdjustOption::FLOATS {
        match settings.get_f64(adjust_key(option)) {
            Ok(value) => engine.video_set_adjust_float(option, value as f32),
            Err(e) => log::warn!("Skipping {option:?}: {e}"),
        }
    }
}

pub fn apply_equalizer(engine: &mut dyn MediaEngine, settings: &SettingsStore) {
    engine.set_equalizer(settings.equalizer().as_ref());
}

pub fn apply_volume(engine: &mut dyn MediaEngine, settings: &SettingsStore) {
    let volume = i32::try_from(settings.volume()).unwrap_or(50);
    engine.audio_set_volume(volume);
}

/// Startup and media-change path.
pub fn apply_all(engine: &mut dyn MediaEngine, settings: &SettingsStore) {
    apply_image_adjust(engine, settings);
    apply_equalizer(engine, settings);
    apply_volume(engine, settings);
}
