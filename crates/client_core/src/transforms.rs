//! Ordered, key-unique set of named effect operations.

use shared::domain::{ControlFamily, NamedTransform, TransformValue};
use thiserror::Error;
use tracing::debug;

pub const SLIDER_MIN: i32 = -100;
pub const SLIDER_MAX: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliderControl {
    pub key: &'static str,
    pub default: i32,
}

const RGB_CONTROLS: &[SliderControl] = &[
    SliderControl {
        key: "red",
        default: 0,
    },
    SliderControl {
        key: "green",
        default: 0,
    },
    SliderControl {
        key: "blue",
        default: 0,
    },
];

const HSV_CONTROLS: &[SliderControl] = &[
    SliderControl {
        key: "hue",
        default: 80,
    },
    SliderControl {
        key: "saturation",
        default: 80,
    },
    // Shown as "Value" in the HSV panel.
    SliderControl {
        key: "brightness",
        default: 80,
    },
];

const ADVANCED_KEYS: &[&str] = &["vignette", "cartoonify", "vibrance", "oil_paint"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PresetValue {
    Number(i32),
    Text(&'static str),
}

impl From<PresetValue> for TransformValue {
    fn from(value: PresetValue) -> Self {
        match value {
            PresetValue::Number(value) => TransformValue::Number(value),
            PresetValue::Text(value) => TransformValue::Text(value.to_string()),
        }
    }
}

use PresetValue::{Number, Text};

/// Preset name -> directives, applied in order through `upsert`.
const PRESETS: &[(&str, &[(&str, PresetValue)])] = &[
    ("all_red", &[("red", Number(100)), ("blue", Number(0)), ("green", Number(0))]),
    ("all_blue", &[("red", Number(0)), ("blue", Number(100)), ("green", Number(0))]),
    ("all_green", &[("red", Number(0)), ("blue", Number(0)), ("green", Number(100))]),
    ("grayscale", &[("saturation", Number(-70))]),
    ("sepia", &[("hue", Number(20)), ("saturation", Number(-20))]),
    ("cartoon", &[("cartoonify", Text("20:60"))]),
    ("vignette", &[("vignette", Text("30"))]),
    ("oil_painting", &[("oil_paint", Text("40"))]),
    ("vibrance", &[("vibrance", Text("70"))]),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("'{0}' is not a slider control")]
    UnknownControl(String),
}

pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(name, _)| *name)
}

pub fn family_controls(family: ControlFamily) -> &'static [SliderControl] {
    match family {
        ControlFamily::Rgb => RGB_CONTROLS,
        ControlFamily::Hsv => HSV_CONTROLS,
        ControlFamily::Advanced => &[],
    }
}

pub fn family_keys(family: ControlFamily) -> Vec<&'static str> {
    match family {
        ControlFamily::Advanced => ADVANCED_KEYS.to_vec(),
        _ => family_controls(family).iter().map(|c| c.key).collect(),
    }
}

fn slider_family(key: &str) -> Option<ControlFamily> {
    [ControlFamily::Rgb, ControlFamily::Hsv]
        .into_iter()
        .find(|family| family_controls(*family).iter().any(|c| c.key == key))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformSetManager {
    transforms: Vec<NamedTransform>,
}

impl TransformSetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any entry with the same key and moves it to the end.
    pub fn upsert(&mut self, key: impl Into<String>, value: impl Into<TransformValue>) {
        let transform = NamedTransform::new(key, value);
        self.transforms.retain(|t| t.key != transform.key);
        self.transforms.push(transform);
    }

    /// Current value for `key`, falling back to the family's slider default.
    pub fn read(&self, key: &str, family: ControlFamily) -> Option<TransformValue> {
        if let Some(transform) = self.transforms.iter().find(|t| t.key == key) {
            return Some(transform.value.clone());
        }
        family_controls(family)
            .iter()
            .find(|c| c.key == key)
            .map(|c| TransformValue::Number(c.default))
    }

    pub fn reset_keys<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: Vec<S> = keys.into_iter().collect();
        self.transforms
            .retain(|t| !keys.iter().any(|k| k.as_ref() == t.key));
    }

    pub fn reset_family(&mut self, family: ControlFamily) {
        self.reset_keys(family_keys(family));
    }

    pub fn apply_preset(&mut self, name: &str) -> Result<(), TransformError> {
        let (_, directives) = PRESETS
            .iter()
            .find(|(preset, _)| *preset == name)
            .ok_or_else(|| TransformError::UnknownPreset(name.to_string()))?;
        for (key, value) in directives.iter() {
            self.upsert(*key, TransformValue::from(*value));
        }
        debug!(preset = name, entries = self.transforms.len(), "applied preset");
        Ok(())
    }

    /// Slider input for the RGB and HSV families, clamped to the slider range.
    pub fn set_slider(&mut self, key: &str, value: i32) -> Result<(), TransformError> {
        if slider_family(key).is_none() {
            return Err(TransformError::UnknownControl(key.to_string()));
        }
        self.upsert(key, value.clamp(SLIDER_MIN, SLIDER_MAX));
        Ok(())
    }

    pub fn serialize(&self) -> Vec<NamedTransform> {
        self.transforms.clone()
    }

    pub fn transforms(&self) -> &[NamedTransform] {
        &self.transforms
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/transforms_tests.rs"]
mod tests;
