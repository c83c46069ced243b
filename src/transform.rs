//! Value transforms between wire encodings and logical units
//!
//! Pure functions plus the named transform enums referenced from the address
//! tables. Forward transforms feed derived fields, reverse transforms turn a
//! derived-field write back into the owning field's value, and write
//! transforms normalise a value into the device's write format.

use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::value::MixerValue;

/// X32/X-Air scribble strip palette, indexed by wire value
const XSERIES_COLORS: [&str; 16] = [
    "OFF", "RD", "GN", "YE", "BL", "MG", "CY", "WH", "OFFi", "RDi", "GNi", "YEi", "BLi", "MGi",
    "CYi", "WHi",
];

/// WING palette (firmware 3.1+). Wire indices are 1-based, `0` means no colour.
const WING_COLORS: [&str; 18] = [
    "GRAY_BLUE",
    "MEDIUM_BLUE",
    "DARK_BLUE",
    "TURQUOISE",
    "GREEN",
    "OLIVE_GREEN",
    "YELLOW",
    "ORANGE",
    "RED",
    "CORAL",
    "PINK",
    "MAUVE",
    "LIGHT_GRAY",
    "WHITE",
    "BROWN",
    "PURPLE",
    "LIGHT_BLUE",
    "LIGHT_GREEN",
];

const WING_COLOR_OFF: &str = "OFF";
const WING_COLOR_FALLBACK_PREFIX: &str = "COLOR_";

/// WING local headamp gain limits and step (dB)
pub const WING_GAIN_MIN_DB: f64 = -2.5;
pub const WING_GAIN_MAX_DB: f64 = 45.0;
pub const WING_GAIN_STEP_DB: f64 = 2.5;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Normalised fader position (0..1) to dB, one decimal place
pub fn fader_to_db(position: f64) -> f64 {
    if position >= 1.0 {
        10.0
    } else if position >= 0.5 {
        round1(40.0 * position - 30.0)
    } else if position >= 0.25 {
        round1(80.0 * position - 50.0)
    } else if position >= 0.0625 {
        round1(160.0 * position - 70.0)
    } else if position >= 0.0 {
        round1(480.0 * position - 90.0)
    } else {
        -90.0
    }
}

/// dB to normalised fader position, clamped to [0, 1]
pub fn db_to_fader(db: f64) -> f64 {
    if db >= 10.0 {
        1.0
    } else if db >= -10.0 {
        (db + 30.0) / 40.0
    } else if db >= -30.0 {
        (db + 50.0) / 80.0
    } else if db >= -60.0 {
        (db + 70.0) / 160.0
    } else if db >= -90.0 {
        (db + 90.0) / 480.0
    } else {
        0.0
    }
}

/// Affine decode of a normalised value into `[min, max]`
pub fn linear_scaled_to_db(normalized: f64, min: f64, max: f64) -> f64 {
    min + (max - min) * normalized
}

/// Inverse of [`linear_scaled_to_db`]
pub fn db_to_linear_scaled(value: f64, min: f64, max: f64) -> f64 {
    (value - min) / (max - min)
}

pub fn color_index_to_name(index: i64) -> Result<&'static str, TransformError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| XSERIES_COLORS.get(i).copied())
        .ok_or_else(|| TransformError::UnknownColor(index.to_string()))
}

pub fn color_name_to_index(name: &str) -> Result<i64, TransformError> {
    XSERIES_COLORS
        .iter()
        .position(|c| *c == name)
        .map(|i| i as i64)
        .ok_or_else(|| TransformError::UnknownColor(name.to_string()))
}

/// WING colour index (1-based on the wire) to name.
///
/// This is the only place the 1-based offset is removed; unknown indices
/// round-trip as `COLOR_<n>`.
pub fn wing_color_index_to_name(index: i64) -> String {
    if index == 0 {
        return WING_COLOR_OFF.to_string();
    }
    usize::try_from(index - 1)
        .ok()
        .and_then(|i| WING_COLORS.get(i))
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("{}{}", WING_COLOR_FALLBACK_PREFIX, index))
}

pub fn wing_color_name_to_index(name: &str) -> Result<i64, TransformError> {
    if name == WING_COLOR_OFF {
        return Ok(0);
    }
    if let Some(pos) = WING_COLORS.iter().position(|c| *c == name) {
        return Ok(pos as i64 + 1);
    }
    name.strip_prefix(WING_COLOR_FALLBACK_PREFIX)
        .and_then(|n| n.parse::<i64>().ok())
        .ok_or_else(|| TransformError::UnknownColor(name.to_string()))
}

/// Clamp to the WING headamp range and snap to the nearest gain step
pub fn quantize_gain(db: f64) -> f64 {
    let clamped = db.clamp(WING_GAIN_MIN_DB, WING_GAIN_MAX_DB);
    (clamped / WING_GAIN_STEP_DB).round() * WING_GAIN_STEP_DB
}

/// Range used by `linear_scaled` fields and the linf transforms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleConfig {
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

impl ScaleConfig {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            step: None,
        }
    }
}

/// Named transforms usable for derived (secondary) fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    FaderToDb,
    DbToFader,
    ColorIndexToName,
    ColorNameToIndex,
    WingColorIndexToName,
    WingColorNameToIndex,
    LinfToDb,
    DbToLinf,
}

impl Transform {
    /// Apply the transform; `scale` is the owning field's range
    pub fn apply(
        self,
        value: &MixerValue,
        scale: Option<&ScaleConfig>,
    ) -> Result<MixerValue, TransformError> {
        match self {
            Transform::FaderToDb => Ok(MixerValue::Float(fader_to_db(value.require_f64()?))),
            Transform::DbToFader => Ok(MixerValue::Float(db_to_fader(value.require_f64()?))),
            Transform::ColorIndexToName => {
                color_index_to_name(value.require_i64()?).map(MixerValue::from)
            },
            Transform::ColorNameToIndex => {
                let name = value
                    .as_str()
                    .ok_or_else(|| TransformError::NotText(value.to_string()))?;
                color_name_to_index(name).map(MixerValue::Int)
            },
            Transform::WingColorIndexToName => Ok(MixerValue::Text(wing_color_index_to_name(
                value.require_i64()?,
            ))),
            Transform::WingColorNameToIndex => {
                let name = value
                    .as_str()
                    .ok_or_else(|| TransformError::NotText(value.to_string()))?;
                wing_color_name_to_index(name).map(MixerValue::Int)
            },
            Transform::LinfToDb => {
                let scale = scale.ok_or(TransformError::MissingScale("linf_to_db"))?;
                Ok(MixerValue::Float(linear_scaled_to_db(
                    value.require_f64()?,
                    scale.min,
                    scale.max,
                )))
            },
            Transform::DbToLinf => {
                let scale = scale.ok_or(TransformError::MissingScale("db_to_linf"))?;
                Ok(MixerValue::Float(db_to_linear_scaled(
                    value.require_f64()?,
                    scale.min,
                    scale.max,
                )))
            },
        }
    }
}

/// Device-specific write normalisation, applied last before sending.
///
/// Both variants produce the WING's text form, which the console reads as a
/// value in units rather than a normalised position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteTransform {
    /// Normalised fader position to a dB string
    FaderToDb,
    /// Headamp gain in dB, clamped and snapped to 2.5 dB steps
    GainQuantize,
}

impl WriteTransform {
    pub fn apply(self, value: &MixerValue) -> Result<MixerValue, TransformError> {
        let number = value.require_f64()?;
        let out = match self {
            WriteTransform::FaderToDb => fader_to_db(number),
            WriteTransform::GainQuantize => quantize_gain(number),
        };
        Ok(MixerValue::Text(format!("{:.1}", out)))
    }
}

/// What to do with a wire code missing from an enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCodePolicy {
    /// Fail the decode; the message is dropped and logged
    #[default]
    Reject,
    /// Decode as the synthetic label `UNKNOWN_<raw>`
    Label,
}

/// One `(wire code, label)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumEntry(pub MixerValue, pub String);

/// Finite bidirectional mapping between wire codes and labels
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Enumeration {
    #[serde(default)]
    pub unknown: UnknownCodePolicy,
    pub entries: Vec<EnumEntry>,
}

impl Enumeration {
    pub fn new(entries: Vec<EnumEntry>) -> Self {
        Self {
            unknown: UnknownCodePolicy::Reject,
            entries,
        }
    }

    pub fn with_policy(mut self, unknown: UnknownCodePolicy) -> Self {
        self.unknown = unknown;
        self
    }

    pub fn decode(&self, raw: &MixerValue) -> Result<String, TransformError> {
        if let Some(entry) = self.entries.iter().find(|e| e.0.loosely_equals(raw)) {
            return Ok(entry.1.clone());
        }
        match self.unknown {
            UnknownCodePolicy::Reject => Err(TransformError::UnknownCode(raw.to_string())),
            UnknownCodePolicy::Label => Ok(format!("UNKNOWN_{}", raw)),
        }
    }

    /// Label to wire code. When several codes share a label the last one
    /// declared wins, so tables that list numeric codes first and then
    /// identity text entries write the text form.
    pub fn encode(&self, label: &MixerValue) -> Result<MixerValue, TransformError> {
        let wanted = match label {
            MixerValue::Text(s) => s.as_str(),
            other => return Err(TransformError::NotText(other.to_string())),
        };
        self.entries
            .iter()
            .rev()
            .find(|e| e.1 == wanted)
            .map(|e| e.0.clone())
            .ok_or_else(|| TransformError::UnknownLabel(wanted.to_string()))
    }
}
