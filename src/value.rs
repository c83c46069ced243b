//! Wire and logical value representation
//!
//! The same enum carries raw OSC arguments and decoded logical values; a
//! logical value is always a scalar, except for composite replies that have
//! no `value_index` and more than one element.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TransformError;

/// A scalar (or composite) value exchanged with the mixer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MixerValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<MixerValue>),
}

impl MixerValue {
    /// Numeric view; numeric text (the WING sometimes sends numbers as strings) is parsed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MixerValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            MixerValue::Int(i) => Some(*i as f64),
            MixerValue::Float(f) => Some(*f),
            MixerValue::Text(s) => s.trim().parse::<f64>().ok(),
            MixerValue::List(_) => None,
        }
    }

    /// Integer view; floats must be integral
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MixerValue::Int(i) => Some(*i),
            MixerValue::Bool(b) => Some(*b as i64),
            MixerValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            MixerValue::Text(s) => {
                let trimmed = s.trim();
                trimmed.parse::<i64>().ok().or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| f as i64)
                })
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MixerValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness used by the boolean data types.
    ///
    /// Numeric text is judged by its number, so `"0"` is false.
    pub fn truthy(&self) -> bool {
        match self {
            MixerValue::Bool(b) => *b,
            MixerValue::Int(i) => *i != 0,
            MixerValue::Float(f) => *f != 0.0,
            MixerValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) => n != 0.0,
                Err(_) => !s.is_empty(),
            },
            MixerValue::List(items) => !items.is_empty(),
        }
    }

    /// Numeric view or a `NotNumeric` error
    pub fn require_f64(&self) -> Result<f64, TransformError> {
        self.as_f64()
            .ok_or_else(|| TransformError::NotNumeric(self.to_string()))
    }

    /// Integer view or a `NotNumeric` error
    pub fn require_i64(&self) -> Result<i64, TransformError> {
        self.as_i64()
            .ok_or_else(|| TransformError::NotNumeric(self.to_string()))
    }

    /// Loose equality used for enumeration lookups: numbers compare by value
    pub fn loosely_equals(&self, other: &MixerValue) -> bool {
        match (self, other) {
            (MixerValue::Text(a), MixerValue::Text(b)) => a == b,
            (MixerValue::Text(_), _) | (_, MixerValue::Text(_)) => false,
            (MixerValue::List(a), MixerValue::List(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Parse a value typed on a command line: bool, int, float, else text
    pub fn parse_loose(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed {
            "true" | "on" => return MixerValue::Bool(true),
            "false" | "off" => return MixerValue::Bool(false),
            _ => {},
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return MixerValue::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return MixerValue::Float(f);
        }
        MixerValue::Text(trimmed.to_string())
    }
}

impl fmt::Display for MixerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixerValue::Bool(b) => write!(f, "{}", b),
            MixerValue::Int(i) => write!(f, "{}", i),
            MixerValue::Float(x) => write!(f, "{}", x),
            MixerValue::Text(s) => write!(f, "{}", s),
            MixerValue::List(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            },
        }
    }
}

impl From<bool> for MixerValue {
    fn from(v: bool) -> Self {
        MixerValue::Bool(v)
    }
}

impl From<i64> for MixerValue {
    fn from(v: i64) -> Self {
        MixerValue::Int(v)
    }
}

impl From<i32> for MixerValue {
    fn from(v: i32) -> Self {
        MixerValue::Int(v as i64)
    }
}

impl From<f64> for MixerValue {
    fn from(v: f64) -> Self {
        MixerValue::Float(v)
    }
}

impl From<&str> for MixerValue {
    fn from(v: &str) -> Self {
        MixerValue::Text(v.to_string())
    }
}

impl From<String> for MixerValue {
    fn from(v: String) -> Self {
        MixerValue::Text(v)
    }
}
