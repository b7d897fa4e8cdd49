//! Lenient scalars for controller JSON, where the same field shows up as a
//! number, a numeric string, a bool or `null` depending on firmware.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Num(f64),
    Bool(bool),
    Str(String),
    Null(()),
}

/// Numeric field. Unparseable values read as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlexNum(pub f64);

impl FlexNum {
    pub fn val(self) -> f64 {
        self.0
    }
}

impl From<f64> for FlexNum {
    fn from(v: f64) -> Self {
        FlexNum(v)
    }
}

impl fmt::Display for FlexNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 && self.0.abs() < 1e15 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl<'de> Deserialize<'de> for FlexNum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(FlexNum(match Loose::deserialize(deserializer)? {
            Loose::Num(n) => n,
            Loose::Bool(b) => f64::from(u8::from(b)),
            Loose::Str(s) => s.trim().parse().unwrap_or(0.0),
            Loose::Null(()) => 0.0,
        }))
    }
}

impl Serialize for FlexNum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

/// Boolean field. Accepts `true`, `"true"`, `1`, `"1"`; everything else is false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlexBool(pub bool);

impl FlexBool {
    pub fn val(self) -> bool {
        self.0
    }
}

impl From<bool> for FlexBool {
    fn from(v: bool) -> Self {
        FlexBool(v)
    }
}

impl<'de> Deserialize<'de> for FlexBool {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(FlexBool(match Loose::deserialize(deserializer)? {
            Loose::Bool(b) => b,
            Loose::Num(n) => n != 0.0,
            Loose::Str(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on"),
            Loose::Null(()) => false,
        }))
    }
}

impl Serialize for FlexBool {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.0)
    }
}
