//! Typed configuration values.
//!
//! Values carry an explicit kind tag through serialization. The tag is
//! authoritative: decoding validates that the raw JSON shape matches the
//! declared kind and rejects anything that does not, rather than coercing.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TweakError};

/// Kind tag for a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Int32,
    Int64,
    Bytes,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Bytes => "bytes",
        };
        f.write_str(s)
    }
}

/// A typed configuration value.
///
/// 32-bit and 64-bit integers are distinct kinds and never collapse into
/// one another: a value captured as `Int64` restores as `Int64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    String(String),
    Int32(i32),
    Int64(i64),
    Bytes(Vec<u8>),
}

impl ConfigValue {
    /// The kind tag for this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Int32(_) => ValueKind::Int32,
            Self::Int64(_) => ValueKind::Int64,
            Self::Bytes(_) => ValueKind::Bytes,
        }
    }

    /// Serialize the payload (without the kind tag) to raw JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Int32(v) => serde_json::Value::from(*v),
            Self::Int64(v) => serde_json::Value::from(*v),
            Self::Bytes(b) => serde_json::Value::Array(
                b.iter().map(|byte| serde_json::Value::from(*byte)).collect(),
            ),
        }
    }

    /// Decode a raw JSON payload against a declared kind.
    ///
    /// Rejects any payload whose shape contradicts the kind: a string where
    /// a number was declared, a number outside `i32` range for `int32`, a
    /// non-byte array element for `bytes`. `coordinate` is used only for
    /// error reporting.
    pub fn from_json(
        kind: ValueKind,
        raw: &serde_json::Value,
        coordinate: &str,
    ) -> Result<Self> {
        let mismatch = || TweakError::TypeMismatch {
            coordinate: coordinate.to_string(),
            declared: kind.to_string(),
            actual: json_shape(raw).to_string(),
        };

        match kind {
            ValueKind::String => raw
                .as_str()
                .map(|s| Self::String(s.to_string()))
                .ok_or_else(mismatch),
            ValueKind::Int32 => raw
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Self::Int32)
                .ok_or_else(mismatch),
            ValueKind::Int64 => raw.as_i64().map(Self::Int64).ok_or_else(mismatch),
            ValueKind::Bytes => {
                let arr = raw.as_array().ok_or_else(mismatch)?;
                let mut bytes = Vec::with_capacity(arr.len());
                for item in arr {
                    let byte = item
                        .as_u64()
                        .and_then(|v| u8::try_from(v).ok())
                        .ok_or_else(mismatch)?;
                    bytes.push(byte);
                }
                Ok(Self::Bytes(bytes))
            }
        }
    }
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Describe the JSON shape of a raw value for error messages.
fn json_shape(raw: &serde_json::Value) -> &'static str {
    match raw {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
