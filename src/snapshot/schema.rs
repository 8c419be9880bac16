//! Snapshot data types.
//!
//! A snapshot is a persisted, point-in-time capture of configuration
//! coordinates and their prior values, plus prior service run states and
//! the prior active power scheme. It is a whole replacement, never an
//! incremental merge, and is consumed read-only on restore.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::control::ServiceRunState;
use crate::error::TweakError;
use crate::store::{ConfigValue, Coordinate, ValueKind};

/// The captured prior state of one coordinate.
///
/// Invariant: `existed == false` ⇔ `value == None`. Restore must delete,
/// never write, a coordinate that did not previously exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry", into = "RawEntry")]
pub struct ConfigEntry {
    pub path: String,
    pub name: String,
    pub value: Option<ConfigValue>,
    pub existed: bool,
}

impl ConfigEntry {
    /// Entry for a coordinate that existed with the given value.
    #[must_use]
    pub fn existing(coordinate: &Coordinate, value: ConfigValue) -> Self {
        Self {
            path: coordinate.path.clone(),
            name: coordinate.name.clone(),
            value: Some(value),
            existed: true,
        }
    }

    /// Entry for a coordinate that did not exist (or could not be read).
    #[must_use]
    pub fn absent(coordinate: &Coordinate) -> Self {
        Self {
            path: coordinate.path.clone(),
            name: coordinate.name.clone(),
            value: None,
            existed: false,
        }
    }

    /// Canonical map key form: `path\\name`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}\\{}", self.path, self.name)
    }
}

/// On-file `type` tag. One value kind per variant, plus `absent` for
/// coordinates that had no value at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EntryTag {
    String,
    Int32,
    Int64,
    Bytes,
    #[default]
    Absent,
}

impl EntryTag {
    const fn kind(self) -> Option<ValueKind> {
        match self {
            Self::String => Some(ValueKind::String),
            Self::Int32 => Some(ValueKind::Int32),
            Self::Int64 => Some(ValueKind::Int64),
            Self::Bytes => Some(ValueKind::Bytes),
            Self::Absent => None,
        }
    }
}

impl From<ValueKind> for EntryTag {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::String => Self::String,
            ValueKind::Int32 => Self::Int32,
            ValueKind::Int64 => Self::Int64,
            ValueKind::Bytes => Self::Bytes,
        }
    }
}

/// On-disk form of an entry: explicit `type` tag next to the raw payload.
///
/// The tag is authoritative for decoding `value`; a payload whose shape
/// contradicts its declared tag is rejected at decode time, never coerced.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawEntry {
    path: String,
    name: String,
    #[serde(rename = "type", default)]
    tag: EntryTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
    existed: bool,
}

impl TryFrom<RawEntry> for ConfigEntry {
    type Error = TweakError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let coordinate = format!("{}\\{}", raw.path, raw.name);

        if !raw.existed {
            // The value of a never-existed coordinate is meaningless;
            // drop whatever the file carries.
            return Ok(Self {
                path: raw.path,
                name: raw.name,
                value: None,
                existed: false,
            });
        }

        let (Some(kind), Some(payload)) = (raw.tag.kind(), raw.value.as_ref()) else {
            return Err(TweakError::Corrupt {
                reason: format!("entry {coordinate} existed but carries no typed value"),
            });
        };

        let value = ConfigValue::from_json(kind, payload, &coordinate)?;
        Ok(Self {
            path: raw.path,
            name: raw.name,
            value: Some(value),
            existed: true,
        })
    }
}

impl From<ConfigEntry> for RawEntry {
    fn from(entry: ConfigEntry) -> Self {
        let (tag, value) = match &entry.value {
            Some(v) => (EntryTag::from(v.kind()), Some(v.to_json())),
            None => (EntryTag::Absent, None),
        };
        Self {
            path: entry.path,
            name: entry.name,
            tag,
            value,
            existed: entry.existed,
        }
    }
}

/// A persisted "before" record for one subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the capture ran.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Captured entries keyed by `path\\name`.
    #[serde(default)]
    pub entries: BTreeMap<String, ConfigEntry>,
    /// Prior run state per captured service.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceRunState>,
    /// Prior active power scheme, if captured.
    #[serde(rename = "powerPlan", default, skip_serializing_if = "Option::is_none")]
    pub power_plan: Option<String>,
}

impl Snapshot {
    /// Create an empty snapshot stamped now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            entries: BTreeMap::new(),
            services: BTreeMap::new(),
            power_plan: None,
        }
    }

    /// Insert an entry. Capturing the same coordinate twice within one
    /// capture is last-write-wins.
    pub fn insert_entry(&mut self, entry: ConfigEntry) {
        self.entries.insert(entry.key(), entry);
    }

    /// True when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.services.is_empty() && self.power_plan.is_none()
    }

    /// Number of captured entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}
