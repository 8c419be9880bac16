//! Hierarchical key/value store abstraction.
//!
//! This module provides a trait-based abstraction over the OS configuration
//! store (registry-like paths holding named, typed values), enabling
//! testability without touching privileged system state.

mod file;
pub mod mock;
mod value;

pub use file::FileStore;
pub use value::{ConfigValue, ValueKind};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The (path, name) pair identifying one configuration value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    /// Hierarchical path, e.g. `HKLM\\System\\GameConfigStore`.
    pub path: String,
    /// Value name under the path.
    pub name: String,
}

impl Coordinate {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Canonical map key form: `path\\name`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}\\{}", self.path, self.name)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\\{}", self.path, self.name)
    }
}

/// Core store operations trait.
///
/// This trait abstracts over the real OS store and mock implementations.
///
/// # Implementation Notes
///
/// - `read` returns `Ok(None)` exactly when the coordinate is legitimately
///   absent; an `Err` means the read itself failed (permissions, backend).
/// - `write` creates intermediate path segments as needed.
/// - `delete` succeeds as a no-op when the coordinate is already absent.
/// - Permission-denied is a distinct, user-actionable error from not-found.
pub trait ConfigStore: Send + Sync {
    /// Read a named value. `Ok(None)` means the coordinate does not exist.
    fn read(&self, path: &str, name: &str) -> Result<Option<ConfigValue>>;

    /// Write a named value, creating intermediate path segments if absent.
    fn write(&self, path: &str, name: &str, value: &ConfigValue) -> Result<()>;

    /// Delete a named value. Succeeds (no-op) if already absent.
    fn delete(&self, path: &str, name: &str) -> Result<()>;

    /// Enumerate the immediate child path segments under `path`.
    ///
    /// Supports fan-out mutations, e.g. applying a setting under every
    /// network adapter sub-path.
    fn enumerate_children(&self, path: &str) -> Result<Vec<String>>;
}

/// Type alias for a shared store handle.
pub type SharedStore = std::sync::Arc<dyn ConfigStore>;
