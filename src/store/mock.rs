//! Mock store implementation for unit testing.
//!
//! This module provides an in-memory hierarchical store that records all
//! operations and supports failure injection for testing error paths.
//!
//! # Example
//!
//! ```rust,ignore
//! use st::store::mock::{MockStore, Operation};
//! use st::store::{ConfigStore, ConfigValue};
//!
//! let mock = MockStore::new();
//! mock.seed("HKLM\\Foo", "Bar", ConfigValue::Int32(1));
//!
//! mock.write("HKLM\\Foo", "Bar", &ConfigValue::Int32(2)).unwrap();
//!
//! mock.assert_contains(&Operation::Write {
//!     path: "HKLM\\Foo".to_string(),
//!     name: "Bar".to_string(),
//! });
//! ```

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::trace;

use super::{ConfigStore, ConfigValue};
use crate::error::{Result, TweakError};

/// Recorded operation for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Read { path: String, name: String },
    Write { path: String, name: String },
    Delete { path: String, name: String },
    EnumerateChildren { path: String },
}

/// Mock store for testing without a real OS configuration surface.
///
/// Holds an in-memory tree, records every operation for later assertion,
/// and supports denying access to whole path prefixes or failing specific
/// coordinates.
#[derive(Default)]
pub struct MockStore {
    tree: Mutex<BTreeMap<String, BTreeMap<String, ConfigValue>>>,
    operation_log: Mutex<Vec<Operation>>,
    denied_prefixes: Mutex<Vec<String>>,
    failing_writes: Mutex<Vec<(String, String)>>,
    error_injection: Mutex<Option<TweakError>>,
}

impl MockStore {
    /// Create an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a coordinate without recording an operation.
    pub fn seed(&self, path: &str, name: &str, value: ConfigValue) {
        self.tree
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    /// Deny all access under a path prefix (simulates missing privileges).
    pub fn deny_prefix(&self, prefix: &str) {
        self.denied_prefixes.lock().unwrap().push(prefix.to_string());
    }

    /// Make writes to one specific coordinate fail with permission denied.
    pub fn fail_write(&self, path: &str, name: &str) {
        self.failing_writes
            .lock()
            .unwrap()
            .push((path.to_string(), name.to_string()));
    }

    /// Inject an error for the next operation.
    pub fn inject_error(&self, error: TweakError) {
        *self.error_injection.lock().unwrap() = Some(error);
    }

    // === Assertions ===

    /// Get all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.operation_log.lock().unwrap().clone()
    }

    /// Count of read operations against one coordinate.
    #[must_use]
    pub fn read_count(&self, path: &str, name: &str) -> usize {
        self.operations()
            .iter()
            .filter(|op| {
                matches!(op, Operation::Read { path: p, name: n } if p == path && n == name)
            })
            .count()
    }

    /// Assert a specific operation was performed at least once.
    ///
    /// # Panics
    ///
    /// Panics if the operation was not found.
    pub fn assert_contains(&self, expected: &Operation) {
        let ops = self.operations();
        assert!(
            ops.contains(expected),
            "Expected operation {expected:?} not found in: {ops:#?}",
        );
    }

    /// Assert no write or delete touched the given coordinate.
    ///
    /// # Panics
    ///
    /// Panics if a mutation was recorded for the coordinate.
    pub fn assert_not_mutated(&self, path: &str, name: &str) {
        let ops = self.operations();
        let mutated = ops.iter().any(|op| match op {
            Operation::Write { path: p, name: n } | Operation::Delete { path: p, name: n } => {
                p == path && n == name
            }
            _ => false,
        });
        assert!(!mutated, "Coordinate {path}\\{name} was mutated: {ops:#?}");
    }

    /// Current value at a coordinate, bypassing the operation log.
    #[must_use]
    pub fn value_at(&self, path: &str, name: &str) -> Option<ConfigValue> {
        self.tree
            .lock()
            .unwrap()
            .get(path)
            .and_then(|values| values.get(name))
            .cloned()
    }

    /// Clear the operation log for fresh assertions.
    pub fn clear_operations(&self) {
        self.operation_log.lock().unwrap().clear();
    }

    // === Internal Helpers ===

    fn record_op(&self, op: Operation) {
        trace!(?op, "Recording store operation");
        self.operation_log.lock().unwrap().push(op);
    }

    fn check_access(&self, path: &str) -> Result<()> {
        if let Some(error) = self.error_injection.lock().unwrap().take() {
            return Err(error);
        }
        let denied = self
            .denied_prefixes
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()));
        if denied {
            return Err(TweakError::PermissionDenied {
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

impl ConfigStore for MockStore {
    fn read(&self, path: &str, name: &str) -> Result<Option<ConfigValue>> {
        self.record_op(Operation::Read {
            path: path.to_string(),
            name: name.to_string(),
        });
        self.check_access(path)?;

        Ok(self
            .tree
            .lock()
            .unwrap()
            .get(path)
            .and_then(|values| values.get(name))
            .cloned())
    }

    fn write(&self, path: &str, name: &str, value: &ConfigValue) -> Result<()> {
        self.record_op(Operation::Write {
            path: path.to_string(),
            name: name.to_string(),
        });
        self.check_access(path)?;

        let failing = self
            .failing_writes
            .lock()
            .unwrap()
            .iter()
            .any(|(p, n)| p == path && n == name);
        if failing {
            return Err(TweakError::PermissionDenied {
                path: format!("{path}\\{name}"),
            });
        }

        self.tree
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .insert(name.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, path: &str, name: &str) -> Result<()> {
        self.record_op(Operation::Delete {
            path: path.to_string(),
            name: name.to_string(),
        });
        self.check_access(path)?;

        let mut tree = self.tree.lock().unwrap();
        if let Some(values) = tree.get_mut(path) {
            values.remove(name);
            if values.is_empty() {
                tree.remove(path);
            }
        }
        Ok(())
    }

    fn enumerate_children(&self, path: &str) -> Result<Vec<String>> {
        self.record_op(Operation::EnumerateChildren {
            path: path.to_string(),
        });
        self.check_access(path)?;

        let prefix = format!("{path}\\");
        let tree = self.tree.lock().unwrap();
        let mut children: Vec<String> = Vec::new();
        for stored_path in tree.keys() {
            if let Some(rest) = stored_path.strip_prefix(&prefix) {
                let segment = rest.split('\\').next().unwrap_or(rest);
                if !children.iter().any(|c| c == segment) {
                    children.push(segment.to_string());
                }
            }
        }
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_absent_is_none() {
        let mock = MockStore::new();
        assert!(mock.read("HKLM\\Foo", "Bar").unwrap().is_none());
        assert_eq!(mock.read_count("HKLM\\Foo", "Bar"), 1);
    }

    #[test]
    fn test_seed_then_read() {
        let mock = MockStore::new();
        mock.seed("HKLM\\Foo", "Bar", ConfigValue::Int32(3));
        assert_eq!(
            mock.read("HKLM\\Foo", "Bar").unwrap(),
            Some(ConfigValue::Int32(3))
        );
    }

    #[test]
    fn test_write_then_delete() {
        let mock = MockStore::new();
        mock.write("HKLM\\Foo", "Bar", &ConfigValue::String("v".into()))
            .unwrap();
        mock.delete("HKLM\\Foo", "Bar").unwrap();
        assert!(mock.value_at("HKLM\\Foo", "Bar").is_none());

        // Deleting again is a no-op.
        mock.delete("HKLM\\Foo", "Bar").unwrap();
    }

    #[test]
    fn test_denied_prefix() {
        let mock = MockStore::new();
        mock.deny_prefix("HKLM\\Secure");

        let result = mock.read("HKLM\\Secure\\Keys", "K");
        assert!(matches!(result, Err(TweakError::PermissionDenied { .. })));

        // Other paths unaffected.
        assert!(mock.read("HKLM\\Open", "K").unwrap().is_none());
    }

    #[test]
    fn test_failing_write_only_hits_target() {
        let mock = MockStore::new();
        mock.fail_write("HKLM\\Foo", "Bad");

        mock.write("HKLM\\Foo", "Good", &ConfigValue::Int32(1))
            .unwrap();
        let result = mock.write("HKLM\\Foo", "Bad", &ConfigValue::Int32(1));
        assert!(matches!(result, Err(TweakError::PermissionDenied { .. })));
    }

    #[test]
    fn test_error_injection_is_one_shot() {
        let mock = MockStore::new();
        mock.inject_error(TweakError::Other("boom".to_string()));

        assert!(mock.read("HKLM\\Foo", "Bar").is_err());
        assert!(mock.read("HKLM\\Foo", "Bar").is_ok());
    }

    #[test]
    fn test_enumerate_children() {
        let mock = MockStore::new();
        mock.seed("HKLM\\Adapters\\eth0", "Latency", ConfigValue::Int32(1));
        mock.seed("HKLM\\Adapters\\wlan0", "Latency", ConfigValue::Int32(1));

        let children = mock.enumerate_children("HKLM\\Adapters").unwrap();
        assert_eq!(children, vec!["eth0".to_string(), "wlan0".to_string()]);
    }

    #[test]
    fn test_operation_log() {
        let mock = MockStore::new();
        mock.read("HKLM\\A", "x").unwrap();
        mock.write("HKLM\\A", "x", &ConfigValue::Int32(1)).unwrap();

        mock.assert_contains(&Operation::Read {
            path: "HKLM\\A".to_string(),
            name: "x".to_string(),
        });
        mock.assert_not_mutated("HKLM\\A", "y");

        mock.clear_operations();
        assert!(mock.operations().is_empty());
    }
}
