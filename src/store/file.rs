//! JSON-file-backed configuration store.
//!
//! Persists the hierarchical key/value tree as a single JSON document with
//! the same atomic-replace discipline the snapshot file uses. This is the
//! store the CLI runs against; privileged OS-native stores plug in behind
//! the same [`ConfigStore`] trait.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{ConfigStore, ConfigValue, ValueKind};
use crate::error::{Result, TweakError};

/// On-disk form of one value: explicit kind tag plus raw payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredValue {
    #[serde(rename = "type")]
    kind: ValueKind,
    value: serde_json::Value,
}

/// Flat tree: path → (name → stored value).
type Tree = BTreeMap<String, BTreeMap<String, StoredValue>>;

/// File-backed store with whole-document read-modify-write.
pub struct FileStore {
    file_path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) a store backed by the given file.
    #[must_use]
    pub fn open(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The backing file path.
    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn load_tree(&self) -> Result<Tree> {
        match fs::read(&self.file_path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                TweakError::StoreBackend(format!(
                    "store file {} is malformed: {e}",
                    self.file_path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Tree::new()),
            Err(e) => Err(TweakError::Io(e)),
        }
    }

    fn save_tree(&self, tree: &Tree) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.file_path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(tree)?;
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.file_path)?;
        trace!(path = %self.file_path.display(), "Store file saved");
        Ok(())
    }
}

impl ConfigStore for FileStore {
    fn read(&self, path: &str, name: &str) -> Result<Option<ConfigValue>> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let tree = self.load_tree()?;
        let Some(stored) = tree.get(path).and_then(|values| values.get(name)) else {
            return Ok(None);
        };
        let coordinate = format!("{path}\\{name}");
        ConfigValue::from_json(stored.kind, &stored.value, &coordinate).map(Some)
    }

    fn write(&self, path: &str, name: &str, value: &ConfigValue) -> Result<()> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let mut tree = self.load_tree()?;
        tree.entry(path.to_string()).or_default().insert(
            name.to_string(),
            StoredValue {
                kind: value.kind(),
                value: value.to_json(),
            },
        );
        debug!(path, name, "Store write");
        self.save_tree(&tree)
    }

    fn delete(&self, path: &str, name: &str) -> Result<()> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let mut tree = self.load_tree()?;
        let mut removed = false;
        if let Some(values) = tree.get_mut(path) {
            removed = values.remove(name).is_some();
            if values.is_empty() {
                tree.remove(path);
            }
        }
        if removed {
            debug!(path, name, "Store delete");
            self.save_tree(&tree)?;
        }
        Ok(())
    }

    fn enumerate_children(&self, path: &str) -> Result<Vec<String>> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let tree = self.load_tree()?;
        let prefix = format!("{path}\\");
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
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileStore {
        FileStore::open(dir.path().join("store.json"))
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.read("HKLM\\Foo", "Bar").unwrap().is_none());
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .write("HKLM\\Foo", "Bar", &ConfigValue::Int32(7))
            .unwrap();
        assert_eq!(
            store.read("HKLM\\Foo", "Bar").unwrap(),
            Some(ConfigValue::Int32(7))
        );

        // Kind survives the disk round-trip.
        store
            .write("HKLM\\Foo", "Big", &ConfigValue::Int64(1 << 40))
            .unwrap();
        assert_eq!(
            store.read("HKLM\\Foo", "Big").unwrap(),
            Some(ConfigValue::Int64(1 << 40))
        );
    }

    #[test]
    fn test_delete_is_noop_when_absent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.delete("HKLM\\Foo", "Bar").unwrap();
        store.delete("HKLM\\Foo", "Bar").unwrap();
    }

    #[test]
    fn test_delete_removes_value() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .write("HKLM\\Foo", "Bar", &ConfigValue::String("x".into()))
            .unwrap();
        store.delete("HKLM\\Foo", "Bar").unwrap();
        assert!(store.read("HKLM\\Foo", "Bar").unwrap().is_none());
    }

    #[test]
    fn test_enumerate_children() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .write(
                "HKLM\\Net\\Adapters\\eth0",
                "Latency",
                &ConfigValue::Int32(1),
            )
            .unwrap();
        store
            .write(
                "HKLM\\Net\\Adapters\\wlan0",
                "Latency",
                &ConfigValue::Int32(1),
            )
            .unwrap();
        store
            .write(
                "HKLM\\Net\\Adapters\\eth0\\Advanced",
                "Offload",
                &ConfigValue::Int32(0),
            )
            .unwrap();

        let children = store.enumerate_children("HKLM\\Net\\Adapters").unwrap();
        assert_eq!(children, vec!["eth0".to_string(), "wlan0".to_string()]);
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("store.json");
        FileStore::open(&file)
            .write("HKCU\\App", "Name", &ConfigValue::String("st".into()))
            .unwrap();

        let reopened = FileStore::open(&file);
        assert_eq!(
            reopened.read("HKCU\\App", "Name").unwrap(),
            Some(ConfigValue::String("st".into()))
        );
    }

    #[test]
    fn test_malformed_store_file_is_backend_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("store.json");
        std::fs::write(&file, b"{not json").unwrap();

        let store = FileStore::open(&file);
        let result = store.read("HKLM\\Foo", "Bar");
        assert!(matches!(result, Err(TweakError::StoreBackend(_))));
    }
}
