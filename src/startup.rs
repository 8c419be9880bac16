//! Startup item enable/disable toggle.
//!
//! Disabling a startup item physically relocates its value from the run
//! path to a side "disabled" path; enabling moves it back. This is a
//! two-state toggle, not a snapshot: the moved value *is* the backup.
//! Only the error-aggregation idiom is shared with the snapshot engine.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AggregateError, Result, TweakError};
use crate::store::ConfigStore;

/// Default run path for per-user startup items.
pub const DEFAULT_RUN_PATH: &str = "HKCU\\Software\\Microsoft\\Windows\\CurrentVersion\\Run";

/// Side path holding disabled items.
pub const DEFAULT_DISABLED_PATH: &str =
    "HKCU\\Software\\Microsoft\\Windows\\CurrentVersion\\Run-Disabled";

/// Where a startup item currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Enabled,
    Disabled,
    NotFound,
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enabled => f.write_str("enabled"),
            Self::Disabled => f.write_str("disabled"),
            Self::NotFound => f.write_str("not found"),
        }
    }
}

/// Outcome of toggling a batch of startup items.
#[derive(Debug)]
pub struct ToggleReport {
    /// Items actually moved.
    pub changed: Vec<String>,
    /// Items already in the requested state.
    pub unchanged: Vec<String>,
    /// Per-item failures.
    pub failures: AggregateError,
}

/// Enabled ⇄ Disabled toggle over a run path and its side path.
pub struct StartupToggle {
    store: Arc<dyn ConfigStore>,
    run_path: String,
    disabled_path: String,
}

impl StartupToggle {
    /// Toggle over the default per-user run paths.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self::with_paths(store, DEFAULT_RUN_PATH, DEFAULT_DISABLED_PATH)
    }

    #[must_use]
    pub fn with_paths(
        store: Arc<dyn ConfigStore>,
        run_path: impl Into<String>,
        disabled_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            run_path: run_path.into(),
            disabled_path: disabled_path.into(),
        }
    }

    /// Where the named item currently lives.
    pub fn status(&self, name: &str) -> Result<ItemState> {
        if self.store.read(&self.run_path, name)?.is_some() {
            return Ok(ItemState::Enabled);
        }
        if self.store.read(&self.disabled_path, name)?.is_some() {
            return Ok(ItemState::Disabled);
        }
        Ok(ItemState::NotFound)
    }

    /// Move an item from the run path to the disabled side path.
    ///
    /// No-op (returns `Disabled`) when the item is already disabled.
    pub fn disable(&self, name: &str) -> Result<ItemState> {
        self.relocate(name, &self.run_path, &self.disabled_path, ItemState::Disabled)
    }

    /// Move an item from the disabled side path back to the run path.
    ///
    /// No-op (returns `Enabled`) when the item is already enabled.
    pub fn enable(&self, name: &str) -> Result<ItemState> {
        self.relocate(name, &self.disabled_path, &self.run_path, ItemState::Enabled)
    }

    /// Toggle a batch of items, collecting per-item failures without
    /// aborting the rest.
    #[must_use]
    pub fn toggle_many(&self, names: &[String], disable: bool) -> ToggleReport {
        let mut report = ToggleReport {
            changed: Vec::new(),
            unchanged: Vec::new(),
            failures: AggregateError::new(),
        };
        for name in names {
            let before = match self.status(name) {
                Ok(state) => state,
                Err(e) => {
                    report.failures.push(name.clone(), e);
                    continue;
                }
            };
            let result = if disable {
                self.disable(name)
            } else {
                self.enable(name)
            };
            match result {
                Ok(after) if after == before => report.unchanged.push(name.clone()),
                Ok(_) => report.changed.push(name.clone()),
                Err(e) => report.failures.push(name.clone(), e),
            }
        }
        report
    }

    fn relocate(
        &self,
        name: &str,
        from: &str,
        to: &str,
        target: ItemState,
    ) -> Result<ItemState> {
        let Some(value) = self.store.read(from, name)? else {
            // Already on the target side, or missing entirely.
            return match self.store.read(to, name)? {
                Some(_) => {
                    debug!(item = %name, state = %target, "Startup item already in target state");
                    Ok(target)
                }
                None => Err(TweakError::NotFound {
                    path: from.to_string(),
                    name: name.to_string(),
                }),
            };
        };

        // Write the destination before deleting the source: a crash in
        // between leaves the item present on both sides, which a later
        // toggle resolves, rather than lost.
        self.store.write(to, name, &value)?;
        self.store.delete(from, name)?;
        info!(item = %name, state = %target, "Startup item relocated");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;
    use crate::store::ConfigValue;

    fn toggle() -> (Arc<MockStore>, StartupToggle) {
        let store = Arc::new(MockStore::new());
        let toggle = StartupToggle::new(store.clone() as Arc<dyn ConfigStore>);
        (store, toggle)
    }

    fn seed_item(store: &MockStore, name: &str) {
        store.seed(
            DEFAULT_RUN_PATH,
            name,
            ConfigValue::String("C:\\Tools\\updater.exe".to_string()),
        );
    }

    #[test]
    fn test_disable_moves_value() {
        let (store, toggle) = toggle();
        seed_item(&store, "Updater");

        assert_eq!(toggle.disable("Updater").unwrap(), ItemState::Disabled);
        assert!(store.value_at(DEFAULT_RUN_PATH, "Updater").is_none());
        assert_eq!(
            store.value_at(DEFAULT_DISABLED_PATH, "Updater"),
            Some(ConfigValue::String("C:\\Tools\\updater.exe".to_string()))
        );
    }

    #[test]
    fn test_enable_round_trip() {
        let (store, toggle) = toggle();
        seed_item(&store, "Updater");

        toggle.disable("Updater").unwrap();
        assert_eq!(toggle.enable("Updater").unwrap(), ItemState::Enabled);
        assert_eq!(
            store.value_at(DEFAULT_RUN_PATH, "Updater"),
            Some(ConfigValue::String("C:\\Tools\\updater.exe".to_string()))
        );
        assert!(store.value_at(DEFAULT_DISABLED_PATH, "Updater").is_none());
    }

    #[test]
    fn test_double_disable_is_noop() {
        let (store, toggle) = toggle();
        seed_item(&store, "Updater");

        toggle.disable("Updater").unwrap();
        assert_eq!(toggle.disable("Updater").unwrap(), ItemState::Disabled);
        assert_eq!(
            store.value_at(DEFAULT_DISABLED_PATH, "Updater"),
            Some(ConfigValue::String("C:\\Tools\\updater.exe".to_string()))
        );
    }

    #[test]
    fn test_unknown_item() {
        let (_store, toggle) = toggle();
        assert!(matches!(
            toggle.disable("Ghost"),
            Err(TweakError::NotFound { .. })
        ));
        assert_eq!(toggle.status("Ghost").unwrap(), ItemState::NotFound);
    }

    #[test]
    fn test_toggle_many_isolates_failures() {
        let (store, toggle) = toggle();
        seed_item(&store, "Good");
        // "Ghost" does not exist; "Good" should still move.

        let report = toggle.toggle_many(
            &["Ghost".to_string(), "Good".to_string()],
            true,
        );
        assert_eq!(report.changed, vec!["Good".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(toggle.status("Good").unwrap(), ItemState::Disabled);
    }

    #[test]
    fn test_toggle_many_reports_unchanged() {
        let (store, toggle) = toggle();
        seed_item(&store, "Updater");
        toggle.disable("Updater").unwrap();

        let report = toggle.toggle_many(&["Updater".to_string()], true);
        assert!(report.changed.is_empty());
        assert_eq!(report.unchanged, vec!["Updater".to_string()]);
        assert!(report.failures.is_empty());
    }
}
