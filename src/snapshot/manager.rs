//! Snapshot capture, persistence, and loading.
//!
//! One snapshot slot per subsystem, last-persist-wins: repeated applies
//! without an intervening restore do not stack undo layers. The slot file
//! is the single shared mutable resource across process restarts, so all
//! writes go through atomic replace and a malformed file reads the same
//! as no file at all.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::schema::{ConfigEntry, Snapshot};
use crate::control::{
    with_timeout, PowerSchemeControl, ServiceControl, DEFAULT_CONTROL_TIMEOUT,
};
use crate::error::{Result, TweakError};
use crate::store::{ConfigStore, Coordinate};

/// What one capture call should record.
#[derive(Debug, Clone, Default)]
pub struct CapturePlan {
    /// Coordinates to read.
    pub coordinates: Vec<Coordinate>,
    /// Services whose run state to record.
    pub services: Vec<String>,
    /// Record the active power scheme.
    pub capture_power_plan: bool,
}

impl CapturePlan {
    /// True when there is nothing to capture.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty() && self.services.is_empty() && !self.capture_power_plan
    }
}

/// Captures "before" state into a [`Snapshot`] and persists/loads the
/// per-subsystem slot file.
pub struct SnapshotManager {
    store: Arc<dyn ConfigStore>,
    services: Arc<dyn ServiceControl>,
    power: Arc<dyn PowerSchemeControl>,
    slot_path: PathBuf,
    control_timeout: std::time::Duration,
}

impl SnapshotManager {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        services: Arc<dyn ServiceControl>,
        power: Arc<dyn PowerSchemeControl>,
        slot_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            services,
            power,
            slot_path: slot_path.into(),
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
        }
    }

    /// Override the bound on external control-surface calls.
    #[must_use]
    pub fn with_control_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.control_timeout = timeout;
        self
    }

    /// The slot file path.
    #[must_use]
    pub fn slot_path(&self) -> &Path {
        &self.slot_path
    }

    /// Capture the current value (or absence) of every planned coordinate.
    ///
    /// Never fails as a whole: an unreadable coordinate is recorded
    /// conservatively as non-existent, so restore deletes it rather than
    /// rewriting a guessed value. A service whose state cannot be queried
    /// is omitted entirely; restoring a guessed run state would be worse
    /// than skipping it.
    #[must_use]
    pub fn capture(&self, plan: &CapturePlan) -> Snapshot {
        let mut snapshot = Snapshot::new();

        for coordinate in &plan.coordinates {
            let entry = match self.store.read(&coordinate.path, &coordinate.name) {
                Ok(Some(value)) => ConfigEntry::existing(coordinate, value),
                Ok(None) => ConfigEntry::absent(coordinate),
                Err(e) => {
                    warn!(coordinate = %coordinate, error = %e, "Capture read failed; recording as absent");
                    ConfigEntry::absent(coordinate)
                }
            };
            snapshot.insert_entry(entry);
        }

        for service in &plan.services {
            let services = self.services.clone();
            let name = service.clone();
            match with_timeout("service query", self.control_timeout, move || {
                services.query_run_state(&name)
            }) {
                Ok(state) => {
                    snapshot.services.insert(service.clone(), state);
                }
                Err(e) => {
                    warn!(service = %service, error = %e, "Service state query failed; omitting from snapshot");
                }
            }
        }

        if plan.capture_power_plan {
            let power = self.power.clone();
            match with_timeout("power scheme query", self.control_timeout, move || {
                power.active_scheme()
            }) {
                Ok(scheme) => snapshot.power_plan = Some(scheme),
                Err(e) => {
                    warn!(error = %e, "Active power scheme query failed; omitting from snapshot");
                }
            }
        }

        debug!(
            entries = snapshot.entries.len(),
            services = snapshot.services.len(),
            power = snapshot.power_plan.is_some(),
            "Capture complete"
        );
        snapshot
    }

    /// Persist via atomic replace: write to a temp file, then rename, so a
    /// kill mid-write cannot leave a half-written slot.
    pub fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let persist_err = |reason: String| TweakError::PersistFailed {
            path: self.slot_path.display().to_string(),
            reason,
        };

        if let Some(parent) = self.slot_path.parent() {
            fs::create_dir_all(parent).map_err(|e| persist_err(e.to_string()))?;
        }

        let bytes = serde_json::to_vec_pretty(snapshot).map_err(|e| persist_err(e.to_string()))?;
        let tmp = self.slot_path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| persist_err(e.to_string()))?;
        fs::rename(&tmp, &self.slot_path).map_err(|e| persist_err(e.to_string()))?;

        info!(path = %self.slot_path.display(), entries = snapshot.entries.len(), "Snapshot persisted");
        Ok(())
    }

    /// Load the slot. `Ok(None)` means no backup is available — either the
    /// file is missing or it is malformed (a partially-written or corrupt
    /// file must never propagate a parse failure to callers).
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let bytes = match fs::read(&self.slot_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.slot_path.display(), "No snapshot file");
                return Ok(None);
            }
            Err(e) => return Err(TweakError::Io(e)),
        };

        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(
                    path = %self.slot_path.display(),
                    error = %e,
                    "Snapshot file malformed; treating as no backup available"
                );
                Ok(None)
            }
        }
    }

    /// Remove the slot file. Already-absent is fine.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.slot_path) {
            Ok(()) => {
                debug!(path = %self.slot_path.display(), "Snapshot slot removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TweakError::Io(e)),
        }
    }

    /// True when a loadable backup exists.
    #[must_use]
    pub fn has_backup(&self) -> bool {
        matches!(self.load(), Ok(Some(_)))
    }
}
