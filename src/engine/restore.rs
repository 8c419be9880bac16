//! Restore: replay the persisted snapshot backward.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{EnginePhase, SharedSession};
use crate::control::{
    with_timeout, PowerSchemeControl, ServiceControl, DEFAULT_CONTROL_TIMEOUT,
};
use crate::error::{AggregateError, Result, TweakError};
use crate::snapshot::SnapshotManager;
use crate::store::ConfigStore;

/// Outcome of a restore call that actually ran.
#[derive(Debug)]
pub struct RestoreReport {
    /// False when no snapshot existed; the call was a no-op success.
    pub had_backup: bool,
    /// Entries replayed (deletes and rewrites).
    pub entries_restored: usize,
    /// Services driven back to their recorded run state.
    pub services_restored: usize,
    /// True when the recorded power scheme was re-activated.
    pub power_restored: bool,
    /// Per-step failures, in order of occurrence.
    pub failures: AggregateError,
}

impl RestoreReport {
    fn no_backup() -> Self {
        Self {
            had_backup: false,
            entries_restored: 0,
            services_restored: 0,
            power_restored: false,
            failures: AggregateError::new(),
        }
    }

    /// True when every step succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failure descriptions for display.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.failures
            .failures()
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

/// Loads the last snapshot and replays it backward.
pub struct RestoreEngine {
    store: Arc<dyn ConfigStore>,
    services: Arc<dyn ServiceControl>,
    power: Arc<dyn PowerSchemeControl>,
    manager: Arc<SnapshotManager>,
    session: SharedSession,
    control_timeout: Duration,
}

impl RestoreEngine {
    pub(super) fn new(
        store: Arc<dyn ConfigStore>,
        services: Arc<dyn ServiceControl>,
        power: Arc<dyn PowerSchemeControl>,
        manager: Arc<SnapshotManager>,
        session: SharedSession,
    ) -> Self {
        Self {
            store,
            services,
            power,
            manager,
            session,
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
        }
    }

    /// Restore every captured coordinate, service, and the power scheme.
    ///
    /// Entries that did not previously exist are deleted (not-found is
    /// ignored); existing entries are rewritten with their original typed
    /// value — the tag carried in the snapshot, never a downcast or a
    /// stringified number. Every step is attempted regardless of earlier
    /// failures; the call completes (with a report) as long as the
    /// snapshot loaded. No snapshot means success with zero side effects.
    /// A restore with no failures removes the consumed slot; a restore
    /// with failures keeps it so it can be retried.
    pub fn restore_all(&self) -> Result<RestoreReport> {
        let mut session = self.session.lock().expect("session lock poisoned");
        session.phase = EnginePhase::Restoring;

        let snapshot = match self.manager.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                info!("No backup available; restore is a no-op");
                session.phase = EnginePhase::Idle;
                return Ok(RestoreReport::no_backup());
            }
            Err(e) => {
                session.phase = EnginePhase::Idle;
                return Err(e);
            }
        };

        debug!(
            entries = snapshot.entries.len(),
            services = snapshot.services.len(),
            "Restoring snapshot"
        );

        let mut failures = AggregateError::new();
        let mut entries_restored = 0;

        for (key, entry) in &snapshot.entries {
            let result = match &entry.value {
                Some(value) if entry.existed => self.store.write(&entry.path, &entry.name, value),
                _ => {
                    // Did not exist before: delete, never write. Repeating
                    // the delete is a no-op.
                    match self.store.delete(&entry.path, &entry.name) {
                        Err(TweakError::NotFound { .. }) | Ok(()) => Ok(()),
                        Err(e) => Err(e),
                    }
                }
            };
            match result {
                Ok(()) => entries_restored += 1,
                Err(e) => {
                    warn!(coordinate = %key, error = %e, "Entry restore failed");
                    failures.push(key.clone(), e);
                }
            }
        }

        let mut services_restored = 0;
        for (name, state) in &snapshot.services {
            let services = self.services.clone();
            let service = name.clone();
            let target = *state;
            let result = with_timeout("service control", self.control_timeout, move || {
                services.restore_run_state(&service, target)
            });
            match result {
                Ok(()) => services_restored += 1,
                Err(e) => {
                    warn!(service = %name, error = %e, "Service restore failed");
                    failures.push(format!("svc:{name}"), e);
                }
            }
        }

        let mut power_restored = false;
        if let Some(scheme) = &snapshot.power_plan {
            let power = self.power.clone();
            let target = scheme.clone();
            let result = with_timeout("power scheme", self.control_timeout, move || {
                power.set_active_scheme(&target)
            });
            match result {
                Ok(()) => power_restored = true,
                Err(e) => {
                    warn!(scheme = %scheme, error = %e, "Power scheme restore failed");
                    failures.push(format!("power:{scheme}"), e);
                }
            }
        }

        // A fully clean restore consumes the slot: the system is back at
        // the recorded state, and the next apply must capture fresh
        // originals. After any failure the slot stays so the restore can
        // be retried.
        if failures.is_empty() {
            if let Err(e) = self.manager.clear() {
                warn!(error = %e, "Could not remove consumed snapshot slot");
            }
        }

        // A full restore clears the applied set and always lands on Idle,
        // whatever per-entry failures happened along the way.
        session.applied.clear();
        session.phase = EnginePhase::Idle;

        info!(
            entries = entries_restored,
            services = services_restored,
            failures = failures.len(),
            "Restore finished"
        );

        Ok(RestoreReport {
            had_backup: true,
            entries_restored,
            services_restored,
            power_restored,
            failures,
        })
    }
}
