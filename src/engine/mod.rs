//! Apply/restore orchestration.
//!
//! One [`Subsystem`] per tweak category wires a [`TweakApplier`] and a
//! [`RestoreEngine`] around a shared snapshot slot. The shared [`Session`]
//! mutex is the critical section: capture→persist→mutate and restore are
//! mutually exclusive, so two concurrent applies can never race on the
//! slot and overwrite the true "before" record with an already-mutated
//! value.

mod apply;
mod restore;

pub use apply::{ApplyReport, TweakApplier};
pub use restore::{RestoreEngine, RestoreReport};

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::catalog::{Category, TweakCatalog};
use crate::control::{PowerSchemeControl, ServiceControl};
use crate::snapshot::SnapshotManager;
use crate::store::ConfigStore;

/// Engine lifecycle phase.
///
/// Capturing always precedes Mutating; Restoring always completes back to
/// Idle regardless of per-entry failures along the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    Capturing,
    Mutating,
    Applied,
    Restoring,
}

/// Mutable per-subsystem session state.
///
/// `applied` is the set of tweak ids successfully applied this session;
/// it is cleared entirely on a full restore and never persisted.
#[derive(Debug)]
pub struct Session {
    pub phase: EnginePhase,
    pub applied: BTreeSet<String>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: EnginePhase::Idle,
            applied: BTreeSet::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) type SharedSession = Arc<Mutex<Session>>;

/// Cooperative cancellation token.
///
/// A mutation already issued to the store cannot be retracted; a cancel
/// request is honored only before the next pending mutation is issued.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the in-flight batch.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Re-arm the token at the start of a new batch.
    pub(crate) fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// A fully wired apply/restore pair for one category's snapshot slot.
pub struct Subsystem {
    category: Category,
    applier: TweakApplier,
    restorer: RestoreEngine,
    manager: Arc<SnapshotManager>,
    session: SharedSession,
}

impl Subsystem {
    /// Wire a subsystem over shared capability handles. The snapshot slot
    /// lives at `<snapshot_dir>/<category>.json`.
    pub fn new(
        category: Category,
        catalog: Arc<TweakCatalog>,
        store: Arc<dyn ConfigStore>,
        services: Arc<dyn ServiceControl>,
        power: Arc<dyn PowerSchemeControl>,
        snapshot_dir: &Path,
    ) -> Self {
        let manager = Arc::new(SnapshotManager::new(
            store.clone(),
            services.clone(),
            power.clone(),
            snapshot_dir.join(format!("{}.json", category.slot())),
        ));
        let session: SharedSession = Arc::new(Mutex::new(Session::new()));

        let applier = TweakApplier::new(
            catalog,
            store.clone(),
            services.clone(),
            power.clone(),
            manager.clone(),
            session.clone(),
        );
        let restorer = RestoreEngine::new(
            store,
            services,
            power,
            manager.clone(),
            session.clone(),
        );

        Self {
            category,
            applier,
            restorer,
            manager,
            session,
        }
    }

    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub const fn applier(&self) -> &TweakApplier {
        &self.applier
    }

    #[must_use]
    pub const fn restorer(&self) -> &RestoreEngine {
        &self.restorer
    }

    /// True when this slot has a loadable backup.
    #[must_use]
    pub fn has_backup(&self) -> bool {
        self.manager.has_backup()
    }

    /// Load this slot's backup, if a usable one exists.
    pub fn load_backup(&self) -> crate::error::Result<Option<crate::snapshot::Snapshot>> {
        self.manager.load()
    }

    /// Tweak ids successfully applied this session.
    #[must_use]
    pub fn applied_tweaks(&self) -> Vec<String> {
        self.session
            .lock()
            .expect("session lock poisoned")
            .applied
            .iter()
            .cloned()
            .collect()
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> EnginePhase {
        self.session.lock().expect("session lock poisoned").phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_session_starts_idle_and_empty() {
        let session = Session::new();
        assert_eq!(session.phase, EnginePhase::Idle);
        assert!(session.applied.is_empty());
    }
}
