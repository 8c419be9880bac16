//! Tweak application: capture-before-mutate orchestration.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{CancelToken, EnginePhase, SharedSession};
use crate::catalog::{ResolvedMutation, TweakCatalog, TweakDefinition};
use crate::control::{
    with_timeout, PowerSchemeControl, ServiceControl, ServiceRunState, DEFAULT_CONTROL_TIMEOUT,
};
use crate::error::{AggregateError, Result};
use crate::snapshot::{CapturePlan, SnapshotManager};
use crate::store::ConfigStore;

/// Outcome of an apply call that actually ran.
///
/// A hard `Err` from the applier means nothing mutated; a report with
/// failures means the batch completed with warnings. The distinction is
/// what lets callers say "completed with N warnings" rather than "did not
/// run at all".
#[derive(Debug)]
pub struct ApplyReport {
    /// Tweak ids the caller requested, in order.
    pub requested: Vec<String>,
    /// Ids whose every step succeeded; these entered the applied set.
    pub applied: Vec<String>,
    /// Store mutations actually issued.
    pub mutations_issued: usize,
    /// True if a cancel request stopped the batch early.
    pub cancelled: bool,
    /// Per-step failures, in order of occurrence.
    pub failures: AggregateError,
}

impl ApplyReport {
    /// True when every requested step succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
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

/// Resolves tweak ids to mutations and orchestrates capture-then-mutate.
///
/// Holding the session lock for the whole of capture→persist→mutate makes
/// concurrent applies against the same slot mutually exclusive.
pub struct TweakApplier {
    catalog: Arc<TweakCatalog>,
    store: Arc<dyn ConfigStore>,
    services: Arc<dyn ServiceControl>,
    power: Arc<dyn PowerSchemeControl>,
    manager: Arc<SnapshotManager>,
    session: SharedSession,
    cancel: CancelToken,
    control_timeout: Duration,
}

impl TweakApplier {
    pub(super) fn new(
        catalog: Arc<TweakCatalog>,
        store: Arc<dyn ConfigStore>,
        services: Arc<dyn ServiceControl>,
        power: Arc<dyn PowerSchemeControl>,
        manager: Arc<SnapshotManager>,
        session: SharedSession,
    ) -> Self {
        Self {
            catalog,
            store,
            services,
            power,
            manager,
            session,
            cancel: CancelToken::new(),
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
        }
    }

    /// Token for cooperatively cancelling an in-flight batch.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Apply a single tweak.
    pub fn apply(&self, tweak_id: &str) -> Result<ApplyReport> {
        self.apply_profile(&[tweak_id.to_string()])
    }

    /// Apply a set of tweaks as one coherent batch.
    ///
    /// The union of every tweak's coordinates is captured once, before any
    /// mutation in the batch begins, so a single restore undoes the whole
    /// batch and two tweaks sharing a coordinate cannot save conflicting
    /// before-values. Coordinates already recorded in the slot are never
    /// re-captured, so retrying after a partial failure cannot overwrite
    /// a recorded original with a post-mutation value. All mutations are
    /// attempted regardless of earlier failures; there is no rollback of
    /// a partially-applied tweak.
    pub fn apply_profile(&self, tweak_ids: &[String]) -> Result<ApplyReport> {
        // Unknown ids are a hard failure before anything runs.
        let defs: Vec<&TweakDefinition> = tweak_ids
            .iter()
            .map(|id| self.catalog.get(id))
            .collect::<Result<_>>()?;

        let mut session = self.session.lock().expect("session lock poisoned");
        self.cancel.reset();
        session.phase = EnginePhase::Capturing;
        debug!(tweaks = ?tweak_ids, "Apply batch starting");

        let mut failures = AggregateError::new();
        let mut failed_tweaks: BTreeSet<String> = BTreeSet::new();

        // Resolve every mutation up front so capture and mutate see the
        // exact same coordinate expansion.
        let mut resolved: Vec<(&String, Vec<ResolvedMutation>, &TweakDefinition)> =
            Vec::with_capacity(defs.len());
        for (id, def) in tweak_ids.iter().zip(&defs) {
            let before = failures.len();
            let mutations = def.resolve_mutations(self.store.as_ref(), &mut failures);
            if failures.len() > before {
                failed_tweaks.insert(id.clone());
            }
            resolved.push((id, mutations, def));
        }

        // Anything already recorded in the slot keeps its recorded
        // original: re-reading such a coordinate now could observe a
        // post-mutation value (an earlier apply, or a retry after a
        // partial failure) and persisting that would lose the true
        // "before" state for good. A load failure here is a hard error:
        // capturing blind over an unreadable slot risks the same loss.
        let existing = match self.manager.load() {
            Ok(existing) => existing,
            Err(e) => {
                session.phase = EnginePhase::Idle;
                return Err(e);
            }
        };

        // Union capture plan, deduplicated: a coordinate shared by two
        // tweaks in the batch is captured exactly once, before either
        // mutates it.
        let mut plan = CapturePlan::default();
        let mut seen = BTreeSet::new();
        for (_, mutations, def) in &resolved {
            for mutation in mutations {
                let key = mutation.coordinate.key();
                let recorded = existing
                    .as_ref()
                    .is_some_and(|s| s.entries.contains_key(&key));
                if !recorded && seen.insert(key) {
                    plan.coordinates.push(mutation.coordinate.clone());
                }
            }
            for change in &def.service_changes {
                let recorded = existing
                    .as_ref()
                    .is_some_and(|s| s.services.contains_key(&change.service));
                if !recorded && !plan.services.contains(&change.service) {
                    plan.services.push(change.service.clone());
                }
            }
            if def.power_plan.is_some()
                && !existing.as_ref().is_some_and(|s| s.power_plan.is_some())
            {
                plan.capture_power_plan = true;
            }
        }

        // Capture-before-mutate is mandatory ordering: the snapshot must
        // be on disk before the first write is issued. Fresh captures
        // extend the existing slot rather than replacing it, so one
        // restore still undoes everything applied since the last restore.
        if !plan.is_empty() {
            let fresh = self.manager.capture(&plan);
            let snapshot = match existing {
                Some(mut base) => {
                    base.entries.extend(fresh.entries);
                    base.services.extend(fresh.services);
                    if base.power_plan.is_none() {
                        base.power_plan = fresh.power_plan;
                    }
                    base
                }
                None => fresh,
            };
            if let Err(e) = self.manager.persist(&snapshot) {
                session.phase = EnginePhase::Idle;
                return Err(e);
            }
        }

        session.phase = EnginePhase::Mutating;
        let mut mutations_issued = 0;
        let mut cancelled = false;
        let mut completed: BTreeSet<String> = BTreeSet::new();

        'tweaks: for (id, mutations, def) in &resolved {
            for mutation in mutations {
                // Cancellation is honored only before the next pending
                // mutation; an issued write cannot be retracted.
                if self.cancel.is_cancelled() {
                    cancelled = true;
                    break 'tweaks;
                }
                match self.store.write(
                    &mutation.coordinate.path,
                    &mutation.coordinate.name,
                    &mutation.value,
                ) {
                    Ok(()) => mutations_issued += 1,
                    Err(e) => {
                        warn!(coordinate = %mutation.coordinate, error = %e, "Mutation failed");
                        failures.push(mutation.coordinate.key(), e);
                        failed_tweaks.insert((*id).clone());
                    }
                }
            }

            for change in &def.service_changes {
                if self.cancel.is_cancelled() {
                    cancelled = true;
                    break 'tweaks;
                }
                let services = self.services.clone();
                let name = change.service.clone();
                let desired = change.desired;
                let result = with_timeout("service control", self.control_timeout, move || {
                    match desired {
                        ServiceRunState::Running => services.start(&name),
                        ServiceRunState::Stopped => services.stop(&name),
                    }
                });
                if let Err(e) = result {
                    warn!(service = %change.service, error = %e, "Service change failed");
                    failures.push(format!("svc:{}", change.service), e);
                    failed_tweaks.insert((*id).clone());
                }
            }

            if let Some(scheme) = &def.power_plan {
                let power = self.power.clone();
                let target = scheme.clone();
                let result = with_timeout("power scheme", self.control_timeout, move || {
                    power.set_active_scheme(&target)
                });
                if let Err(e) = result {
                    warn!(scheme = %scheme, error = %e, "Power scheme change failed");
                    failures.push(format!("power:{scheme}"), e);
                    failed_tweaks.insert((*id).clone());
                }
            }

            completed.insert((*id).clone());
        }

        session.phase = EnginePhase::Applied;

        let mut applied = Vec::new();
        for id in tweak_ids {
            if completed.contains(id) && !failed_tweaks.contains(id) {
                session.applied.insert(id.clone());
                applied.push(id.clone());
            }
        }

        info!(
            applied = applied.len(),
            failures = failures.len(),
            cancelled,
            "Apply batch finished"
        );

        Ok(ApplyReport {
            requested: tweak_ids.to_vec(),
            applied,
            mutations_issued,
            cancelled,
            failures,
        })
    }
}
