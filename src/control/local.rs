//! Control surfaces backed by a configuration store.
//!
//! Keeps service run states and the active power scheme under reserved
//! store paths, so the CLI is exercisable end to end against a
//! [`FileStore`](crate::store::FileStore) without OS privileges. Native
//! service-manager and power-scheme backends implement the same traits.

use std::sync::Arc;

use super::{PowerSchemeControl, ServiceControl, ServiceRunState};
use crate::error::{Result, TweakError};
use crate::store::{ConfigStore, ConfigValue};

const SERVICES_PATH: &str = "SYSTEM\\Services";
const POWER_PATH: &str = "SYSTEM\\Power";
const ACTIVE_SCHEME_NAME: &str = "ActiveScheme";

/// Store-backed service and power-scheme control.
pub struct LocalControl {
    store: Arc<dyn ConfigStore>,
}

impl LocalControl {
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    fn set_run_state(&self, name: &str, state: ServiceRunState) -> Result<()> {
        self.store.write(
            SERVICES_PATH,
            name,
            &ConfigValue::String(state.to_string()),
        )
    }
}

impl ServiceControl for LocalControl {
    fn query_run_state(&self, name: &str) -> Result<ServiceRunState> {
        match self.store.read(SERVICES_PATH, name)? {
            Some(ConfigValue::String(s)) if s == "running" => Ok(ServiceRunState::Running),
            Some(ConfigValue::String(s)) if s == "stopped" => Ok(ServiceRunState::Stopped),
            Some(other) => Err(TweakError::ControlSurface(format!(
                "service {name} has unexpected state value: {other}"
            ))),
            None => Err(TweakError::ServiceNotFound {
                name: name.to_string(),
            }),
        }
    }

    fn start(&self, name: &str) -> Result<()> {
        self.set_run_state(name, ServiceRunState::Running)
    }

    fn stop(&self, name: &str) -> Result<()> {
        self.set_run_state(name, ServiceRunState::Stopped)
    }
}

impl PowerSchemeControl for LocalControl {
    fn active_scheme(&self) -> Result<String> {
        match self.store.read(POWER_PATH, ACTIVE_SCHEME_NAME)? {
            Some(ConfigValue::String(scheme)) => Ok(scheme),
            Some(other) => Err(TweakError::ControlSurface(format!(
                "active power scheme has unexpected value: {other}"
            ))),
            None => Err(TweakError::SchemeNotFound {
                scheme: "<active>".to_string(),
            }),
        }
    }

    fn set_active_scheme(&self, scheme: &str) -> Result<()> {
        self.store.write(
            POWER_PATH,
            ACTIVE_SCHEME_NAME,
            &ConfigValue::String(scheme.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;

    fn control() -> (Arc<MockStore>, LocalControl) {
        let store = Arc::new(MockStore::new());
        let control = LocalControl::new(store.clone() as Arc<dyn ConfigStore>);
        (store, control)
    }

    #[test]
    fn test_unknown_service() {
        let (_store, control) = control();
        let result = control.query_run_state("DiagTrack");
        assert!(matches!(result, Err(TweakError::ServiceNotFound { .. })));
    }

    #[test]
    fn test_start_stop_query() {
        let (_store, control) = control();
        control.start("DiagTrack").unwrap();
        assert_eq!(
            control.query_run_state("DiagTrack").unwrap(),
            ServiceRunState::Running
        );

        control.stop("DiagTrack").unwrap();
        assert_eq!(
            control.query_run_state("DiagTrack").unwrap(),
            ServiceRunState::Stopped
        );
    }

    #[test]
    fn test_restore_run_state_default_impl() {
        let (_store, control) = control();
        control.stop("SysMain").unwrap();
        control
            .restore_run_state("SysMain", ServiceRunState::Running)
            .unwrap();
        assert_eq!(
            control.query_run_state("SysMain").unwrap(),
            ServiceRunState::Running
        );
    }

    #[test]
    fn test_power_scheme() {
        let (_store, control) = control();
        assert!(matches!(
            control.active_scheme(),
            Err(TweakError::SchemeNotFound { .. })
        ));

        control.set_active_scheme("scheme-high-performance").unwrap();
        assert_eq!(
            control.active_scheme().unwrap(),
            "scheme-high-performance"
        );
    }
}
