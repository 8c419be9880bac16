//! Mock control surfaces for unit testing.
//!
//! Record every call, support failure injection, and can simulate a
//! hanging surface for timeout tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use super::{PowerSchemeControl, ServiceControl, ServiceRunState};
use crate::error::{Result, TweakError};

/// Recorded service-control call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    Query { name: String },
    Start { name: String },
    Stop { name: String },
}

/// Mock service control with per-service states and failure injection.
#[derive(Default)]
pub struct MockServiceControl {
    states: Mutex<BTreeMap<String, ServiceRunState>>,
    calls: Mutex<Vec<ServiceCall>>,
    failing_services: Mutex<Vec<String>>,
    // Sleep applied to every call; used to trigger timeouts.
    delay: Mutex<Option<Duration>>,
}

impl MockServiceControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-set a service's run state.
    pub fn seed(&self, name: &str, state: ServiceRunState) {
        self.states.lock().unwrap().insert(name.to_string(), state);
    }

    /// Make all calls touching the named service fail.
    pub fn fail_service(&self, name: &str) {
        self.failing_services.lock().unwrap().push(name.to_string());
    }

    /// Delay every call by the given duration (for timeout tests).
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Current state of a service, bypassing the call log.
    #[must_use]
    pub fn state_of(&self, name: &str) -> Option<ServiceRunState> {
        self.states.lock().unwrap().get(name).copied()
    }

    fn check(&self, name: &str) -> Result<()> {
        if let Some(delay) = *self.delay.lock().unwrap() {
            thread::sleep(delay);
        }
        if self
            .failing_services
            .lock()
            .unwrap()
            .iter()
            .any(|s| s == name)
        {
            return Err(TweakError::ControlSurface(format!(
                "mock service {name} configured to fail"
            )));
        }
        Ok(())
    }
}

impl ServiceControl for MockServiceControl {
    fn query_run_state(&self, name: &str) -> Result<ServiceRunState> {
        self.calls.lock().unwrap().push(ServiceCall::Query {
            name: name.to_string(),
        });
        self.check(name)?;
        self.states
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .ok_or_else(|| TweakError::ServiceNotFound {
                name: name.to_string(),
            })
    }

    fn start(&self, name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(ServiceCall::Start {
            name: name.to_string(),
        });
        self.check(name)?;
        self.states
            .lock()
            .unwrap()
            .insert(name.to_string(), ServiceRunState::Running);
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(ServiceCall::Stop {
            name: name.to_string(),
        });
        self.check(name)?;
        self.states
            .lock()
            .unwrap()
            .insert(name.to_string(), ServiceRunState::Stopped);
        Ok(())
    }
}

/// Mock power-scheme control.
#[derive(Default)]
pub struct MockPowerControl {
    active: Mutex<Option<String>>,
    fail_next: Mutex<bool>,
}

impl MockPowerControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-set the active scheme.
    pub fn seed(&self, scheme: &str) {
        *self.active.lock().unwrap() = Some(scheme.to_string());
    }

    /// Fail the next call.
    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    fn check(&self) -> Result<()> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(TweakError::ControlSurface(
                "mock power surface configured to fail".to_string(),
            ));
        }
        Ok(())
    }
}

impl PowerSchemeControl for MockPowerControl {
    fn active_scheme(&self) -> Result<String> {
        self.check()?;
        self.active
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TweakError::SchemeNotFound {
                scheme: "<active>".to_string(),
            })
    }

    fn set_active_scheme(&self, scheme: &str) -> Result<()> {
        self.check()?;
        *self.active.lock().unwrap() = Some(scheme.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::with_timeout;
    use std::sync::Arc;

    #[test]
    fn test_mock_service_lifecycle() {
        let mock = MockServiceControl::new();
        mock.seed("DiagTrack", ServiceRunState::Running);

        assert_eq!(
            mock.query_run_state("DiagTrack").unwrap(),
            ServiceRunState::Running
        );
        mock.stop("DiagTrack").unwrap();
        assert_eq!(mock.state_of("DiagTrack"), Some(ServiceRunState::Stopped));

        assert_eq!(
            mock.calls(),
            vec![
                ServiceCall::Query {
                    name: "DiagTrack".to_string()
                },
                ServiceCall::Stop {
                    name: "DiagTrack".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_failing_service() {
        let mock = MockServiceControl::new();
        mock.seed("SysMain", ServiceRunState::Running);
        mock.fail_service("SysMain");

        assert!(mock.stop("SysMain").is_err());
        // State untouched on failure.
        assert_eq!(mock.state_of("SysMain"), Some(ServiceRunState::Running));
    }

    #[test]
    fn test_delay_triggers_timeout() {
        let mock = Arc::new(MockServiceControl::new());
        mock.seed("Slow", ServiceRunState::Running);
        mock.set_delay(Duration::from_millis(300));

        let handle = mock.clone();
        let result = with_timeout("service control", Duration::from_millis(30), move || {
            handle.stop("Slow")
        });
        assert!(matches!(result, Err(TweakError::Timeout { .. })));
    }

    #[test]
    fn test_mock_power() {
        let mock = MockPowerControl::new();
        assert!(mock.active_scheme().is_err());

        mock.set_active_scheme("balanced").unwrap();
        assert_eq!(mock.active_scheme().unwrap(), "balanced");

        mock.fail_next();
        assert!(mock.set_active_scheme("high").is_err());
        assert_eq!(mock.active_scheme().unwrap(), "balanced");
    }
}
