//! Service and power-scheme control surfaces.
//!
//! Narrow, fire-and-report capability traits over the OS service manager
//! and the active power scheme. Their failures are non-fatal to the
//! surrounding apply/restore batch.

mod local;
pub mod mock;

pub use local::LocalControl;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TweakError};

/// Default bound for external control-surface calls.
///
/// Registry-style operations carry no timeout; service and power-scheme
/// calls can block for seconds and must be bounded.
pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_secs(10);

/// Run state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceRunState {
    Running,
    Stopped,
}

impl std::fmt::Display for ServiceRunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// Query/start/stop a service by name.
pub trait ServiceControl: Send + Sync {
    /// Current run state of the named service.
    fn query_run_state(&self, name: &str) -> Result<ServiceRunState>;

    /// Start the named service. No-op if already running.
    fn start(&self, name: &str) -> Result<()>;

    /// Stop the named service. No-op if already stopped.
    fn stop(&self, name: &str) -> Result<()>;

    /// Drive a service back to a recorded run state.
    fn restore_run_state(&self, name: &str, state: ServiceRunState) -> Result<()> {
        match state {
            ServiceRunState::Running => self.start(name),
            ServiceRunState::Stopped => self.stop(name),
        }
    }
}

/// Get/set the active power scheme by identifier.
pub trait PowerSchemeControl: Send + Sync {
    /// Identifier of the currently active scheme.
    fn active_scheme(&self) -> Result<String>;

    /// Activate the scheme with the given identifier.
    fn set_active_scheme(&self, scheme: &str) -> Result<()>;
}

/// Type aliases for shared control handles.
pub type SharedServiceControl = std::sync::Arc<dyn ServiceControl>;
pub type SharedPowerControl = std::sync::Arc<dyn PowerSchemeControl>;

/// Run a blocking control-surface call with a bounded timeout.
///
/// The call runs on a detached worker thread; once issued it cannot be
/// retracted, so on timeout the worker is abandoned and the step is
/// reported as failed. `surface` names the call for error reporting.
pub fn with_timeout<T, F>(surface: &str, timeout: Duration, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let thread_surface = surface.to_string();
    thread::spawn(move || {
        if tx.send(op()).is_err() {
            warn!(surface = %thread_surface, "Control call completed after timeout");
        }
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(TweakError::Timeout {
            surface: surface.to_string(),
            seconds: timeout.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_timeout_passes_result_through() {
        let result = with_timeout("test", Duration::from_secs(1), || Ok(42));
        assert_eq!(result.unwrap(), 42);

        let result: Result<i32> = with_timeout("test", Duration::from_secs(1), || {
            Err(TweakError::Other("inner".to_string()))
        });
        assert!(matches!(result, Err(TweakError::Other(_))));
    }

    #[test]
    fn test_with_timeout_bounds_slow_calls() {
        let result: Result<()> = with_timeout("slow surface", Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        match result {
            Err(TweakError::Timeout { surface, .. }) => {
                assert_eq!(surface, "slow surface");
            }
            other => panic!("Expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_run_state_serialization() {
        assert_eq!(
            serde_json::to_string(&ServiceRunState::Running).unwrap(),
            "\"running\""
        );
        assert_eq!(
            serde_json::from_str::<ServiceRunState>("\"stopped\"").unwrap(),
            ServiceRunState::Stopped
        );
    }
}
