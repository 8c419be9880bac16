//! Error types for tweak engine operations.

use thiserror::Error;

/// Primary error type for tweak operations.
#[derive(Error, Debug)]
pub enum TweakError {
    // Store errors
    #[error("Value not found: {path}\\{name}")]
    NotFound { path: String, name: String },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Store backend error: {0}")]
    StoreBackend(String),

    // Catalog errors
    #[error("Unknown tweak id: {id}")]
    UnknownTweak { id: String },

    #[error("Duplicate tweak id in catalog: {id}")]
    DuplicateTweak { id: String },

    // Snapshot errors
    #[error("Snapshot file unreadable: {reason}")]
    Corrupt { reason: String },

    #[error("Type mismatch for {coordinate}: declared {declared}, value is {actual}")]
    TypeMismatch {
        coordinate: String,
        declared: String,
        actual: String,
    },

    #[error("Failed to persist snapshot to {path}: {reason}")]
    PersistFailed { path: String, reason: String },

    // Control surface errors
    #[error("Service not found: {name}")]
    ServiceNotFound { name: String },

    #[error("Power scheme not found: {scheme}")]
    SchemeNotFound { scheme: String },

    #[error("{surface} timed out after {seconds}s")]
    Timeout { surface: String, seconds: u64 },

    #[error("Control surface error: {0}")]
    ControlSurface(String),

    // Aggregated per-step failures
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TweakError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. }
                | Self::UnknownTweak { .. }
                | Self::ServiceNotFound { .. }
                | Self::SchemeNotFound { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::PermissionDenied { .. } => Some("Re-run with elevated privileges"),
            Self::UnknownTweak { .. } => Some("Run: st list"),
            Self::Corrupt { .. } => Some("Delete the snapshot file to start fresh"),
            Self::Timeout { .. } => Some("Check that the service control surface is responsive"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using TweakError.
pub type Result<T> = std::result::Result<T, TweakError>;

/// One failed step inside a larger batch.
///
/// `step` names the coordinate, service, or surface that failed so the
/// aggregate can point at exactly what went wrong.
#[derive(Debug)]
pub struct StepFailure {
    /// Human-readable identifier of the failing step (e.g. a coordinate key).
    pub step: String,
    /// The underlying error.
    pub error: TweakError,
}

impl StepFailure {
    pub fn new(step: impl Into<String>, error: TweakError) -> Self {
        Self {
            step: step.into(),
            error,
        }
    }
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.step, self.error)
    }
}

/// Joined collection of per-step failures.
///
/// Batch operations (apply, restore) never abort on an individual failure;
/// they collect every failure here and keep going. An empty collection is
/// not an error.
#[derive(Debug, Default)]
pub struct AggregateError {
    failures: Vec<StepFailure>,
}

impl AggregateError {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed step.
    pub fn push(&mut self, step: impl Into<String>, error: TweakError) {
        self.failures.push(StepFailure::new(step, error));
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// The recorded failures, in the order they occurred.
    #[must_use]
    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }

    /// Consume into `Ok(())` when empty, `Err(self)` otherwise.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} step(s) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
