//! Error types for subscriptions and teardown.

use std::fmt;
use thiserror::Error;

/// Boxed error returned by fallible cleanup actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for notification and disposal operations.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Unknown property `{property}` on {source_type}")]
    UnknownProperty {
        property: String,
        source_type: &'static str,
    },

    #[error("Cleanup failed: {} of {attempted} obligations reported errors", failures.len())]
    CleanupFailed {
        failures: Vec<CleanupFailure>,
        attempted: usize,
    },
}

impl NotifyError {
    pub(crate) fn disposed(what: &str) -> Self {
        NotifyError::IllegalState(format!("{what} has been disposed"))
    }
}

/// Which list a failed cleanup obligation came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObligationKind {
    Action,
    Disposable,
}

/// A single cleanup obligation that reported an error.
#[derive(Debug)]
pub struct CleanupFailure {
    /// Registration position within its list (0-based).
    pub position: usize,
    pub kind: ObligationKind,
    pub error: BoxError,
}

impl fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ObligationKind::Action => "action",
            ObligationKind::Disposable => "disposable",
        };
        write!(f, "{} #{}: {}", kind, self.position, self.error)
    }
}

/// Result type for notification and disposal operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
