//! Failure taxonomy shared by every operation in the harness.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Why an operation did not produce a value.
///
/// Network-facing variants carry the URL that was requested so a failed
/// scenario can be diagnosed from its outcome alone.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// Connection-level failure (refused, reset, DNS, body decode).
    #[error("network error requesting {url}: {message}")]
    Network { url: String, message: String },
    /// A deadline elapsed before the operation finished.
    #[error("deadline of {}ms exceeded", after.as_millis())]
    Timeout { after: Duration },
    /// The endpoint answered, but not with a 2xx status.
    #[error("{url} answered with status {status}")]
    NonSuccessStatus { url: String, status: u16 },
    /// Lost a race, or the enclosing scope closed.
    #[error("operation cancelled")]
    Cancelled,
    /// A pool task failed or the pool was unavailable.
    #[error("worker task failed: {message}")]
    Worker { message: String },
}

impl Failure {
    pub fn network(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn worker(message: impl fmt::Display) -> Self {
        Self::Worker {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Network { .. } => FailureKind::Network,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::NonSuccessStatus { .. } => FailureKind::NonSuccessStatus,
            Self::Cancelled => FailureKind::Cancelled,
            Self::Worker { .. } => FailureKind::Worker,
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Fieldless mirror of [`Failure`] for assertions and report grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Network,
    Timeout,
    NonSuccessStatus,
    Cancelled,
    Worker,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::Timeout => "timeout",
            FailureKind::NonSuccessStatus => "non_success_status",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Worker => "worker",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
