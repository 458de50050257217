//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these. Every variant carries the name of the
//! operation that failed so messages read like `summarizing batch 2: ollama returned status 500`.

use crate::domain::FetchResult;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("{op}: peer resolution failed: {reason}")]
    PeerResolution { op: String, reason: String },

    /// Telegram call failed or returned an unexpected response shape.
    #[error("{op}: {reason}")]
    Upstream { op: String, reason: String },

    /// Summarization provider failed (HTTP error, bad status, empty/malformed body).
    #[error("{op}: {reason}")]
    Provider { op: String, reason: String },

    #[error("{op}: operation cancelled")]
    Cancelled { op: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export failed: {0}")]
    Export(String),

    /// Caller-supplied parameter could not be interpreted (dates, periods, paths).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DomainError {
    pub fn peer(op: impl Into<String>, reason: impl ToString) -> Self {
        Self::PeerResolution {
            op: op.into(),
            reason: reason.to_string(),
        }
    }

    pub fn upstream(op: impl Into<String>, reason: impl ToString) -> Self {
        Self::Upstream {
            op: op.into(),
            reason: reason.to_string(),
        }
    }

    pub fn provider(op: impl Into<String>, reason: impl ToString) -> Self {
        Self::Provider {
            op: op.into(),
            reason: reason.to_string(),
        }
    }

    pub fn cancelled(op: impl Into<String>) -> Self {
        Self::Cancelled { op: op.into() }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Prefix the operation name with an outer operation, keeping the error kind.
    pub fn context(self, outer: impl AsRef<str>) -> Self {
        let outer = outer.as_ref();
        let wrap = |op: String| format!("{}: {}", outer, op);
        match self {
            Self::PeerResolution { op, reason } => Self::PeerResolution {
                op: wrap(op),
                reason,
            },
            Self::Upstream { op, reason } => Self::Upstream {
                op: wrap(op),
                reason,
            },
            Self::Provider { op, reason } => Self::Provider {
                op: wrap(op),
                reason,
            },
            Self::Cancelled { op } => Self::Cancelled { op: wrap(op) },
            Self::Config(msg) => Self::Config(format!("{}: {}", outer, msg)),
            Self::Export(msg) => Self::Export(format!("{}: {}", outer, msg)),
            Self::InvalidInput(msg) => Self::InvalidInput(format!("{}: {}", outer, msg)),
        }
    }
}

/// A pagination run that stopped early. Carries whatever was collected before the failure.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct PartialFetch {
    pub partial: FetchResult,
    #[source]
    pub error: DomainError,
}

impl PartialFetch {
    pub fn into_error(self) -> DomainError {
        self.error
    }
}
