//! Error taxonomy for the monitor
//!
//! Fatal variants (`Io`, `MetricsUnavailable`, `InvalidWindow`, `InvalidSelector`,
//! `Connection`) end the invoking command. The remaining variants describe failures that are
//! isolated to one workload, namespace or row and are recovered where they occur.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the monitor library
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Record log could not be read or written
    #[error("record log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record log encoding failed while writing a row
    #[error("record log {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Usage source did not answer the startup probe
    #[error("metrics source unavailable: {0}")]
    MetricsUnavailable(String),

    /// One workload's usage query failed on every attempt
    #[error("usage fetch for {namespace}/{name} failed: {reason}")]
    TransientFetch {
        namespace: String,
        name: String,
        reason: String,
    },

    /// One namespace could not be listed during a tick
    #[error("listing namespace {namespace} failed: {reason}")]
    PartialListFailure { namespace: String, reason: String },

    /// One stored row could not be parsed
    #[error("skipping malformed record at row {row}: {reason}")]
    ParseSkip { row: u64, reason: String },

    /// Unparseable time-range argument
    #[error("invalid window {input:?}: {reason}")]
    InvalidWindow { input: String, reason: String },

    /// Unparseable label filter argument
    #[error("invalid label selector {input:?}: {reason}")]
    InvalidSelector { input: String, reason: String },

    /// Cluster client could not be constructed
    #[error("cluster connection failed: {0}")]
    Connection(String),
}

impl MonitorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must terminate the invoking command
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::TransientFetch { .. } | Self::PartialListFailure { .. } | Self::ParseSkip { .. }
        )
    }
}

/// Failure reported by an external collaborator call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The workload does not exist (or has no metrics yet)
    #[error("not found: {0}")]
    NotFound(String),

    /// The call failed but may succeed if repeated
    #[error("{0}")]
    Transient(String),

    /// The collaborator could not be reached at all
    #[error("unreachable: {0}")]
    Unreachable(String),
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovered_errors_are_not_fatal() {
        let fetch = MonitorError::TransientFetch {
            namespace: "ns1".into(),
            name: "app".into(),
            reason: "timeout".into(),
        };
        assert!(!fetch.is_fatal());

        let skip = MonitorError::ParseSkip {
            row: 3,
            reason: "bad cpu".into(),
        };
        assert!(!skip.is_fatal());
        assert!(MonitorError::MetricsUnavailable("down".into()).is_fatal());
    }

    #[test]
    fn test_io_error_names_path() {
        let err = MonitorError::io(
            "/data/output.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/data/output.csv"));
    }
}
