//! Error types for the download module.
//!
//! Every failure of a single transfer is one of three kinds; the engine
//! turns them into [`TransferOutcome`](super::TransferOutcome) values and
//! never propagates them further.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::service::ServiceError;

/// Errors that can occur while transferring one media payload.
#[derive(Debug, Error)]
pub enum TransferError {
    /// File system error (create, write, flush).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The service asked us to back off.
    #[error("rate limited by the service, wait {wait:?}")]
    RateLimited {
        /// The requested wait.
        wait: Duration,
    },

    /// Any other service failure.
    #[error("{source}")]
    Unknown {
        /// The underlying service error.
        #[source]
        source: ServiceError,
    },
}

impl TransferError {
    /// Creates an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> TransferErrorKind {
        match self {
            Self::Io { .. } => TransferErrorKind::Io,
            Self::RateLimited { .. } => TransferErrorKind::RateLimited,
            Self::Unknown { .. } => TransferErrorKind::Unknown,
        }
    }
}

impl From<ServiceError> for TransferError {
    fn from(source: ServiceError) -> Self {
        match source {
            ServiceError::RateLimited { wait } => Self::RateLimited { wait },
            source => Self::Unknown { source },
        }
    }
}

/// Coarse failure kind recorded in outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferErrorKind {
    /// Local file system failure.
    Io,
    /// Rate limited by the service.
    RateLimited,
    /// Anything else.
    Unknown,
}

impl TransferErrorKind {
    /// Short label for logs and summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::RateLimited => "rate_limited",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransferErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_includes_path() {
        let err = TransferError::io(
            "/tmp/a.bin",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/a.bin"), "got: {msg}");
        assert!(msg.contains("denied"));
        assert_eq!(err.kind(), TransferErrorKind::Io);
    }

    #[test]
    fn test_service_rate_limit_maps_to_rate_limited() {
        let err = TransferError::from(ServiceError::rate_limited(Duration::from_secs(3)));
        assert!(matches!(err, TransferError::RateLimited { wait } if wait == Duration::from_secs(3)));
        assert_eq!(err.kind(), TransferErrorKind::RateLimited);
    }

    #[test]
    fn test_other_service_errors_are_unknown() {
        let err = TransferError::from(ServiceError::Unauthorized);
        assert_eq!(err.kind(), TransferErrorKind::Unknown);
        assert!(err.to_string().contains("credentials"));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(TransferErrorKind::RateLimited.to_string(), "rate_limited");
        assert_eq!(TransferErrorKind::Io.as_str(), "io");
    }
}
