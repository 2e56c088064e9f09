//! Error types reported by remote message services.

use std::time::Duration;

use thiserror::Error;

/// Errors a [`MessageService`](super::MessageService) can report.
///
/// The distinguished variants (`RateLimited`, `InvalidInvite`,
/// `InvalidResource`, `PrivateResource`) drive recovery decisions in the
/// listing and download stages; the rest are reported as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The service asked the caller to pause before further requests.
    #[error("rate limited by the service, wait {wait:?}")]
    RateLimited {
        /// How long the service asked us to wait.
        wait: Duration,
    },

    /// Invite hash is unknown, revoked or expired.
    #[error("invite link is invalid or expired: {token}")]
    InvalidInvite {
        /// The rejected invite hash.
        token: String,
    },

    /// Reference is malformed or does not resolve to a chat.
    #[error("chat reference is malformed or unresolvable: {reference}")]
    InvalidResource {
        /// The reference as sent to the service.
        reference: String,
    },

    /// Chat exists but this account cannot read it.
    #[error("chat is private or inaccessible: {reference}")]
    PrivateResource {
        /// The reference as sent to the service.
        reference: String,
    },

    /// API credentials or session were rejected.
    #[error("service rejected the API credentials or session")]
    Unauthorized,

    /// The request did not complete in time.
    #[error("timeout during {operation}")]
    Timeout {
        /// Which service operation timed out.
        operation: String,
    },

    /// Transport-level failure (connection refused, reset, DNS...).
    #[error("network error during {operation}: {message}")]
    Network {
        /// Which service operation failed.
        operation: String,
        /// Underlying transport error text.
        message: String,
    },

    /// The service answered with something we did not expect.
    #[error("unexpected service response during {operation}: {message}")]
    Protocol {
        /// Which service operation failed.
        operation: String,
        /// What was wrong with the response.
        message: String,
    },
}

impl ServiceError {
    /// Creates a rate-limit error.
    #[must_use]
    pub fn rate_limited(wait: Duration) -> Self {
        Self::RateLimited { wait }
    }

    /// Creates an invalid-invite error.
    pub fn invalid_invite(token: impl Into<String>) -> Self {
        Self::InvalidInvite {
            token: token.into(),
        }
    }

    /// Creates an invalid-resource error.
    pub fn invalid_resource(reference: impl Into<String>) -> Self {
        Self::InvalidResource {
            reference: reference.into(),
        }
    }

    /// Creates a private-resource error.
    pub fn private_resource(reference: impl Into<String>) -> Self {
        Self::PrivateResource {
            reference: reference.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Creates a network error.
    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns the requested wait for rate-limit errors.
    #[must_use]
    pub fn rate_limit_wait(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { wait } => Some(*wait),
            _ => None,
        }
    }

    /// Returns true for failures that may succeed if simply repeated.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Network { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_display_includes_wait() {
        let err = ServiceError::rate_limited(Duration::from_secs(30));
        assert!(err.to_string().contains("30s"), "got: {err}");
        assert_eq!(err.rate_limit_wait(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_invite_display() {
        let err = ServiceError::invalid_invite("AbC");
        assert!(err.to_string().contains("AbC"));
        assert_eq!(err.rate_limit_wait(), None);
    }

    #[test]
    fn test_transient_classification() {
        assert!(ServiceError::timeout("get_message").is_transient());
        assert!(ServiceError::network("open_media", "connection reset").is_transient());
        assert!(!ServiceError::Unauthorized.is_transient());
        assert!(!ServiceError::protocol("resolve", "bad json").is_transient());
        assert!(!ServiceError::rate_limited(Duration::from_secs(1)).is_transient());
    }
}
