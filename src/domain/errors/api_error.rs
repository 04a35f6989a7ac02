//! REST API error types.

use thiserror::Error;

/// Failures of calls against the marketplace REST API.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ApiError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("request rejected: {message}")]
    Rejected { message: String },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("service unavailable: {message}")]
    Unavailable { message: String },

    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("unexpected API error: {message}")]
    Unexpected { message: String },
}

impl ApiError {
    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates rejected error.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates unexpected error.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Returns whether retrying the same call later may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::RateLimited { .. } | Self::Unavailable { .. }
        )
    }

    /// Returns whether the resource no longer exists on the server.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns whether the credentials were refused.
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(ApiError::network("down").is_recoverable());
        assert!(ApiError::RateLimited { retry_after_ms: 10 }.is_recoverable());
        assert!(!ApiError::rejected("bad token").is_recoverable());
        assert!(!ApiError::not_found("notification 1").is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = ApiError::not_found("notification 9");
        assert_eq!(err.to_string(), "not found: notification 9");
    }
}
