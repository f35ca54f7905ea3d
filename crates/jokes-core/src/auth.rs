//! Delegated authorization contract
//!
//! Privileged operations are authorized by a remote accounts service. This
//! module defines the seam; the HTTP implementation lives in the server.

/// Fixed scheme prefix of the `Authorization` header
pub const BEARER_PREFIX: &str = "Bearer ";

/// Outcome of one authorization round trip
///
/// Never cached; every privileged request produces a fresh decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    /// Accounts service answered 200
    Allowed,
    /// Accounts service answered anything else
    Denied {
        /// Status the accounts service returned
        status: u16,
    },
}

impl AuthDecision {
    /// Decision for an accounts-service status code
    #[inline]
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        if status == 200 {
            Self::Allowed
        } else {
            Self::Denied { status }
        }
    }

    /// Whether the request may proceed
    #[inline]
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Authorization could not be decided
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Accounts service unreachable (connect, DNS, timeout)
    #[error("accounts service unavailable: {source}")]
    UpstreamUnavailable {
        /// Transport failure reported by the HTTP client
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Decides whether a bearer token grants admin access
#[async_trait::async_trait]
pub trait Authorizer: Send + Sync {
    /// Check `token` with the accounts service
    ///
    /// # Errors
    /// Returns `AuthError::UpstreamUnavailable` only when no answer was
    /// received; a non-200 answer is `Ok(AuthDecision::Denied { .. })`.
    async fn authorize(&self, token: &str) -> Result<AuthDecision, AuthError>;
}

/// Extract the token from an `Authorization` header value
///
/// Returns `None` when the `Bearer ` prefix is missing.
#[inline]
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix(BEARER_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_200_is_allowed() {
        assert!(AuthDecision::from_status(200).is_allowed());
        assert_eq!(AuthDecision::from_status(204), AuthDecision::Denied { status: 204 });
        assert!(!AuthDecision::from_status(403).is_allowed());
        assert!(!AuthDecision::from_status(500).is_allowed());
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer "), Some(""));
        assert_eq!(bearer_token("Basic dXNlcg=="), None);
        assert_eq!(bearer_token("bearer abc"), None);
    }

    #[test]
    fn upstream_failure_keeps_its_cause() {
        let err = AuthError::UpstreamUnavailable {
            source: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "accounts service unavailable: connection refused");
        let cause = std::error::Error::source(&err).unwrap();
        assert_eq!(cause.to_string(), "connection refused");
    }
}
