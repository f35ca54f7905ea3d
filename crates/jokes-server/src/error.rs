//! Request-scoped errors and their HTTP mapping
//!
//! Every failure a request can hit ends here as a plain-text response and a
//! log entry:
//! - 400 for bodies that are not a JSON joke
//! - 401 for missing credentials or a denial from the accounts service
//! - 500 for joke-store failures and an unreachable accounts service

use jokes_core::{AuthError, ServiceError};
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::Rejection;

/// Joke operation a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `GET /joke`
    GetJoke,
    /// `GET /jokes`
    GetJokes,
    /// `POST /joke`
    AddJoke,
    /// `DELETE /joke`
    DeleteJoke,
}

impl Operation {
    /// Response text for a failed operation
    #[must_use]
    pub fn failure_text(self) -> &'static str {
        match self {
            Self::GetJoke => "Failed to get joke",
            Self::GetJokes => "Failed to get jokes",
            Self::AddJoke => "Failed to add joke",
            Self::DeleteJoke => "Failed to delete joke",
        }
    }
}

/// Errors surfaced to HTTP clients
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Body is not a JSON joke
    #[error("malformed request body: {0}")]
    MalformedRequest(String),

    /// No usable `Authorization` header
    #[error("missing or unusable Authorization header")]
    MissingCredentials,

    /// Accounts service refused the token
    #[error("accounts service denied access (status {status})")]
    Denied {
        /// Status returned by the accounts service
        status: u16,
    },

    /// Accounts service could not be reached
    #[error(transparent)]
    Upstream(#[from] AuthError),

    /// Joke service failed
    #[error("{operation:?} failed: {source}")]
    Service {
        /// Operation being served
        operation: Operation,
        /// Underlying failure
        #[source]
        source: ServiceError,
    },
}

impl warp::reject::Reject for ApiError {}

impl ApiError {
    /// Wrap a service failure
    #[inline]
    pub fn service(operation: Operation, source: ServiceError) -> Self {
        Self::Service { operation, source }
    }

    /// HTTP status for this error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingCredentials | Self::Denied { .. } => StatusCode::UNAUTHORIZED,
            Self::Upstream(_) | Self::Service { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Plain-text body for this error
    #[must_use]
    pub fn body(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "Invalid joke format",
            Self::MissingCredentials => "Missing Authorization header",
            Self::Denied { .. } => "Access Denied",
            Self::Upstream(_) => "Authorization service unavailable",
            Self::Service { operation, .. } => operation.failure_text(),
        }
    }

    fn log(&self) {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
    }

    /// Log and convert into a plain-text response
    #[must_use]
    pub fn into_response(self) -> Response {
        self.log();
        text(self.body(), self.status())
    }
}

/// Plain-text response with status
#[must_use]
pub fn text(body: &'static str, status: StatusCode) -> Response {
    warp::reply::with_status(body, status).into_response()
}

/// Turn any rejection into a plain-text response
///
/// # Errors
/// Never fails; the `Result` is required by `Filter::recover`.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(api) = err.find::<ApiError>() {
        api.log();
        return Ok(text(api.body(), api.status()));
    }

    // Sibling routes on the same path add `MethodNotAllowed` to a combined
    // rejection, so it must be checked after the body and query rejections.
    let (body, status) = if err.is_not_found() {
        ("Not Found", StatusCode::NOT_FOUND)
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        ("Payload Too Large", StatusCode::PAYLOAD_TOO_LARGE)
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        ("Length Required", StatusCode::LENGTH_REQUIRED)
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        ("Invalid query", StatusCode::BAD_REQUEST)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ("Method Not Allowed", StatusCode::METHOD_NOT_ALLOWED)
    } else {
        tracing::error!(rejection = ?err, "unhandled rejection");
        ("Internal Server Error", StatusCode::INTERNAL_SERVER_ERROR)
    };
    tracing::debug!(%status, "request rejected by router");
    Ok(text(body, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jokes_core::ExecutionError;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::MalformedRequest("eof".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::MissingCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Denied { status: 403 }.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(AuthError::UpstreamUnavailable {
                source: "refused".into()
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let spawn = ServiceError::from(ExecutionError::Spawn {
            program: "jokes".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        let err = ApiError::service(Operation::AddJoke, spawn);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body(), "Failed to add joke");
    }

    #[test]
    fn denial_and_missing_header_have_distinct_bodies() {
        assert_eq!(ApiError::MissingCredentials.body(), "Missing Authorization header");
        assert_eq!(ApiError::Denied { status: 403 }.body(), "Access Denied");
    }
}
