//! Error type for API handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::provider::ProviderError;

/// Errors surfaced by API handlers. The chat surface speaks plain text,
/// so these render as text bodies rather than JSON envelopes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// A gatekeeping service rejected the request; its answer is relayed
    /// to the client unchanged.
    #[error("upstream rejected request with HTTP {status}")]
    Upstream { status: StatusCode, body: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn upstream(status: StatusCode, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Log errors appropriately
        match &self {
            ApiError::Internal(msg) => {
                error!(message = %msg, "API error");
            }
            ApiError::Upstream { status, .. } => {
                warn!(%status, "Upstream rejection relayed to client");
            }
            ApiError::BadRequest(msg) => {
                debug!(message = %msg, "Client error");
            }
        }

        let status = self.status_code();
        let body = match self {
            ApiError::Upstream { body, .. } => body,
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg,
        };

        (status, body).into_response()
    }
}

/// Provider API errors carry a user-presentable message; transport and
/// parse failures are masked.
impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Api { message, .. } => ApiError::Internal(message),
            _ => ApiError::Internal("Internal Server Error".into()),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status_codes() {
        assert_eq!(ApiError::bad_request("").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::internal("").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ApiError::upstream(StatusCode::TOO_MANY_REQUESTS, "slow down").status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_provider_api_errors_carry_their_message() {
        let err = ProviderError::Api {
            message: "model overloaded".into(),
            kind: Some("server_error".into()),
            param: None,
            code: None,
        };
        match ApiError::from(err) {
            ApiError::Internal(message) => assert_eq!(message, "model overloaded"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_provider_transport_errors_are_masked() {
        let err = ProviderError::Parse("bad json".into());
        match ApiError::from(err) {
            ApiError::Internal(message) => assert_eq!(message, "Internal Server Error"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
