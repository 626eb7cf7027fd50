//! Per-request error types and their HTTP rendering
//!
//! Every failure is reported synchronously in the response of the request
//! that caused it, as `{"error": {"type": ..., "message": ...}}`. Upstream
//! failures additionally carry `upstream_status` and `upstream_body`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// `/callback` state absent, unknown, expired or different from the
    /// one issued to this session.
    #[error("State mismatch or missing")]
    StateMismatch,

    #[error("Missing {0} parameter")]
    MissingParameter(&'static str),

    #[error("Not authenticated with Spotify. Login first.")]
    NotAuthenticated,

    /// Spotify answered with a non-success status. The status is passed
    /// through to the caller.
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
        body: String,
    },

    #[error("Spotify unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid response from Spotify: {0}")]
    InvalidUpstreamResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::StateMismatch => "state_mismatch",
            ApiError::MissingParameter(_) => "missing_parameter",
            ApiError::NotAuthenticated => "not_authenticated",
            ApiError::Upstream { .. } => "upstream_error",
            ApiError::Unreachable(_) => "upstream_unreachable",
            ApiError::InvalidUpstreamResponse(_) => "invalid_upstream_response",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::StateMismatch | ApiError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            // Statuses outside 100..=999 cannot come off the wire
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Unreachable(_) | ApiError::InvalidUpstreamResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a Web API failure, prefixing upstream body text with `context`.
    pub fn spotify(context: &str, err: spotify_api::Error) -> Self {
        match err {
            spotify_api::Error::Upstream { status, body } => ApiError::Upstream {
                status,
                message: format!("{context}: {body}"),
                body,
            },
            spotify_api::Error::Http(msg) => ApiError::Unreachable(msg),
            spotify_api::Error::Decode(msg) => ApiError::InvalidUpstreamResponse(msg),
        }
    }
}

impl From<spotify_auth::Error> for ApiError {
    fn from(err: spotify_auth::Error) -> Self {
        match err {
            spotify_auth::Error::TokenEndpoint { status, body } => ApiError::Upstream {
                status,
                message: format!("Token exchange failed: {body}"),
                body,
            },
            spotify_auth::Error::Http(msg) => ApiError::Unreachable(msg),
            spotify_auth::Error::InvalidResponse(msg) => ApiError::InvalidUpstreamResponse(msg),
            other @ spotify_auth::Error::InvalidUrl { .. } => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut error = serde_json::json!({
            "type": self.kind(),
            "message": self.to_string(),
        });
        if let ApiError::Upstream {
            status: upstream_status,
            body,
            ..
        } = &self
        {
            error["upstream_status"] = serde_json::json!(upstream_status);
            error["upstream_body"] = serde_json::json!(body);
        }

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            serde_json::json!({ "error": error }).to_string(),
        )
            .into_response()
    }
}
