//! Error type for route handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing, malformed, expired or unverifiable bearer token.
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated, but without the required role (or an anonymous write).
    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// Keycloak refused to create the user; the status is passed through.
    #[error("Failed to create user: {reason}")]
    UserRejected { status: StatusCode, reason: String },

    #[error("Error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden => StatusCode::FORBIDDEN,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::UserRejected { status, .. } => *status,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(err: reqwest::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            // Access failures carry no body.
            ServerError::Unauthorized | ServerError::Forbidden | ServerError::NotFound => {
                status.into_response()
            }
            ServerError::UserRejected { .. } | ServerError::Internal(_) => {
                (status, self.to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let rejected = ServerError::UserRejected {
            status: StatusCode::CONFLICT,
            reason: "Conflict".into(),
        };
        assert_eq!(rejected.to_string(), "Failed to create user: Conflict");
        assert_eq!(rejected.status(), StatusCode::CONFLICT);
        assert_eq!(
            ServerError::Internal("boom".into()).to_string(),
            "Error: boom"
        );
    }

    #[test]
    fn test_access_errors_map_to_status() {
        assert_eq!(
            ServerError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServerError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
