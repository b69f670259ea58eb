use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jsgate_core::{ActivationError, DuplicateError, InvalidCampaignError, InvalidPatternError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal error: {0:#}")]
    Internal(anyhow::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Storage errors are internal unless they carry a [`DuplicateError`].
impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<DuplicateError>() {
            Some(dup) => ApiError::Conflict(dup.to_string()),
            None => ApiError::Internal(e),
        }
    }
}

impl From<InvalidPatternError> for ApiError {
    fn from(e: InvalidPatternError) -> Self {
        ApiError::BadRequest(e.reason.to_string())
    }
}

impl From<InvalidCampaignError> for ApiError {
    fn from(e: InvalidCampaignError) -> Self {
        ApiError::BadRequest(e.reason.to_string())
    }
}

impl From<ActivationError> for ApiError {
    fn from(e: ActivationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Missing or invalid bearer token".to_string(),
            ),
            ApiError::Internal(e) => {
                error!("Request failed: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let status = |e: ApiError| e.into_response().status();
        assert_eq!(status(ApiError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(ApiError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(status(ApiError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(anyhow::anyhow!("db down")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicate_under_context_is_conflict() {
        let err = anyhow::Error::new(DuplicateError {
            what: "Domain pattern 'example.com'".into(),
        })
        .context("Failed to insert whitelist entry");

        match ApiError::from(err) {
            ApiError::Conflict(msg) => {
                assert_eq!(msg, "Domain pattern 'example.com' already exists")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pattern_rejection_keeps_reason() {
        let err = jsgate_core::pattern::validate_pattern("*").unwrap_err();
        match ApiError::from(err) {
            ApiError::BadRequest(msg) => assert_eq!(msg, "Bare wildcard (*) is not allowed"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
