//! Maps error kinds onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::EcommerceError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl EcommerceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!("request failed: {}", detail);
                "Server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(EcommerceError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(EcommerceError::InvalidState("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(EcommerceError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(EcommerceError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(EcommerceError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(EcommerceError::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(EcommerceError::Internal("db down".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
