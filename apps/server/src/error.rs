//! # API Error Types
//!
//! Every expected failure in a request path maps to a typed
//! [`ApiError`] with a machine-readable code and an HTTP status.
//!
//! ## Error Flow
//! ```text
//! CoreError / DbError
//!      │
//!      ▼  (From impls)
//! ApiError { code, message }
//!      │
//!      ▼  (IntoResponse)
//! JSON body { "code": "...", "message": "..." } + status
//! ```
//!
//! ## Status Mapping
//! - not found (entities, unknown promo codes) → 404
//! - validation, promo rejections, refund bounds, eligibility,
//!   insufficient balance → 400
//! - duplicates and write conflicts → 409
//! - missing/invalid token → 401, wrong role → 403
//! - storage and anything unexpected → 500

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use chai_core::{CoreError, PromoError};
use chai_db::DbError;

/// Machine-readable error codes returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationFailed,
    PromoRejected,
    NotEligible,
    InsufficientBalance,
    InvalidRefund,
    SplitMismatch,
    Duplicate,
    Conflict,
    Unauthorized,
    Forbidden,
    Internal,
}

/// An API-level error with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

/// The JSON body clients receive.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, message)
    }

    pub fn bad_request(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Internal,
            message,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = ?self.code, message = %self.message, "Request failed");
        }

        let body = ErrorBody {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::not_found(err.to_string()),
            DbError::UniqueViolation { .. } => {
                ApiError::new(StatusCode::CONFLICT, ErrorCode::Duplicate, err.to_string())
            }
            DbError::Conflict { .. } => {
                ApiError::new(StatusCode::CONFLICT, ErrorCode::Conflict, err.to_string())
            }
            DbError::ForeignKeyViolation { .. } => {
                ApiError::bad_request(ErrorCode::ValidationFailed, err.to_string())
            }
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound { .. }
            | CoreError::OrderNotFound { .. }
            | CoreError::CustomerNotFound { .. } => ApiError::not_found(err.to_string()),

            // Unknown promo codes are a 404; the rest of the promo
            // rejections are client errors
            CoreError::Promo(PromoError::NotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                ErrorCode::PromoRejected,
                PromoError::NotFound.to_string(),
            ),
            CoreError::Promo(p) => ApiError::bad_request(ErrorCode::PromoRejected, p.to_string()),

            CoreError::NotEligible => {
                ApiError::bad_request(ErrorCode::NotEligible, err.to_string())
            }
            CoreError::InsufficientBalance { .. } => {
                ApiError::bad_request(ErrorCode::InsufficientBalance, err.to_string())
            }
            CoreError::InvalidRefundQuantity { .. } => {
                ApiError::bad_request(ErrorCode::InvalidRefund, err.to_string())
            }
            CoreError::SplitMismatch { .. } | CoreError::NotEnoughSplitGroups { .. } => {
                ApiError::bad_request(ErrorCode::SplitMismatch, err.to_string())
            }
            CoreError::OrderTooLarge { .. } | CoreError::Validation(_) => {
                ApiError::bad_request(ErrorCode::ValidationFailed, err.to_string())
            }
        }
    }
}

impl From<chai_core::ValidationError> for ApiError {
    fn from(err: chai_core::ValidationError) -> Self {
        ApiError::bad_request(ErrorCode::ValidationFailed, err.to_string())
    }
}

/// Result type for request handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_not_found_maps_to_404() {
        let err: ApiError = DbError::not_found("Order", "o1").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_unknown_promo_maps_to_404() {
        let err: ApiError = CoreError::Promo(PromoError::NotFound).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_promo_minimum_maps_to_400() {
        let err: ApiError = CoreError::Promo(PromoError::MinimumNotMet { min_cents: 5000 }).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, ErrorCode::PromoRejected);
    }

    #[test]
    fn test_duplicate_maps_to_409() {
        let err: ApiError = DbError::duplicate("customers.phone", "0300").into();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }
}
