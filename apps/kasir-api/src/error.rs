//! Error types for the Kasir API.
//!
//! Every failure leaves the server as the same envelope:
//!
//! ```text
//! {"success": false, "error": {"code": "INSUFFICIENT_STOCK",
//!                              "message": "Insufficient stock for product: Es Teh Manis"}}
//! ```
//!
//! | ApiError          | HTTP | code                  |
//! |-------------------|------|-----------------------|
//! | Validation        | 400  | VALIDATION_ERROR      |
//! | NotFound          | 404  | NOT_FOUND             |
//! | InsufficientStock | 400  | INSUFFICIENT_STOCK    |
//! | Unauthorized      | 401  | UNAUTHORIZED          |
//! | PaymentGateway    | 502  | PAYMENT_GATEWAY_ERROR |
//! | Internal          | 500  | INTERNAL_ERROR        |

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use kasir_core::envelope::{ApiEnvelope, ErrorBody};
use kasir_core::{CoreError, ValidationError};
use kasir_db::DbError;

pub type ApiResult<T> = Result<T, ApiError>;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// `details` is `{field: [message, ...]}` when a field is to blame.
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    PaymentGateway(String),

    /// Logged in full; the client only sees a generic message.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Validation failure attributed to one field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: "Validation failed".to_string(),
            details: Some(json!({ field: [message.into()] })),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::PaymentGateway(_) => "PAYMENT_GATEWAY_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::InsufficientStock(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();

        let (message, details) = match self {
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Unhandled error");
                ("An unexpected error occurred".to_string(), None)
            }
            ApiError::Validation { message, details } => (message, details),
            other => (other.to_string(), None),
        };

        let body = ApiEnvelope::<()>::err(ErrorBody {
            code,
            message,
            details,
        });

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::field(err.field(), err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(_) => ApiError::NotFound(err.to_string()),
            CoreError::InsufficientStock { .. } => ApiError::InsufficientStock(err.to_string()),
            CoreError::Validation(v) => v.into(),
            CoreError::InvalidStatusTransition { .. } => ApiError::validation(err.to_string()),
            CoreError::InvalidPeriod(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, .. } => ApiError::NotFound(format!("{entity} not found")),
            DbError::UniqueViolation { ref field, .. } => {
                let column = field.rsplit('.').next().unwrap_or(field.as_str()).to_string();
                ApiError::field(&column, err.to_string())
            }
            DbError::ForeignKeyViolation { message } => ApiError::validation(message),
            DbError::Business(core) => core.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation {
            message: "Invalid request body".to_string(),
            details: Some(json!({ "body": [rejection.body_text()] })),
        }
    }
}
