use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid webhook signature")]
    SignatureInvalid,

    #[error("Payment processor timed out")]
    UpstreamTimeout,

    #[error("Payment processor error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable error envelope: every error response carries `ok: false` so
/// clients can branch on a single field regardless of status code.
#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone()))
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", None),
            AppError::SignatureInvalid => {
                (StatusCode::BAD_REQUEST, "Invalid signature", None)
            }
            AppError::UpstreamTimeout => {
                tracing::warn!("Payment processor call timed out");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Payment processor timed out, retry later",
                    None,
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!("Payment processor error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Payment processor error, retry later",
                    None,
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON", Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            ok: false,
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Extension for `Option` lookups that should 404 when empty.
pub trait OptionExt<T> {
    fn or_not_found(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(message.to_string()))
    }
}

/// Shared error message constants, so handlers and tests agree on wording.
pub mod msg {
    pub const COURSE_NOT_FOUND: &str = "Course not found";
    pub const COURSE_ID_REQUIRED: &str = "courseId is required";
    pub const SESSION_ID_REQUIRED: &str = "session_id is required";
    pub const SESSION_NOT_FOUND: &str = "Checkout session not found";
    pub const SESSION_MISSING_METADATA: &str =
        "Checkout session has no enrollment metadata";
    pub const SIGNATURE_HEADER_MISSING: &str = "Missing stripe-signature header";
    pub const INVALID_SIGNATURE_FORMAT: &str = "Invalid signature header format";
    pub const INVALID_TIMESTAMP_IN_SIGNATURE: &str = "Invalid timestamp in signature header";
    pub const WEBHOOK_SECRET_MISSING: &str = "Webhook secret not configured";
    pub const ENROLLMENT_VANISHED: &str = "Enrollment row missing after conflict";
}
