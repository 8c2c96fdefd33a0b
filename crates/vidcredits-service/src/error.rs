//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use vidcredits_core::LedgerError;
use vidcredits_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid token.
    #[error("unauthorized")]
    Unauthorized,

    /// Login with an unknown email or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - malformed input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Input failed a domain rule.
    #[error("{message}")]
    Validation {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Conflict - resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Insufficient credits.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// The generation provider failed; the reserved credits were refunded.
    #[error("{message}")]
    GenerationFailed {
        /// Machine-readable code.
        code: &'static str,
        /// Provider detail.
        message: String,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Validation { code, message } => {
                (StatusCode::BAD_REQUEST, *code, message.clone(), None)
            }
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientCredits { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::GenerationFailed { code, message } => (
                StatusCode::BAD_GATEWAY,
                *code,
                format!("Video generation failed: {message}. Credits have been refunded."),
                Some(serde_json::json!({ "credits_refunded": true })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::UnknownUser { .. } => Self::NotFound("User not found".into()),
            LedgerError::DuplicateEmail { .. } => Self::Conflict(message),
            LedgerError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            LedgerError::InvalidAmount(_) => Self::Validation {
                code: "invalid_amount",
                message,
            },
            LedgerError::InvalidPackage(_) => Self::Validation {
                code: "invalid_package",
                message,
            },
            LedgerError::PaymentNotCompleted { .. } => Self::Validation {
                code: "payment_not_completed",
                message,
            },
            LedgerError::InvalidPrompt(_) => Self::Validation {
                code: "invalid_prompt",
                message,
            },
            LedgerError::UnknownDurationTier(_) => Self::Validation {
                code: "unknown_duration_tier",
                message,
            },
            LedgerError::InvalidRegistration(_) => Self::Validation {
                code: "invalid_registration",
                message,
            },
            LedgerError::InvalidId(_) => Self::BadRequest(message),
            LedgerError::GenerationProviderError(detail) => Self::GenerationFailed {
                code: "generation_provider_error",
                message: detail,
            },
            LedgerError::GenerationResultInvalid(detail) => Self::GenerationFailed {
                code: "generation_result_invalid",
                message: detail,
            },
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if let Some(ledger) = err.as_ledger_error() {
            return ledger.into();
        }
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::DuplicateExternalRef { external_ref, .. } => {
                Self::Conflict(format!("payment {external_ref} already processed"))
            }
            StoreError::InvalidJobTransition { .. } => Self::Conflict(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}
