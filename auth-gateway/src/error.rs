use crate::cache::CacheError;
use crate::validator::ValidationError;
use auth_identity::{DirectoryError, IdentityError, Principal};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub const MISMATCH_MESSAGE: &str = "No token provided, or incorrect ones.";
pub const VERIFY_FAILED_MESSAGE: &str = "Failed to authenticate token. Maybe token is expired.";

/// Request-terminating gateway failures, rendered as JSON
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Handshake refused")]
    Forbidden { location: String, scheme: String },

    #[error("Unauthorized access")]
    Unauthenticated { principal: Option<Principal> },

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(#[from] DirectoryError),

    #[error("Credential issuance failed: {0}")]
    Issuance(#[from] IdentityError),

    #[error("Session cache rejected credential: {0}")]
    Cache(#[from] CacheError),

    #[error("Invalid gateway configuration: {0}")]
    InvalidConfiguration(String),

    /// Missing or stale credential, or no principal to check it against
    #[error("Credential rejected: {}", .reason.reason())]
    CredentialMismatch {
        reason: ValidationError,
        host: String,
        origin: Option<String>,
        user: Option<String>,
    },

    /// Signature or expiry failure; the status is configurable
    #[error("Credential verification failed: {}", .reason.reason())]
    VerificationFailed { reason: ValidationError, status: StatusCode },
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Forbidden { location, scheme } => {
                let mut response = StatusCode::UNAUTHORIZED.into_response();
                let headers = response.headers_mut();
                if let Ok(location) = HeaderValue::from_str(&location) {
                    headers.insert(header::LOCATION, location);
                }
                if let Ok(scheme) = HeaderValue::from_str(&scheme) {
                    headers.insert(header::WWW_AUTHENTICATE, scheme);
                }
                response
            }
            GatewayError::Unauthenticated { principal } => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "message": "Unauthorized access",
                    "authUser": principal.as_ref().map(Principal::as_str),
                })),
            )
                .into_response(),
            GatewayError::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Authentication required" })),
            )
                .into_response(),
            GatewayError::DirectoryUnavailable(err) => {
                tracing::error!(error = %err, "Directory lookup failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "message": "Directory unavailable" })),
                )
                    .into_response()
            }
            GatewayError::Issuance(_) | GatewayError::Cache(_) | GatewayError::InvalidConfiguration(_) => {
                tracing::error!(error = %self, "Gateway failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error" })),
                )
                    .into_response()
            }
            GatewayError::CredentialMismatch {
                reason: _,
                host,
                origin,
                user,
            } => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "auth": false,
                    "message": MISMATCH_MESSAGE,
                    "host": host,
                    "origin": origin,
                    "user": user,
                })),
            )
                .into_response(),
            GatewayError::VerificationFailed { reason: _, status } => (
                status,
                Json(json!({ "auth": false, "message": VERIFY_FAILED_MESSAGE })),
            )
                .into_response(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
