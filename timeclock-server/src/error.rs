//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error
//! variants. Policy rejections (geofence, punch alternation) carry the reason
//! codes the client acts on; ceremony security failures stay distinguishable
//! internally for audit logging but share one deliberately generic client
//! message to avoid oracle attacks.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::ceremony::CeremonyError;
use crate::db::LedgerError;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Business-rule rejection with a machine-readable reason code
    #[error("{message}")]
    Policy {
        code: &'static str,
        message: String,
    },

    /// Unauthorized - missing, inactive, or unverified employee
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable - required backing store is not configured
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Ceremony protocol error (challenge, signature, or counter failure)
    #[error("Ceremony error: {0}")]
    Ceremony(#[from] CeremonyError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Geofence rejection, including the nearest-site diagnostic when known
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::Policy {
            code: "OUT_OF_RANGE",
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Policy { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Ceremony(ref e) => match e {
                // Absence of credentials is a client-visible 400, not a
                // security failure
                CeremonyError::NoCredentials => StatusCode::BAD_REQUEST,
                CeremonyError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNAUTHORIZED,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::Policy { code, .. } => code,
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Ceremony(ref e) => match e {
                CeremonyError::NoCredentials => "NO_CREDENTIALS",
                CeremonyError::Storage(_) => "INTERNAL_ERROR",
                // All other ceremony failures share one external code; the
                // precise cause is only logged
                _ => "VERIFICATION_FAILED",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::Ceremony(ref e) => match e {
                CeremonyError::NoCredentials => {
                    "No registered credentials for this employee".to_string()
                }
                CeremonyError::Storage(_) => "Storage failure".to_string(),
                // Challenge missing/expired, bad signature and counter replay
                // are deliberately indistinguishable to the client
                _ => "Verification failed".to_string(),
            },
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Policy { .. } => "policy",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Ceremony(_) => "ceremony",
        }
    }

    /// Internal audit code for ceremony failures, more precise than the
    /// client-facing code
    fn audit_code(&self) -> &'static str {
        match self {
            Self::Ceremony(ref e) => match e {
                CeremonyError::ChallengeMissing => "CHALLENGE_MISSING",
                CeremonyError::ChallengeExpired => "CHALLENGE_EXPIRED",
                CeremonyError::VerificationFailed(_) => "SIGNATURE_INVALID",
                CeremonyError::CounterReplay { .. } => "COUNTER_REPLAY",
                CeremonyError::CredentialNotFound => "CREDENTIAL_NOT_FOUND",
                CeremonyError::NoCredentials => "NO_CREDENTIALS",
                CeremonyError::Storage(_) => "STORAGE_FAILURE",
            },
            _ => self.error_code(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AlreadyClockedIn => Self::Policy {
                code: "ALREADY_CLOCKED_IN",
                message: "An entry is already open; clock out before clocking in again".into(),
            },
            LedgerError::NoOpenEntry => Self::Policy {
                code: "NO_OPEN_ENTRY",
                message: "No open entry to clock out from".into(),
            },
            LedgerError::Storage(e) => Self::Internal(format!("ledger storage error: {e}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let audit_code = self.audit_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        match &self {
            Self::BadRequest(_) | Self::NotFound(_) | Self::Policy { .. } => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Client error"
                );
            }
            Self::Unauthorized(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Authentication error"
                );
            }
            Self::ServiceUnavailable(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Service unavailable"
                );
            }
            Self::Internal(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Server error"
                );
            }
            // Ceremony failures log the precise audit code even though the
            // client sees a generic message
            Self::Ceremony(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    audit_code = audit_code,
                    error = %internal_message,
                    "Ceremony failure (internal details logged)"
                );
            }
        }

        // All error responses include a `code` field for programmatic handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_codes() {
        let err = ApiError::from(LedgerError::AlreadyClockedIn);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "ALREADY_CLOCKED_IN");

        let err = ApiError::from(LedgerError::NoOpenEntry);
        assert_eq!(err.error_code(), "NO_OPEN_ENTRY");

        let err = ApiError::out_of_range("too far");
        assert_eq!(err.error_code(), "OUT_OF_RANGE");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_ceremony_errors_share_generic_client_message() {
        let missing = ApiError::Ceremony(CeremonyError::ChallengeMissing);
        let expired = ApiError::Ceremony(CeremonyError::ChallengeExpired);
        let replay = ApiError::Ceremony(CeremonyError::CounterReplay {
            stored: 5,
            provided: 5,
        });

        assert_eq!(missing.client_message(), expired.client_message());
        assert_eq!(missing.client_message(), replay.client_message());

        // But audit codes stay distinct
        assert_ne!(missing.audit_code(), expired.audit_code());
        assert_ne!(expired.audit_code(), replay.audit_code());
    }

    #[test]
    fn test_no_credentials_is_client_visible() {
        let err = ApiError::Ceremony(CeremonyError::NoCredentials);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "NO_CREDENTIALS");
    }
}
