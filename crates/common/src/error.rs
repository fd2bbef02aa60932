//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request or the stored record was malformed: empty owner tag,
    /// non-object payload, bad hex, wrong field length, undecodable payload.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No sealed record exists under the requested id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Key unwrap or payload authentication failed.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// The master key is missing or invalid, so no cryptographic work can run.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::EncryptionFailure(_) => 500,
            ServiceError::Unavailable(_) => 503,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code placed in the error response body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::EncryptionFailure(_) => "encryption_failure",
            ServiceError::Unavailable(_) => "service_unavailable",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}
