//! Request and response types exchanged over the public HTTP API.
//!
//! Sealed records themselves are returned verbatim as [`SealedRecord`](crate::SealedRecord).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Create endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /records`.
///
/// `payload` must be a JSON object; `owner_tag` must be non-empty. Both checks
/// are made by the handler, not by serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealRequest {
    /// Opaque owner reference (party or account id).
    pub owner_tag: String,
    /// JSON object to seal.
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Decrypt endpoint
// ---------------------------------------------------------------------------

/// Successful response body for `POST /records/{id}/decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealResponse {
    pub id: Uuid,
    pub owner_tag: String,
    /// The original payload, freshly decrypted.
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether the master key loaded successfully.
    pub master_key_ready: bool,
    /// Number of sealed records currently held.
    pub records_stored: usize,
}
