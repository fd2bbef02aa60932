//! Axum request handlers for all service endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    protocol::{ErrorResponse, HealthResponse, RevealResponse, SealRequest},
    ServiceError,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::state::AppState;
use crate::crypto::EnvelopeError;
use crate::store::StoreError;

const BAD_BODY: &str =
    "request body must be a JSON object with a string owner_tag and an object payload";
const BAD_ID: &str = "record id must be a UUID";

/// `POST /records` — seal a JSON object and store the resulting record.
///
/// Responds `201 Created` with the sealed record. The payload itself is never
/// stored or logged in the clear.
pub async fn create(
    State(state): State<AppState>,
    req: Result<Json<SealRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match req {
        Ok(req) => req,
        Err(rejection) => {
            debug!(status = %rejection.status(), "rejected request body");
            return error_response(ServiceError::BadRequest(BAD_BODY.into()));
        }
    };
    if req.owner_tag.trim().is_empty() {
        return error_response(ServiceError::BadRequest(
            "owner_tag must be a non-empty string".into(),
        ));
    }
    if !req.payload.is_object() {
        return error_response(ServiceError::BadRequest(
            "payload must be a JSON object".into(),
        ));
    }

    let record = match state.envelope.seal(&req.owner_tag, &req.payload) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "seal failed");
            return error_response(e.into());
        }
    };

    if let Err(e) = state.records.insert(record.clone()).await {
        warn!(record_id = %record.id, error = %e, "store rejected sealed record");
        return error_response(ServiceError::Internal(e.to_string()));
    }

    info!(record_id = %record.id, owner_tag = %record.owner_tag, "record created");
    (StatusCode::CREATED, Json(record)).into_response()
}

/// `GET /records/{id}` — return the stored sealed record without decrypting.
pub async fn fetch(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let id = match record_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.records.get(id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// `POST /records/{id}/decrypt` — verify and decrypt a stored record.
///
/// Validation and format failures map to `400`; key-unwrap and payload
/// authentication failures map to `500`.
pub async fn decrypt(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let id = match record_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let record = match state.records.get(id).await {
        Ok(r) => r,
        Err(e) => return error_response(e.into()),
    };

    match state.envelope.open::<serde_json::Value>(&record) {
        Ok(payload) => {
            info!(record_id = %record.id, "record decrypted");
            let body = RevealResponse {
                id: record.id,
                owner_tag: record.owner_tag,
                payload,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            warn!(record_id = %record.id, error = %e, "open failed");
            error_response(e.into())
        }
    }
}

/// `DELETE /records/{id}` — drop a stored record.
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let id = match record_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.records.remove(id).await {
        Ok(_) => {
            info!(record_id = %id, "record deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e.into()),
    }
}

/// `GET /health` — liveness and readiness check.
///
/// Returns `200 OK` when the master key is loaded.
/// Returns `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let master_key_ready = state.envelope.is_ready();
    let records_stored = state.records.len().await;

    let (status_code, status_str) = if master_key_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        master_key_ready,
        records_stored,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

impl From<EnvelopeError> for ServiceError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::Validation(_) | EnvelopeError::Format(_) => {
                ServiceError::BadRequest(e.to_string())
            }
            EnvelopeError::Unwrap | EnvelopeError::Decrypt => {
                ServiceError::EncryptionFailure(e.to_string())
            }
            EnvelopeError::Config(_) => ServiceError::Unavailable(e.to_string()),
            EnvelopeError::Internal(_) => ServiceError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ServiceError::NotFound(e.to_string()),
            StoreError::Duplicate(_) => ServiceError::Internal(e.to_string()),
        }
    }
}

/// Unwrap the `{id}` path segment. The rejection text is not echoed back.
fn record_id(id: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, Response> {
    match id {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => {
            debug!(status = %rejection.status(), "rejected record id");
            Err(error_response(ServiceError::BadRequest(BAD_ID.into())))
        }
    }
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&err))).into_response()
}
