//! The `POST /api/process-image` handler.

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::body::Bytes;

use crate::http::request::request_id;
use crate::http::response::RawJson;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::relay::error::RelayError;
use crate::relay::upload::receive_upload;

/// Accept one image, relay it downstream, return the processor's JSON.
///
/// Per request: `Received → Validated → Persisted → Forwarding →
/// {Succeeded | Failed} → CleanedUp`. Once a file is persisted, cleanup
/// runs on every path out of `relay_upload`.
pub async fn process_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<RawJson, RelayError> {
    let request_id = request_id(&headers);
    let result = relay_upload(&state, &request_id, multipart).await;

    match &result {
        Ok(_) => metrics::record_outcome("success"),
        Err(e) => {
            metrics::record_outcome(e.outcome());
            if e.status_code().is_server_error() {
                tracing::error!(
                    request_id = %request_id,
                    error = %e,
                    "Failed to process image upload"
                );
            } else {
                tracing::info!(request_id = %request_id, error = %e, "Upload rejected");
            }
        }
    }

    result.map(RawJson)
}

async fn relay_upload(
    state: &AppState,
    request_id: &str,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Bytes, RelayError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(
            request_id = %request_id,
            reason = %rejection.body_text(),
            "Request is not a multipart upload"
        );
        RelayError::MissingFile
    })?;

    let upload = receive_upload(&mut multipart, &state.field_name, &state.upload_dir).await?;
    metrics::record_upload_bytes(upload.size);
    tracing::info!(
        request_id = %request_id,
        content_type = %upload.content_type,
        bytes = upload.size,
        transient = %upload.file.file_name(),
        "Image upload accepted"
    );

    let result = state.downstream.forward(&upload, request_id).await;
    upload.file.remove().await;

    Ok(result?)
}
