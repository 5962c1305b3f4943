//! Inbound request deadline.
//!
//! # Design Decisions
//! - Expiry renders the same `{"error": ...}` shape as every other failure
//! - The handler future is dropped on expiry; transient file guards clean up

use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::request::request_id;
use crate::observability::metrics;
use crate::relay::RelayError;

/// Middleware bounding the whole request by `deadline`.
pub async fn enforce_deadline(
    State(deadline): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = request_id(request.headers());
    let path = request.uri().path().to_string();

    match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            let err = RelayError::RequestTimeout(deadline);
            metrics::record_outcome(err.outcome());
            tracing::warn!(
                request_id = %request_id,
                path = %path,
                deadline = ?deadline,
                "Request deadline exceeded"
            );
            err.into_response()
        }
    }
}
