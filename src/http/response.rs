//! Error responses.
//!
//! # Responsibilities
//! - Map relay errors to HTTP status codes
//! - Render every failure as `{"error": "..."}`
//! - Pass downstream JSON through byte for byte
//!
//! # Design Decisions
//! - Only the public message is rendered; internal detail stays in logs

use axum::body::Bytes;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::relay::RelayError;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.public_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Already-serialised JSON, sent as is.
#[derive(Debug)]
pub struct RawJson(pub Bytes);

impl IntoResponse for RawJson {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "application/json")], self.0).into_response()
    }
}
