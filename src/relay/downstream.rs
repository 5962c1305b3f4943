//! Client for the downstream image processor.
//!
//! # Responsibilities
//! - Rebuild the upload as an outbound multipart request
//! - Stream the staged file from disk instead of buffering it
//! - Enforce the processor deadline
//! - Classify failures (timeout, transport, status, body)

use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use axum::body::Bytes;
use serde_json::value::RawValue;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use url::Url;

use crate::config::DownstreamConfig;
use crate::http::X_REQUEST_ID;
use crate::observability::metrics;
use crate::relay::upload::ReceivedUpload;

/// Failures talking to the processor. Never shown to the caller.
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("could not reopen staged upload: {0}")]
    Open(#[source] std::io::Error),

    #[error("downstream request timed out after {0:?}")]
    Timeout(Duration),

    #[error("downstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("downstream responded with status {0}")]
    Status(StatusCode),

    #[error("downstream response was not valid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),
}

impl DownstreamError {
    fn outcome(&self) -> &'static str {
        match self {
            DownstreamError::Open(_) => "open_failed",
            DownstreamError::Timeout(_) => "timeout",
            DownstreamError::Transport(_) => "transport",
            DownstreamError::Status(_) => "bad_status",
            DownstreamError::InvalidBody(_) => "invalid_body",
        }
    }
}

/// Shared handle to the processor. Cheap to clone; clones share one
/// connection pool.
#[derive(Debug, Clone)]
pub struct DownstreamClient {
    client: Client,
    url: Url,
    field_name: String,
    timeout: Duration,
}

impl DownstreamClient {
    pub fn new(client: Client, url: Url, field_name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url,
            field_name: field_name.into(),
            timeout,
        }
    }

    /// Build a client from configuration.
    pub fn from_config(
        config: &DownstreamConfig,
        field_name: &str,
    ) -> Result<Self, DownstreamSetupError> {
        let url = Url::parse(&config.url)?;
        let client = Client::builder()
            .user_agent(concat!("image-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DownstreamSetupError::Client)?;
        Ok(Self::new(client, url, field_name, config.timeout()))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send one staged upload to the processor and return its JSON reply.
    ///
    /// Exactly one attempt is made. The reply bytes are checked to be JSON
    /// but returned untouched, so key order and number formatting survive.
    pub async fn forward(
        &self,
        upload: &ReceivedUpload,
        request_id: &str,
    ) -> Result<Bytes, DownstreamError> {
        let started = Instant::now();
        let result = self.send(upload, request_id).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.outcome(),
        };
        metrics::record_downstream(outcome, started.elapsed());
        result
    }

    async fn send(&self, upload: &ReceivedUpload, request_id: &str) -> Result<Bytes, DownstreamError> {
        let file = tokio::fs::File::open(upload.file.path())
            .await
            .map_err(DownstreamError::Open)?;
        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, upload.size)
            .file_name(upload.display_name().to_owned())
            .mime_str(&upload.content_type)
            .map_err(DownstreamError::Transport)?;
        let form = Form::new().part(self.field_name.clone(), part);

        tracing::debug!(
            request_id = %request_id,
            url = %self.url,
            bytes = upload.size,
            "Forwarding upload to downstream"
        );

        let response = self
            .client
            .post(self.url.clone())
            .header(X_REQUEST_ID, request_id)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e, DownstreamError::Transport))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownstreamError::Status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(e, DownstreamError::Transport))?;
        serde_json::from_slice::<&RawValue>(&body).map_err(DownstreamError::InvalidBody)?;
        Ok(body)
    }

    fn classify(
        &self,
        err: reqwest::Error,
        otherwise: fn(reqwest::Error) -> DownstreamError,
    ) -> DownstreamError {
        if err.is_timeout() {
            DownstreamError::Timeout(self.timeout)
        } else {
            otherwise(err)
        }
    }
}

/// Errors building a [`DownstreamClient`] at startup.
#[derive(Debug, Error)]
pub enum DownstreamSetupError {
    #[error("invalid downstream URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
