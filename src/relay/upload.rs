//! Inbound multipart extraction.
//!
//! # Responsibilities
//! - Find the single file under the configured field
//! - Reject non-image content types before anything touches disk
//! - Stream accepted bytes chunk by chunk into a [`TransientFile`]

use std::path::Path;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;

use crate::relay::error::RelayError;
use crate::relay::transient::TransientFile;

/// Content type assumed for file parts that do not declare one.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// An accepted upload, staged on disk.
#[derive(Debug)]
pub struct ReceivedUpload {
    pub file: TransientFile,
    pub original_name: Option<String>,
    pub content_type: String,
    pub size: u64,
}

impl ReceivedUpload {
    /// Filename presented to the downstream processor.
    pub fn display_name(&self) -> &str {
        match self.original_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.file.file_name(),
        }
    }
}

/// Whether a declared MIME type is acceptable as an image.
pub fn is_image_mime(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// Read the multipart stream and stage the file found under `field_name`.
///
/// Parts under other names, and non-file parts under `field_name`, are
/// skipped. A second file under `field_name` is an error; the first one
/// is deleted when its guard drops.
pub async fn receive_upload(
    multipart: &mut Multipart,
    field_name: &str,
    dir: &Path,
) -> Result<ReceivedUpload, RelayError> {
    let mut received: Option<ReceivedUpload> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(map_multipart_error)? {
        if field.name() != Some(field_name) || field.file_name().is_none() {
            continue;
        }
        if received.is_some() {
            tracing::warn!(field = field_name, "Rejecting second file in upload");
            return Err(RelayError::UnexpectedField);
        }

        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        if !is_image_mime(&content_type) {
            tracing::warn!(content_type = %content_type, "Rejecting non-image upload");
            return Err(RelayError::InvalidFileType { content_type });
        }

        let original_name = field.file_name().map(str::to_owned);
        let (file, mut out) = TransientFile::create(dir).await?;

        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await.map_err(map_multipart_error)? {
            out.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        out.flush().await?;

        tracing::debug!(
            path = %file.path().display(),
            bytes = size,
            "Upload staged"
        );

        received = Some(ReceivedUpload {
            file,
            original_name,
            content_type,
            size,
        });
    }

    received.ok_or(RelayError::MissingFile)
}

fn map_multipart_error(err: MultipartError) -> RelayError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RelayError::PayloadTooLarge
    } else {
        RelayError::MalformedUpload(err.body_text())
    }
}
