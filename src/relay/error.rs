//! Relay error taxonomy.

use axum::http::StatusCode;
use thiserror::Error;

use crate::relay::downstream::DownstreamError;

/// Every way a relayed upload can fail.
///
/// Client input errors carry enough detail for server-side logs; the text
/// returned to the caller comes from [`RelayError::public_message`] only.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No file arrived under the expected field.
    #[error("image file is required")]
    MissingFile,

    /// The declared content type is not `image/*`.
    #[error("rejected upload with content type {content_type:?}")]
    InvalidFileType { content_type: String },

    /// More than one file arrived under the expected field.
    #[error("more than one file uploaded under the image field")]
    UnexpectedField,

    /// The multipart stream broke off or was not well formed.
    #[error("malformed multipart body: {0}")]
    MalformedUpload(String),

    /// Body exceeded the configured limit.
    #[error("upload exceeds the configured body limit")]
    PayloadTooLarge,

    /// The inbound request deadline expired before a response was ready.
    #[error("request exceeded its {0:?} deadline")]
    RequestTimeout(std::time::Duration),

    /// Staging the upload on local disk failed.
    #[error("failed to stage upload: {0}")]
    Storage(#[from] std::io::Error),

    /// Anything that went wrong talking to the processor.
    #[error(transparent)]
    Downstream(#[from] DownstreamError),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingFile
            | RelayError::InvalidFileType { .. }
            | RelayError::UnexpectedField
            | RelayError::MalformedUpload(_) => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::RequestTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            RelayError::Storage(_) | RelayError::Downstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show the caller. Server-side failures collapse into
    /// one generic message.
    pub fn public_message(&self) -> &'static str {
        match self {
            RelayError::MissingFile => "Image file is required",
            RelayError::InvalidFileType { .. } => "Only image files are allowed!",
            RelayError::UnexpectedField => "Only one image file may be uploaded",
            RelayError::MalformedUpload(_) => "Invalid multipart upload",
            RelayError::PayloadTooLarge => "Image file is too large",
            RelayError::RequestTimeout(_) => "Request timed out",
            RelayError::Storage(_) | RelayError::Downstream(_) => "Failed to process image",
        }
    }

    /// Metrics label for the outcome of a request that failed this way.
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayError::MissingFile => "missing_file",
            RelayError::InvalidFileType { .. } => "invalid_file_type",
            RelayError::UnexpectedField => "unexpected_field",
            RelayError::MalformedUpload(_) => "malformed_upload",
            RelayError::PayloadTooLarge => "payload_too_large",
            RelayError::RequestTimeout(_) => "request_timeout",
            RelayError::Storage(_) => "storage_failure",
            RelayError::Downstream(_) => "downstream_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_errors_are_4xx() {
        assert_eq!(RelayError::MissingFile.status_code(), StatusCode::BAD_REQUEST);
        let invalid = RelayError::InvalidFileType {
            content_type: "text/plain".into(),
        };
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.public_message(), "Only image files are allowed!");
        assert_eq!(
            RelayError::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        let timeout = RelayError::RequestTimeout(Duration::from_secs(30));
        assert_eq!(timeout.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(timeout.public_message(), "Request timed out");
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let downstream = RelayError::from(DownstreamError::Timeout(Duration::from_secs(10)));
        assert_eq!(downstream.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(downstream.public_message(), "Failed to process image");
        assert!(downstream.to_string().contains("timed out"));

        let storage = RelayError::from(std::io::Error::other("disk full"));
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(storage.public_message(), "Failed to process image");
    }
}
