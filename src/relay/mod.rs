//! Upload relay subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/process-image (multipart, field "image")
//!     → upload.rs (find file part, check image/*, stream to disk)
//!     → transient.rs (request-owned scratch file guard)
//!     → downstream.rs (stream file to processor, 10s deadline)
//!     → handler.rs (pass JSON through, or map error)
//!     → transient file deleted on every path
//! ```
//!
//! # Design Decisions
//! - No retries: one downstream attempt per request
//! - Server-side failures share one public message; detail goes to logs
//! - Cleanup failures are logged, never surfaced

pub mod downstream;
pub mod error;
pub mod handler;
pub mod transient;
pub mod upload;

pub use downstream::{DownstreamClient, DownstreamError};
pub use error::RelayError;
pub use handler::process_image;
pub use transient::TransientFile;
pub use upload::{receive_upload, ReceivedUpload};
