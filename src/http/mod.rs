//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (assign/propagate request ID)
//!     → timeout.rs (inbound deadline)
//!     → relay::handler (upload, forward, cleanup)
//!     → response.rs (error mapping)
//!     → Send to client
//! ```

pub mod health;
pub mod request;
pub mod response;
pub mod server;
pub mod timeout;

pub use request::{request_id, X_REQUEST_ID};
pub use response::{ErrorBody, RawJson};
pub use server::{AppState, HttpServer};
