//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → GET /healthcheck reads the latest snapshot
//!     → response.rs (200 OK / 500 ERROR JSON body)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeUuidRequestId, X_REQUEST_ID};
pub use response::{HealthReport, OverallStatus};
pub use server::HttpServer;
