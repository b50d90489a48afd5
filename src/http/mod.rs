//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, peer address)
//!     → security gate (admission control, CORS)
//!     → handlers.rs (resolve identity, pick output format)
//!     → templates.rs (HTML / XML / plain text rendering)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod server;
pub mod templates;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
pub use templates::Templates;
