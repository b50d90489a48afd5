//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client token bucket, 429 on exhaustion)
//!     → headers.rs (CORS headers, OPTIONS preflight answered here)
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - Rate limiting runs before any lookup work it protects
//! - One registry, one lock; buckets synchronize themselves
//! - Idle clients are forgotten by a background sweep

pub mod gate;
pub mod headers;
pub mod rate_limit;

pub use gate::gate;
pub use rate_limit::{AdmissionController, AdmissionSettings, TokenBucket};
