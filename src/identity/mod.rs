//! Caller identity resolution.
//!
//! # Data Flow
//! ```text
//! request headers + peer address
//!     → client.rs (X-Forwarded-For or peer host)
//!     → geo.rs (city / ISP databases)  ┐ concurrently
//!     → dns.rs (PTR lookup, 2s cap)    ┘
//!     → record.rs (IdentityRecord with sentinels applied)
//! ```
//!
//! # Design Decisions
//! - Every step degrades to a default instead of failing the request
//! - Databases are opened once and only read afterwards
//! - No retries; lookups are cheap and bounded

pub mod client;
pub mod dns;
pub mod geo;
pub mod record;

pub use client::client_address;
pub use dns::{HostnameResolver, PtrLookup};
pub use geo::{GeoIpDatabases, GeoLocation};
pub use record::{IdentityRecord, IdentityService};
