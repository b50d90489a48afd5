//! Assembles everything known about a caller into one record.

use axum::http::HeaderMap;
use serde::Serialize;

use crate::identity::client::client_address;
use crate::identity::dns::HostnameResolver;
use crate::identity::geo::{GeoIpDatabases, GeoLocation};

/// What the service tells a caller about themselves.
///
/// Sentinel values (`"Unknown"`, `"XX"`) are filled in here so every
/// output format shows the same placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRecord {
    pub is_ipv6: bool,
    pub address: String,
    pub hostname: String,
    /// Human-readable location, e.g. `"Paris, France"`.
    pub geo: String,
    pub isp: String,
    pub country_code: String,
    pub city: String,
    pub country: String,
}

impl IdentityRecord {
    pub fn new(address: String, hostname: String, location: &GeoLocation) -> Self {
        Self {
            is_ipv6: address.contains(':'),
            geo: location.details(),
            isp: location.org.clone().unwrap_or_default(),
            country_code: location.country_code().to_string(),
            city: location.city.clone().unwrap_or_default(),
            country: location.country.clone().unwrap_or_default(),
            address,
            hostname,
        }
    }
}

/// Geo and DNS lookups shared by every request.
pub struct IdentityService {
    geo: GeoIpDatabases,
    dns: HostnameResolver,
}

impl IdentityService {
    pub fn new(geo: GeoIpDatabases, dns: HostnameResolver) -> Self {
        Self { geo, dns }
    }

    /// Resolve the caller behind `headers`/`peer`. Lookups that fail degrade
    /// to their defaults; this never errors.
    pub async fn resolve(&self, headers: &HeaderMap, peer: &str) -> IdentityRecord {
        let address = client_address(headers, peer);

        let (location, hostname) = tokio::join!(
            async { self.geo.locate(&address) },
            self.dns.hostname(&address),
        );

        IdentityRecord::new(address, hostname, &location)
    }
}
