//! GeoIP and ISP enrichment backed by MaxMind-format databases.
//!
//! Both databases are optional. Anything that cannot be resolved (missing
//! database, address not in the database, undecodable record) simply leaves
//! the corresponding fields empty.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;

use maxminddb::Reader;
use serde::Deserialize;

pub const CITY_DB_FILE: &str = "ipcity.mmdb";
pub const ORG_DB_FILE: &str = "iporg.mmdb";

/// Shown when none of city, state or country resolved.
pub const UNKNOWN_DETAILS: &str = "Unknown";
/// Shown when the country code did not resolve.
pub const UNKNOWN_COUNTRY_CODE: &str = "XX";

/// Location and network owner for one address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoLocation {
    pub org: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    /// ISO code of the first subdivision.
    pub state: Option<String>,
}

impl GeoLocation {
    /// Non-empty city, state and country joined with `", "`, or `"Unknown"`.
    pub fn details(&self) -> String {
        let parts: Vec<&str> = [&self.city, &self.state, &self.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            UNKNOWN_DETAILS.to_string()
        } else {
            parts.join(", ")
        }
    }

    pub fn country_code(&self) -> &str {
        self.country_code
            .as_deref()
            .filter(|code| !code.is_empty())
            .unwrap_or(UNKNOWN_COUNTRY_CODE)
    }

    fn merge_city(&mut self, city: CityFields) {
        self.city = city.city;
        self.country = city.country;
        self.country_code = city.country_code;
        self.state = city.state;
    }
}

/// Fields taken from a city database hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CityFields {
    pub city: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NamedRecord {
    #[serde(default)]
    names: Option<BTreeMap<String, String>>,
}

impl NamedRecord {
    fn english(&self) -> Option<String> {
        self.names.as_ref()?.get("en").cloned()
    }
}

#[derive(Debug, Default, Deserialize)]
struct CountryRecord {
    #[serde(default)]
    iso_code: Option<String>,
    #[serde(default)]
    names: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct SubdivisionRecord {
    #[serde(default)]
    iso_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CityRecord {
    #[serde(default)]
    city: Option<NamedRecord>,
    #[serde(default)]
    country: Option<CountryRecord>,
    #[serde(default)]
    subdivisions: Option<Vec<SubdivisionRecord>>,
}

impl From<CityRecord> for CityFields {
    fn from(record: CityRecord) -> Self {
        let (country, country_code) = match record.country {
            Some(c) => (c.names.and_then(|mut n| n.remove("en")), c.iso_code),
            None => (None, None),
        };
        Self {
            city: record.city.and_then(|c| c.english()),
            country,
            country_code,
            state: record
                .subdivisions
                .and_then(|subs| subs.into_iter().next())
                .and_then(|sub| sub.iso_code),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TraitsRecord {
    #[serde(default)]
    isp: Option<String>,
}

/// Covers both the ISP layout (`isp` at top level) and the Enterprise
/// layout (`traits.isp`).
#[derive(Debug, Default, Deserialize)]
struct OrgRecord {
    #[serde(default)]
    isp: Option<String>,
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    traits: Option<TraitsRecord>,
}

impl OrgRecord {
    fn into_isp(self) -> Option<String> {
        self.isp
            .or_else(|| self.traits.and_then(|t| t.isp))
            .or(self.organization)
            .filter(|isp| !isp.is_empty())
    }
}

/// Read-only handles to the city and organization databases.
#[derive(Default)]
pub struct GeoIpDatabases {
    city: Option<Reader<Vec<u8>>>,
    org: Option<Reader<Vec<u8>>>,
}

impl GeoIpDatabases {
    pub fn new(city: Option<Reader<Vec<u8>>>, org: Option<Reader<Vec<u8>>>) -> Self {
        Self { city, org }
    }

    /// Open whichever of `ipcity.mmdb` / `iporg.mmdb` exist under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            city: open_database(&dir.join(CITY_DB_FILE), "city"),
            org: open_database(&dir.join(ORG_DB_FILE), "org"),
        }
    }

    pub fn has_city(&self) -> bool {
        self.city.is_some()
    }

    pub fn has_org(&self) -> bool {
        self.org.is_some()
    }

    /// Look up `address`. Never fails; unresolved parts stay empty.
    pub fn locate(&self, address: &str) -> GeoLocation {
        let mut location = GeoLocation::default();

        let Ok(ip) = address.parse::<IpAddr>() else {
            return location;
        };

        if let Some(city) = self.lookup_city(ip) {
            location.merge_city(city);
        }
        location.org = self.lookup_org(ip);

        location
    }

    fn lookup_city(&self, ip: IpAddr) -> Option<CityFields> {
        let reader = self.city.as_ref()?;
        match reader.lookup::<CityRecord>(ip) {
            Ok(record) => Some(record.into()),
            Err(e) => {
                tracing::trace!(ip = %ip, error = %e, "City lookup missed");
                None
            }
        }
    }

    fn lookup_org(&self, ip: IpAddr) -> Option<String> {
        let reader = self.org.as_ref()?;
        match reader.lookup::<OrgRecord>(ip) {
            Ok(record) => record.into_isp(),
            Err(e) => {
                tracing::trace!(ip = %ip, error = %e, "Org lookup missed");
                None
            }
        }
    }
}

fn open_database(path: &Path, kind: &str) -> Option<Reader<Vec<u8>>> {
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            database = kind,
            "GeoIP database not found. GeoIP features limited."
        );
        return None;
    }

    match Reader::open_readfile(path) {
        Ok(reader) => {
            tracing::info!(path = %path.display(), database = kind, "GeoIP database loaded");
            Some(reader)
        }
        Err(e) => {
            tracing::error!(path = %path.display(), database = kind, error = %e, "Failed to open GeoIP database");
            None
        }
    }
}
