//! Reverse DNS with a hard deadline.
//!
//! The lookup future is dropped when the deadline passes, which cancels the
//! query in flight instead of leaving it running in the background.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use thiserror::Error;
use tokio::time;

use crate::observability::metrics;

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("reverse lookup failed: {0}")]
    Lookup(String),
}

/// Source of PTR records.
pub trait PtrLookup: Send + Sync {
    fn lookup_ptr(&self, ip: IpAddr) -> BoxFuture<'_, Result<Vec<String>, DnsError>>;
}

impl PtrLookup for TokioAsyncResolver {
    fn lookup_ptr(&self, ip: IpAddr) -> BoxFuture<'_, Result<Vec<String>, DnsError>> {
        async move {
            let lookup = self
                .reverse_lookup(ip)
                .await
                .map_err(|e| DnsError::Lookup(e.to_string()))?;
            Ok(lookup.iter().map(|name| name.to_string()).collect())
        }
        .boxed()
    }
}

/// Resolves addresses to host names, falling back to the address itself.
#[derive(Clone)]
pub struct HostnameResolver {
    lookup: Arc<dyn PtrLookup>,
    timeout: Duration,
}

impl HostnameResolver {
    pub fn new(lookup: Arc<dyn PtrLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    /// Resolver using the host's DNS configuration.
    pub fn from_system(timeout: Duration) -> Self {
        let resolver = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => resolver,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read system DNS configuration, using defaults");
                TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
            }
        };
        Self::new(Arc::new(resolver), timeout)
    }

    /// Host name for `address`, or `address` unchanged if none is found in time.
    pub async fn hostname(&self, address: &str) -> String {
        let Ok(ip) = address.parse::<IpAddr>() else {
            return address.to_string();
        };

        match time::timeout(self.timeout, self.lookup.lookup_ptr(ip)).await {
            Ok(Ok(names)) => match names.into_iter().next() {
                Some(name) => {
                    metrics::record_dns_lookup("resolved");
                    name.trim_end_matches('.').to_string()
                }
                None => {
                    metrics::record_dns_lookup("empty");
                    address.to_string()
                }
            },
            Ok(Err(e)) => {
                tracing::debug!(ip = %ip, error = %e, "Reverse lookup failed");
                metrics::record_dns_lookup("failed");
                address.to_string()
            }
            Err(_) => {
                tracing::debug!(ip = %ip, timeout_ms = self.timeout.as_millis() as u64, "Reverse lookup timed out");
                metrics::record_dns_lookup("timeout");
                address.to_string()
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_trailing_dot_stripped() {
        let dns = resolver(StaticLookup(Ok(vec![
            "host-5.example.net.".into(),
            "alias.example.net.".into(),
        ])));
        assert_eq!(dns.hostname("203.0.113.5").await, "host-5.example.net");
    }

    #[tokio::test]
    async fn test_empty_answer_returns_address() {
        let dns = resolver(StaticLookup(Ok(vec![])));
        assert_eq!(dns.hostname("203.0.113.5").await, "203.0.113.5");
    }

    #[tokio::test]
    async fn test_failure_returns_address() {
        let dns = resolver(StaticLookup(Err("NXDOMAIN".into())));
        assert_eq!(dns.hostname("2001:db8::1").await, "2001:db8::1");
    }

    #[tokio::test]
    async fn test_unparseable_address_skips_lookup() {
        let hanging = Arc::new(HangingLookup::default());
        let dns = HostnameResolver::new(hanging.clone(), DEFAULT_LOOKUP_TIMEOUT);
        assert_eq!(dns.hostname("<script>").await, "<script>");
        assert_eq!(hanging.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_address_and_cancels_lookup() {
        let hanging = Arc::new(HangingLookup::default());
        let dns = HostnameResolver::new(hanging.clone(), DEFAULT_LOOKUP_TIMEOUT);

        let started = time::Instant::now();
        let name = dns.hostname("198.51.100.20").await;

        assert_eq!(name, "198.51.100.20");
        assert!(started.elapsed() >= DEFAULT_LOOKUP_TIMEOUT);
        assert_eq!(hanging.started.load(Ordering::SeqCst), 1);
        assert!(hanging.cancelled.load(Ordering::SeqCst));
    }
}
