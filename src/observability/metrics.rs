//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ipecho_requests_rate_limited_total` (counter): requests rejected with 429
//! - `ipecho_visitors_tracked` (gauge): clients in the admission registry after a sweep
//! - `ipecho_visitors_evicted_total` (counter): idle clients forgotten by the sweeper
//! - `ipecho_dns_lookups_total` (counter): reverse lookups by outcome
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rate_limited() {
    ::metrics::counter!("ipecho_requests_rate_limited_total").increment(1);
}

pub fn record_visitor_sweep(tracked: usize, evicted: usize) {
    ::metrics::gauge!("ipecho_visitors_tracked").set(tracked as f64);
    ::metrics::counter!("ipecho_visitors_evicted_total").increment(evicted as u64);
}

pub fn record_dns_lookup(outcome: &'static str) {
    ::metrics::counter!("ipecho_dns_lookups_total", "outcome" => outcome).increment(1);
}
