//! Shared utilities for integration tests.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use ipecho::config::ServiceConfig;
use ipecho::http::HttpServer;
use ipecho::identity::dns::DnsError;
use ipecho::identity::{HostnameResolver, PtrLookup};
use ipecho::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Answers every PTR query with the same name.
pub struct FixedPtr(pub &'static str);

impl PtrLookup for FixedPtr {
    fn lookup_ptr(&self, _ip: IpAddr) -> BoxFuture<'_, Result<Vec<String>, DnsError>> {
        let name = self.0.to_string();
        async move { Ok(vec![name]) }.boxed()
    }
}

/// Never answers.
#[allow(dead_code)]
pub struct SilentPtr;

impl PtrLookup for SilentPtr {
    fn lookup_ptr(&self, _ip: IpAddr) -> BoxFuture<'_, Result<Vec<String>, DnsError>> {
        std::future::pending().boxed()
    }
}

/// Config pointing at the bundled templates and no GeoIP databases.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.paths.static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/static").into();
    config.paths.geoip_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/target/no-geoip").into();
    config
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked");
        assert!(result.is_ok(), "server returned {result:?}");
    }
}

/// Start a server on an ephemeral port.
pub async fn start_server(config: ServiceConfig, lookup: impl PtrLookup + 'static) -> TestServer {
    let dns = HostnameResolver::new(Arc::new(lookup), Duration::from_millis(200));
    let server = HttpServer::with_resolver(config, dns);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.clone()));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}
