//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all format handlers and static routes
//! - Wire up middleware (gate, timeout, request ID, tracing)
//! - Own the visitor sweeper for the lifetime of the listener
//! - Serve plain TCP or TLS with graceful shutdown

use axum::{
    http::StatusCode,
    routing::{any, get},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ServiceConfig, TlsConfig};
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::templates::Templates;
use crate::identity::{GeoIpDatabases, HostnameResolver, IdentityService};
use crate::lifecycle::Shutdown;
use crate::security::{gate, AdmissionController, AdmissionSettings};

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
    pub templates: Arc<Templates>,
}

/// HTTP server for the identity echo service.
pub struct HttpServer {
    router: Router,
    admission: Arc<AdmissionController>,
}

impl HttpServer {
    /// Create a server using the system DNS resolver.
    pub fn new(config: ServiceConfig) -> Self {
        let dns = HostnameResolver::from_system(Duration::from_millis(config.dns.timeout_ms));
        Self::with_resolver(config, dns)
    }

    /// Create a server with an explicit reverse DNS resolver.
    pub fn with_resolver(config: ServiceConfig, dns: HostnameResolver) -> Self {
        let geo = GeoIpDatabases::open(&config.paths.geoip_dir);
        let templates = Templates::load(&config.paths.static_dir);
        let admission = Arc::new(AdmissionController::new(AdmissionSettings::from(
            &config.rate_limit,
        )));

        let state = AppState {
            identity: Arc::new(IdentityService::new(geo, dns)),
            templates: Arc::new(templates),
        };

        let router = Self::build_router(&config, state, admission.clone());
        Self { router, admission }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &ServiceConfig,
        state: AppState,
        admission: Arc<AdmissionController>,
    ) -> Router {
        let static_dir = Path::new(&config.paths.static_dir);

        let routes = Router::new()
            .route("/", get(handlers::index))
            .route("/json", any(handlers::json))
            .route("/yaml", any(handlers::yaml))
            .route("/xml", any(handlers::xml))
            .route("/text", any(handlers::text))
            .route("/clean", any(handlers::clean))
            .route("/headers", any(handlers::headers))
            .nest_service("/static", ServeDir::new(static_dir))
            .route_service("/favicon.ico", ServeFile::new(static_dir.join("favicon.ico")))
            .route_service("/robots.txt", ServeFile::new(static_dir.join("robots.txt")))
            .with_state(state);

        gate(routes, admission)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn admission(&self) -> Arc<AdmissionController> {
        self.admission.clone()
    }

    /// Run the server on a plain TCP listener until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = tokio::spawn(self.admission.clone().run_sweeper(shutdown.subscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.wait())
            .await;

        // Also stop the sweeper if serving failed on its own.
        shutdown.trigger();
        if let Err(e) = sweeper.await {
            tracing::error!(error = %e, "Visitor sweeper task failed");
        }

        served?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
        tracing::info!(address = %addr, cert = %tls.cert_path, "HTTPS server starting");

        let sweeper = tokio::spawn(self.admission.clone().run_sweeper(shutdown.subscribe()));

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        let stopped = shutdown.wait();
        tokio::spawn(async move {
            stopped.await;
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        let served = axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await;

        shutdown.trigger();
        if let Err(e) = sweeper.await {
            tracing::error!(error = %e, "Visitor sweeper task failed");
        }

        served?;
        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}
