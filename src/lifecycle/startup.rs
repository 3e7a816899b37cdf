//! Startup orchestration.
//!
//! Subsystems initialize in dependency order and any failure is fatal.
//! The proxy listener binds last so traffic only arrives once the cache
//! pipeline is ready.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::admin::{setup_admin_router, AdminState};
use crate::cache::CacheCoordinator;
use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::{Listener, ListenerError};
use crate::origin::{FetchError, ReqwestOriginFetcher};
use crate::security::HeaderSanitizer;
use crate::store::{open_store, KeyValueStore, StoreAvailabilityFlag, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to build origin client: {0}")]
    Origin(#[from] FetchError),

    #[error("invalid header name in config: {0}")]
    Header(#[from] axum::http::header::InvalidHeaderName),

    #[error("invalid {field} address '{value}'")]
    Address { field: &'static str, value: String },

    #[error("admin listener error: {0}")]
    Admin(std::io::Error),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Everything the proxy and operator API share.
pub struct Services {
    pub store: Arc<dyn KeyValueStore>,
    pub availability: Arc<StoreAvailabilityFlag>,
    pub coordinator: Arc<CacheCoordinator>,
}

/// Open the store and wire the cache coordinator around it.
pub fn build_services(config: &ProxyConfig) -> Result<Services, StartupError> {
    let store = open_store(&config.store)?;
    let availability = Arc::new(StoreAvailabilityFlag::new(
        store.clone(),
        config.store.availability_key.clone(),
    ));
    let fetcher = ReqwestOriginFetcher::new(
        Duration::from_secs(config.timeouts.connect_secs),
        Duration::from_secs(config.timeouts.fetch_secs),
    )?;
    let session_header = axum::http::HeaderName::from_bytes(config.api.session_header.as_bytes())?;
    let request_id_header = axum::http::HeaderName::from_bytes(config.api.request_id_header.as_bytes())?;

    let coordinator = CacheCoordinator::new(
        store.clone(),
        availability.clone(),
        Arc::new(fetcher),
        HeaderSanitizer::new(session_header, request_id_header),
    );

    tracing::info!(
        backend = ?config.store.backend,
        availability_key = %config.store.availability_key,
        fetch_timeout_secs = config.timeouts.fetch_secs,
        "Cache pipeline initialized"
    );

    Ok(Services {
        store,
        availability,
        coordinator: Arc::new(coordinator),
    })
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::Address {
        field,
        value: value.to_string(),
    })
}

async fn spawn_admin(config: &ProxyConfig, services: &Services, shutdown: &Shutdown) -> Result<(), StartupError> {
    let addr = parse_addr("admin.bind_address", &config.admin.bind_address)?;
    let router = setup_admin_router(AdminState {
        api_key: Arc::from(config.admin.api_key.as_str()),
        store: services.store.clone(),
        availability: services.availability.clone(),
        coordinator: services.coordinator.clone(),
    });

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(StartupError::Admin)?;
    tracing::info!(address = %addr, "Admin API listening");

    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "Admin API server failed");
        }
    });
    Ok(())
}

/// Run the proxy until a termination signal arrives.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr = parse_addr("observability.metrics_address", &config.observability.metrics_address)?;
        crate::observability::metrics::init_metrics(addr);
    }

    let services = build_services(&config)?;
    let shutdown = Shutdown::new();

    if config.admin.enabled {
        spawn_admin(&config, &services, &shutdown).await?;
    }

    let server = HttpServer::new(&config, services.coordinator.clone())?;
    let listener = Listener::bind(&config.listener).await?;
    signals::spawn_signal_handler(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
