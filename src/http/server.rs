//! HTTP server setup and dispatch.
//!
//! # Responsibilities
//! - Accept connections from the bounded listener
//! - Serve HTTP/1.1 with upgrades (needed for CONNECT)
//! - Classify each request and dispatch it to the tunnel, the API
//!   pipeline, or the transparent forwarder
//! - Drain in-flight connections on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderName, Request, Response},
    Router,
};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tower::ServiceExt;

use crate::cache::{CacheCoordinator, IdentityResolver};
use crate::config::ProxyConfig;
use crate::http::api::{api_router, ApiState};
use crate::http::forward::{ForwardError, Forwarder};
use crate::http::tunnel::{Tunnel, TunnelError};
use crate::net::{ConnectionGuard, ConnectionPermit, ConnectionTracker, Listener, ListenerError};
use crate::routing::{RequestClassifier, RouteKind};
use crate::security::HeaderSanitizer;

/// Failures that end a client connection without a response.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Tunnel(#[from] TunnelError),
    #[error(transparent)]
    Forward(#[from] ForwardError),
}

/// Per-request dispatch state, cloned into every connection.
#[derive(Clone)]
struct Dispatcher {
    classifier: Arc<RequestClassifier>,
    api: Router,
    forwarder: Forwarder,
    tunnel: Tunnel,
}

impl Dispatcher {
    async fn dispatch(&self, request: Request<Incoming>, peer: SocketAddr) -> Result<Response<Body>, RelayError> {
        let route = self.classifier.classify(&request);
        tracing::debug!(
            peer = %peer,
            route = route.as_str(),
            method = %request.method(),
            uri = %request.uri(),
            "Dispatching request"
        );

        match route {
            RouteKind::Tunnel => self.tunnel.open(request).await.map_err(|e| {
                tracing::warn!(peer = %peer, error = %e, "Tunnel failed, closing connection");
                RelayError::from(e)
            }),
            RouteKind::Forward => Ok(self.forwarder.forward(request).await?),
            RouteKind::Api => match self.api.clone().oneshot(request).await {
                Ok(response) => Ok(response),
                Err(never) => match never {},
            },
        }
    }
}

/// The proxy's client-facing server.
pub struct HttpServer {
    dispatcher: Dispatcher,
    tracker: ConnectionTracker,
    drain_timeout: Duration,
}

impl HttpServer {
    /// Wire the server from configuration and the shared cache coordinator.
    pub fn new(config: &ProxyConfig, coordinator: Arc<CacheCoordinator>) -> Result<Self, axum::http::header::InvalidHeaderName> {
        let identity = IdentityResolver::from_config(&config.api)?;
        let request_id_header = HeaderName::from_bytes(config.api.request_id_header.as_bytes())?;
        let sanitizer = HeaderSanitizer::new(identity.session_header().clone(), request_id_header.clone());
        let connect_timeout = Duration::from_secs(config.timeouts.connect_secs);

        let api = api_router(ApiState {
            identity: Arc::new(identity),
            coordinator,
            sanitizer: sanitizer.clone(),
            request_id_header,
            upstream_base: config.api.upstream_base.clone(),
            max_body_size: config.api.max_body_size,
        });

        Ok(Self {
            dispatcher: Dispatcher {
                classifier: Arc::new(RequestClassifier::from_config(&config.api)),
                api,
                forwarder: Forwarder::new(connect_timeout, sanitizer),
                tunnel: Tunnel::new(connect_timeout),
            },
            tracker: ConnectionTracker::new(),
            drain_timeout: Duration::from_secs(config.timeouts.drain_secs),
        })
    }

    /// Accept and serve connections until `shutdown` fires, then drain.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ListenerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(
                address = %addr,
                max_connections = listener.max_connections(),
                "HTTP server starting"
            );
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let guard = self.tracker.track();
                        let dispatcher = self.dispatcher.clone();
                        let conn_shutdown = shutdown.resubscribe();
                        tokio::spawn(serve_connection(stream, peer, dispatcher, conn_shutdown, permit, guard));
                    }
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                    }
                    Err(e) => return Err(e),
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        if !self.tracker.wait_idle(self.drain_timeout).await {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Drain timeout elapsed with connections still open"
            );
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Dispatcher,
    mut shutdown: broadcast::Receiver<()>,
    _permit: ConnectionPermit,
    guard: ConnectionGuard,
) {
    let service = service_fn(move |request: Request<Incoming>| {
        let dispatcher = dispatcher.clone();
        async move { dispatcher.dispatch(request, peer).await }
    });

    let conn = http1::Builder::new()
        .preserve_header_case(true)
        .title_case_headers(true)
        .serve_connection(TokioIo::new(stream), service)
        .with_upgrades();
    tokio::pin!(conn);

    let mut draining = false;
    let result = loop {
        tokio::select! {
            result = conn.as_mut() => break result,
            _ = shutdown.recv(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    };

    if let Err(e) = result {
        tracing::debug!(connection_id = %guard.id(), peer = %peer, error = %e, "Connection ended with error");
    }
}
