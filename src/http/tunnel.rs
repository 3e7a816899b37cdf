//! CONNECT tunnelling.
//!
//! # Data Flow
//! ```text
//! CONNECT host:port
//!     → dial host:port (connect timeout)
//!     → 200 Connection Established
//!     → hyper upgrade hands back the client socket
//!     → raw bytes spliced until either side closes
//! ```
//!
//! # Design Decisions
//! - Nothing inside the tunnel is inspected
//! - Both legs are torn down as soon as either direction ends or errors
//! - Dial failures close the client connection without an HTTP answer

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper::ext::ReasonPhrase;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error("CONNECT target has no authority")]
    MissingAuthority,
    #[error("connecting to {0} timed out")]
    ConnectTimeout(String),
    #[error("connecting to {target} failed: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

/// Opens CONNECT tunnels.
#[derive(Debug, Clone)]
pub struct Tunnel {
    connect_timeout: Duration,
}

impl Tunnel {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Dial the target and, on success, schedule the splice for after the upgrade.
    pub async fn open(&self, request: Request<Incoming>) -> Result<Response<Body>, TunnelError> {
        let target = request
            .uri()
            .authority()
            .map(|a| a.to_string())
            .ok_or(TunnelError::MissingAuthority)?;

        let upstream = match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&target)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                metrics::record_tunnel("connect_error");
                return Err(TunnelError::Connect { target, source });
            }
            Err(_) => {
                metrics::record_tunnel("connect_timeout");
                return Err(TunnelError::ConnectTimeout(target));
            }
        };
        metrics::record_tunnel("established");
        tracing::debug!(target = %target, "Tunnel established");

        tokio::spawn(async move {
            match hyper::upgrade::on(request).await {
                Ok(upgraded) => splice(TokioIo::new(upgraded), upstream, &target).await,
                Err(e) => tracing::warn!(target = %target, error = %e, "CONNECT upgrade failed"),
            }
        });

        let mut response = Response::new(Body::empty());
        response
            .extensions_mut()
            .insert(ReasonPhrase::from_static(b"Connection Established"));
        Ok(response)
    }
}

/// Copy bytes both ways until either direction finishes, then drop both legs.
async fn splice<C>(client: C, upstream: TcpStream, target: &str)
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut upstream_read, mut upstream_write) = upstream.into_split();

    tokio::select! {
        result = tokio::io::copy(&mut client_read, &mut upstream_write) => {
            tracing::debug!(target = %target, result = ?result, "Client side of tunnel ended");
        }
        result = tokio::io::copy(&mut upstream_read, &mut client_write) => {
            tracing::debug!(target = %target, result = ?result, "Upstream side of tunnel ended");
        }
    }
}
