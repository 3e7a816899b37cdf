//! Request classification.
//!
//! Every inbound request takes exactly one of three paths: CONNECT tunnels,
//! the API cache pipeline, or the transparent forwarder.

use axum::http::{Method, Request};

use crate::config::ApiConfig;
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher};

/// Where a request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// `CONNECT host:port`, spliced as raw bytes.
    Tunnel,
    /// Intercepted API call, served through the cache.
    Api,
    /// Anything else, relayed verbatim.
    Forward,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Tunnel => "tunnel",
            RouteKind::Api => "api",
            RouteKind::Forward => "forward",
        }
    }
}

/// Decides the route for each request. Immutable after construction.
#[derive(Debug)]
pub struct RequestClassifier {
    api: Box<dyn Matcher>,
}

impl RequestClassifier {
    pub fn from_config(config: &ApiConfig) -> Self {
        let prefix: Box<dyn Matcher> = Box::new(PathPrefixMatcher::new(config.path_prefix.clone()));
        let api: Box<dyn Matcher> = match &config.host {
            Some(host) => {
                let host: Box<dyn Matcher> = Box::new(HostMatcher::new(host.clone()));
                Box::new(AndMatcher::new(vec![host, prefix]))
            }
            None => prefix,
        };
        Self { api }
    }

    pub fn classify<B>(&self, request: &Request<B>) -> RouteKind {
        if request.method() == Method::CONNECT {
            RouteKind::Tunnel
        } else if self.api.matches(request.uri(), request.headers()) {
            RouteKind::Api
        } else {
            RouteKind::Forward
        }
    }
}
