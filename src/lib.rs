//! Caching man-in-the-middle proxy for game API traffic.

pub mod admin;
pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod origin;
pub mod routing;
pub mod security;
pub mod store;

pub use cache::CacheCoordinator;
pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
