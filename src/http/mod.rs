//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper HTTP/1.1 with upgrades, classification)
//!     → tunnel.rs   CONNECT: raw byte splice
//!     → forward.rs  plain HTTP: streamed relay
//!     → api.rs      API prefix: cache pipeline
//!         → request.rs (request ID, target URL)
//!         → response.rs (error pages)
//!     → Send to client
//! ```

pub mod api;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod tunnel;

pub use server::HttpServer;
