//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → headers.rs (strip hop-by-hop and proxy-private headers)
//!     → Forward to origin
//!
//! Origin response:
//!     → headers.rs (same policy)
//!     → Client
//! ```
//!
//! # Design Decisions
//! - Proxy-private identity headers never leave the proxy
//! - One policy object shared by the relay and the API pipeline

pub mod headers;

pub use headers::HeaderSanitizer;
