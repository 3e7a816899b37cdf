//! Origin access for intercepted API calls.
//!
//! # Data Flow
//! ```text
//! CacheCoordinator (key absent)
//!     → fetcher.rs (one outbound request, bounded by fetch timeout)
//!     → OriginResponse (any status) or FetchError (transport failure)
//! ```
//!
//! # Design Decisions
//! - No retries: a transport failure is final for the key
//! - Bodies are raw bytes; nothing is decoded or decompressed
//! - The fetcher is a trait so the coordinator can be driven without a network

pub mod fetcher;

pub use fetcher::{FetchError, OriginFetcher, OriginRequest, OriginResponse, ReqwestOriginFetcher};
