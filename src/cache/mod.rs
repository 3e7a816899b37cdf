//! API response cache subsystem.
//!
//! # Data Flow
//! ```text
//! API request (body, headers)
//!     → identity.rs (CacheKey or Forbidden)
//!     → coordinator.rs (availability → stored state → maybe one origin fetch)
//!     → state.rs (CacheState ⇄ stored envelope)
//!     → CachedResponse or ApiError
//! ```
//!
//! # Design Decisions
//! - The shared store is both the cache and the coordination device
//! - Deduplication is best effort (no compare-and-set in the store)
//! - Failed fetches poison the key; there is no automatic retry

pub mod coordinator;
pub mod error;
pub mod identity;
pub mod state;

pub use coordinator::CacheCoordinator;
pub use error::ApiError;
pub use identity::{CacheKey, IdentityResolver};
pub use state::{CacheState, CachedResponse};
