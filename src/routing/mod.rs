//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, target, headers)
//!     → classifier.rs (Tunnel | Api | Forward)
//!     → matcher.rs (evaluate API match conditions)
//! ```
//!
//! # Design Decisions
//! - Matchers compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - CONNECT is decided on the method alone

pub mod classifier;
pub mod matcher;

pub use classifier::{RequestClassifier, RouteKind};
