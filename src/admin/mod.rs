//! Operator API.
//!
//! The external writer of the availability flag and the only way to
//! un-poison a blocked key short of editing the store by hand.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use crate::cache::CacheCoordinator;
use crate::store::{KeyValueStore, StoreAvailabilityFlag};
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by operator handlers.
#[derive(Clone)]
pub struct AdminState {
    pub api_key: Arc<str>,
    pub store: Arc<dyn KeyValueStore>,
    pub availability: Arc<StoreAvailabilityFlag>,
    pub coordinator: Arc<CacheCoordinator>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/availability", put(put_availability))
        .route("/admin/entries/{key}", get(get_entry).delete(delete_entry))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
