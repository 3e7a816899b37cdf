use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::cache::{ApiError, CacheState};
use crate::store::{AvailabilityCheck, StoreError};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub available: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AvailabilityUpdate {
    pub available: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntryStatus {
    pub key: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntryCleared {
    pub key: String,
    pub cleared: bool,
}

/// Store failures surface as 500 with the error in a JSON body.
pub struct AdminError(String);

impl From<StoreError> for AdminError {
    fn from(e: StoreError) -> Self {
        Self(e.to_string())
    }
}

impl From<ApiError> for AdminError {
    fn from(e: ApiError) -> Self {
        Self(e.to_string())
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Admin request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.0 })),
        )
            .into_response()
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Result<Json<SystemStatus>, AdminError> {
    let available = state.availability.is_available().await?;
    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if available { "operational" } else { "unavailable" },
        available,
    }))
}

pub async fn put_availability(
    State(state): State<AdminState>,
    Json(update): Json<AvailabilityUpdate>,
) -> Result<Json<AvailabilityUpdate>, AdminError> {
    state.availability.set_available(update.available).await?;
    Ok(Json(update))
}

pub async fn get_entry(
    State(state): State<AdminState>,
    Path(key): Path<String>,
) -> Result<Json<EntryStatus>, AdminError> {
    let entry = state.coordinator.state(&key).await?;
    let status = match &entry {
        CacheState::Ready(response) => Some(response.status.as_u16()),
        _ => None,
    };
    Ok(Json(EntryStatus {
        key,
        state: entry.name().to_string(),
        status,
    }))
}

pub async fn delete_entry(
    State(state): State<AdminState>,
    Path(key): Path<String>,
) -> Result<Json<EntryCleared>, AdminError> {
    let cleared = state.store.delete(&key).await?;
    tracing::info!(key = %key, cleared, "Cache entry cleared by operator");
    Ok(Json(EntryCleared { key, cleared }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::setup_admin_router;
    use crate::cache::CacheCoordinator;
    use crate::origin::ReqwestOriginFetcher;
    use crate::security::HeaderSanitizer;
    use crate::store::{KeyValueStore, MemoryStore, StoreAvailabilityFlag};
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn setup() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let availability = Arc::new(StoreAvailabilityFlag::new(store.clone(), "proxy:unavailable"));
        let fetcher = ReqwestOriginFetcher::new(Duration::from_secs(1), Duration::from_secs(1)).unwrap();
        let coordinator = CacheCoordinator::new(
            store.clone(),
            availability.clone(),
            Arc::new(fetcher),
            HeaderSanitizer::default(),
        );
        let state = AdminState {
            api_key: Arc::from("secret"),
            store: store.clone(),
            availability,
            coordinator: Arc::new(coordinator),
        };
        (setup_admin_router(state), store)
    }

    fn authed(method: &str, uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", "Bearer secret")
            .header("content-type", "application/json")
            .body(body)
            .unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rejects_missing_or_wrong_token() {
        let (router, _) = setup();
        let anonymous = Request::builder().uri("/admin/status").body(Body::empty()).unwrap();
        let response = router.clone().oneshot(anonymous).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let wrong = Request::builder()
            .uri("/admin/status")
            .header("authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(wrong).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn toggles_availability() {
        let (router, store) = setup();

        let response = router
            .clone()
            .oneshot(authed("PUT", "/admin/availability", Body::from(r#"{"available":false}"#)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.get("proxy:unavailable").await.unwrap().as_deref(), Some("true"));

        let status = json(router.oneshot(authed("GET", "/admin/status", Body::empty())).await.unwrap()).await;
        assert_eq!(status["available"], false);
        assert_eq!(status["status"], "unavailable");
    }

    #[tokio::test]
    async fn inspects_and_clears_blocked_entry() {
        let (router, store) = setup();
        store
            .put("u1-t1", CacheState::Blocked.encode().unwrap().unwrap())
            .await
            .unwrap();

        let entry = json(
            router
                .clone()
                .oneshot(authed("GET", "/admin/entries/u1-t1", Body::empty()))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(entry["state"], "blocked");

        let cleared = json(
            router
                .clone()
                .oneshot(authed("DELETE", "/admin/entries/u1-t1", Body::empty()))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(cleared["cleared"], true);

        let entry = json(router.oneshot(authed("GET", "/admin/entries/u1-t1", Body::empty())).await.unwrap()).await;
        assert_eq!(entry["state"], "absent");
    }
}
