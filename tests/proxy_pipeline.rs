//! End-to-end tests: a real proxy between reqwest and mock origins.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cache_proxy::admin::{setup_admin_router, AdminState};
use cache_proxy::cache::CacheState;
use cache_proxy::store::KeyValueStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;

fn addr(port: u16) -> SocketAddr {
    format!("127.0.0.1:{port}").parse().unwrap()
}

async fn stored(store: &Arc<dyn KeyValueStore>, key: &str) -> CacheState {
    CacheState::decode(store.get(key).await.unwrap().as_deref())
}

async fn api_call(client: &reqwest::Client, origin: SocketAddr, session: Option<&str>) -> reqwest::Response {
    let mut request = client
        .post(format!("http://{origin}/api/profile"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("api_token=u1&level=3");
    if let Some(session) = session {
        request = request.header("cache-token", session);
    }
    request.send().await.expect("proxy unreachable")
}

#[tokio::test]
async fn test_miss_then_hit_fetches_once() {
    let origin = addr(28301);
    let log = common::start_recording_origin(origin, 200, "profile-body", Duration::ZERO).await;
    let proxy = common::start_proxy(common::test_config(addr(28302))).await;
    let client = common::proxied_client(proxy.addr);

    let first = api_call(&client, origin, Some("t1")).await;
    assert_eq!(first.status(), 200);
    assert_eq!(first.headers()["x-origin"], "mock");
    assert_eq!(first.text().await.unwrap(), "profile-body");

    let second = api_call(&client, origin, Some("t1")).await;
    assert_eq!(second.status(), 200);
    assert_eq!(second.text().await.unwrap(), "profile-body");

    assert_eq!(log.hits(), 1, "second call must be served from the store");
    assert!(matches!(stored(&proxy.services.store, "u1-t1").await, CacheState::Ready(_)));
}

#[tokio::test]
async fn test_origin_error_status_is_cached() {
    let origin = addr(28311);
    let log = common::start_recording_origin(origin, 404, "missing", Duration::ZERO).await;
    let proxy = common::start_proxy(common::test_config(addr(28312))).await;
    let client = common::proxied_client(proxy.addr);

    for _ in 0..2 {
        let res = api_call(&client, origin, Some("t1")).await;
        assert_eq!(res.status(), 404);
        assert_eq!(res.text().await.unwrap(), "missing");
    }
    assert_eq!(log.hits(), 1);
}

#[tokio::test]
async fn test_missing_session_is_forbidden_without_fetch() {
    let origin = addr(28321);
    let log = common::start_recording_origin(origin, 200, "never", Duration::ZERO).await;
    let proxy = common::start_proxy(common::test_config(addr(28322))).await;
    let client = common::proxied_client(proxy.addr);

    let res = api_call(&client, origin, None).await;
    assert_eq!(res.status(), 403);
    assert!(res.headers()["content-type"].to_str().unwrap().starts_with("text/html"));
    assert!(res.text().await.unwrap().contains("cache-proxy"));
    assert_eq!(log.hits(), 0);
}

#[tokio::test]
async fn test_pending_key_is_unavailable() {
    let origin = addr(28331);
    let log = common::start_recording_origin(origin, 200, "never", Duration::ZERO).await;
    let proxy = common::start_proxy(common::test_config(addr(28332))).await;
    let pending = CacheState::Pending.encode().unwrap().unwrap();
    proxy.services.store.put("u1-t1", pending).await.unwrap();

    let res = api_call(&common::proxied_client(proxy.addr), origin, Some("t1")).await;
    assert_eq!(res.status(), 503);
    assert_eq!(log.hits(), 0);
}

#[tokio::test]
async fn test_origin_timeout_blocks_key() {
    let origin = addr(28341);
    let log = common::start_recording_origin(origin, 200, "too-late", Duration::from_secs(3)).await;
    let mut config = common::test_config(addr(28342));
    config.timeouts.fetch_secs = 1;
    let proxy = common::start_proxy(config).await;
    let client = common::proxied_client(proxy.addr);

    let first = api_call(&client, origin, Some("t1")).await;
    assert_eq!(first.status(), 410);
    assert_eq!(stored(&proxy.services.store, "u1-t1").await, CacheState::Blocked);

    let second = api_call(&client, origin, Some("t1")).await;
    assert_eq!(second.status(), 410);
    assert_eq!(log.hits(), 1, "blocked keys are never retried");
}

#[tokio::test]
async fn test_api_request_reaches_origin_sanitized() {
    let origin = addr(28351);
    let log = common::start_recording_origin(origin, 200, "ok", Duration::ZERO).await;
    let proxy = common::start_proxy(common::test_config(addr(28352))).await;

    let res = common::proxied_client(proxy.addr)
        .post(format!("http://{origin}/api/profile"))
        .header("cache-token", "t1")
        .header("x-request-id", "client-chosen")
        .header("x-game-version", "1.2")
        .body("api_token=u1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().get("x-request-id").is_none());

    let requests = log.requests();
    assert_eq!(requests.len(), 1);
    let raw = requests[0].to_ascii_lowercase();
    assert!(raw.starts_with("post /api/profile"));
    assert!(raw.contains("x-game-version: 1.2"));
    assert!(raw.ends_with("api_token=u1"));
    assert!(!raw.contains("cache-token"));
    assert!(!raw.contains("x-request-id"));
}

#[tokio::test]
async fn test_forward_relays_non_api_traffic() {
    let origin = addr(28361);
    let log = common::start_recording_origin(origin, 200, "static-asset", Duration::ZERO).await;
    let proxy = common::start_proxy(common::test_config(addr(28362))).await;
    let client = common::proxied_client(proxy.addr);

    for _ in 0..2 {
        let res = client
            .get(format!("http://{origin}/assets/map.bin"))
            .header("cache-token", "t1")
            .header("x-request-id", "abc")
            .header("x-custom", "keep")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), "static-asset");
    }

    assert_eq!(log.hits(), 2, "non-API traffic is never cached");
    let raw = log.requests()[0].to_ascii_lowercase();
    assert!(raw.starts_with("get /assets/map.bin"));
    assert!(raw.contains("x-custom: keep"));
    assert!(!raw.contains("cache-token"));
    assert!(!raw.contains("x-request-id"));
}

async fn read_head(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte).await {
            Ok(1) => buf.push(byte[0]),
            _ => break,
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

#[tokio::test]
async fn test_connect_tunnel_splices_bytes() {
    let echo = addr(28371);
    common::start_echo_server(echo).await;
    let proxy = common::start_proxy(common::test_config(addr(28372))).await;

    let mut stream = TcpStream::connect(proxy.addr).await.unwrap();
    stream
        .write_all(format!("CONNECT {echo} HTTP/1.1\r\nHost: {echo}\r\n\r\n").as_bytes())
        .await
        .unwrap();

    let head = read_head(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 200 Connection Established"), "got {head:?}");

    stream.write_all(b"\x16\x03\x01opaque").await.unwrap();
    let mut echoed = [0u8; 9];
    stream.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"\x16\x03\x01opaque");
}

#[tokio::test]
async fn test_connect_failure_closes_without_response() {
    let proxy = common::start_proxy(common::test_config(addr(28382))).await;
    let closed = addr(28381);

    let mut stream = TcpStream::connect(proxy.addr).await.unwrap();
    stream
        .write_all(format!("CONNECT {closed} HTTP/1.1\r\nHost: {closed}\r\n\r\n").as_bytes())
        .await
        .unwrap();

    let mut buf = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
        .await
        .expect("proxy should close the connection");
    assert!(read.is_err() || buf.is_empty(), "unexpected response {buf:?}");
}

#[tokio::test]
async fn test_operator_controls_availability_and_unblocks_keys() {
    let origin = addr(28391);
    let log = common::start_recording_origin(origin, 200, "fresh", Duration::ZERO).await;
    let proxy = common::start_proxy(common::test_config(addr(28392))).await;
    let client = common::proxied_client(proxy.addr);

    let admin_addr = addr(28393);
    let router = setup_admin_router(AdminState {
        api_key: Arc::from("op-key"),
        store: proxy.services.store.clone(),
        availability: proxy.services.availability.clone(),
        coordinator: proxy.services.coordinator.clone(),
    });
    let admin_listener = tokio::net::TcpListener::bind(admin_addr).await.unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(admin_listener, router).await;
    });
    let admin = common::direct_client();

    let blocked = CacheState::Blocked.encode().unwrap().unwrap();
    proxy.services.store.put("u1-t1", blocked).await.unwrap();
    assert_eq!(api_call(&client, origin, Some("t1")).await.status(), 410);

    let res = admin
        .put(format!("http://{admin_addr}/admin/availability"))
        .bearer_auth("op-key")
        .json(&serde_json::json!({ "available": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(api_call(&client, origin, Some("t1")).await.status(), 503);

    admin
        .put(format!("http://{admin_addr}/admin/availability"))
        .bearer_auth("op-key")
        .json(&serde_json::json!({ "available": true }))
        .send()
        .await
        .unwrap();

    let res = admin
        .delete(format!("http://{admin_addr}/admin/entries/u1-t1"))
        .bearer_auth("op-key")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = api_call(&client, origin, Some("t1")).await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "fresh");
    assert_eq!(log.hits(), 1);

    proxy.shutdown.trigger();
}
