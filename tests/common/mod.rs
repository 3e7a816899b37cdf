//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cache_proxy::config::ProxyConfig;
use cache_proxy::http::HttpServer;
use cache_proxy::lifecycle::startup::{build_services, Services};
use cache_proxy::lifecycle::Shutdown;
use cache_proxy::net::Listener;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What a mock origin saw.
#[derive(Clone, Default)]
pub struct OriginLog {
    hits: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl OriginLog {
    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    /// Raw request heads and bodies, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Read one HTTP/1.1 request (head plus `Content-Length` body) off the socket.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Start a mock origin that records every request and answers with a
/// fixed status and body after `delay`.
pub async fn start_recording_origin(addr: SocketAddr, status: u16, body: &'static str, delay: Duration) -> OriginLog {
    let listener = TcpListener::bind(addr).await.unwrap();
    let log = OriginLog::default();
    let task_log = log.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let log = task_log.clone();
            tokio::spawn(async move {
                log.hits.fetch_add(1, Ordering::SeqCst);
                let request = read_request(&mut socket).await;
                log.requests.lock().unwrap().push(request);

                tokio::time::sleep(delay).await;
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nX-Origin: mock\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    log
}

/// Start a TCP echo server, the far end of CONNECT tunnels.
pub async fn start_echo_server(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
}

/// A running proxy plus handles for poking at its store.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub services: Services,
    pub shutdown: Shutdown,
}

/// Config bound to `addr` with the in-memory store.
pub fn test_config(addr: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = addr.to_string();
    config.timeouts.connect_secs = 2;
    config.timeouts.fetch_secs = 5;
    config.timeouts.drain_secs = 1;
    config
}

/// Start the proxy in the background. The listener is bound on return.
pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let services = build_services(&config).unwrap();
    let server = HttpServer::new(&config, services.coordinator.clone()).unwrap();
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, stop).await;
    });

    TestProxy { addr, services, shutdown }
}

/// A client that routes plain-HTTP requests through the proxy.
pub fn proxied_client(proxy: SocketAddr) -> reqwest::Client {
    reqwest::Client::builder()
        .proxy(reqwest::Proxy::http(format!("http://{proxy}")).unwrap())
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// A client that talks to the given address directly.
pub fn direct_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
