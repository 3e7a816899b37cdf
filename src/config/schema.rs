//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the caching proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Intercepted API namespace and identity inputs.
    pub api: ApiConfig,

    /// Shared key-value store settings.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration for outbound operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout for tunnels and forwarding, in seconds.
    pub connect_secs: u64,

    /// Upper bound on a whole origin fetch for API calls, in seconds.
    pub fetch_secs: u64,

    /// How long shutdown waits for in-flight connections, in seconds.
    pub drain_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            fetch_secs: 180,
            drain_secs: 30,
        }
    }
}

/// API interception configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Requests whose path starts with this prefix go through the cache.
    pub path_prefix: String,

    /// Optional Host header to match in addition to the prefix.
    pub host: Option<String>,

    /// Form field carrying the account token.
    pub account_field: String,

    /// Header carrying the session token.
    pub session_header: String,

    /// Proxy-private request identifier header.
    pub request_id_header: String,

    /// Maximum buffered API request body in bytes.
    pub max_body_size: usize,

    /// Replaces scheme and authority of API calls when set
    /// (e.g., "https://api.example.com").
    pub upstream_base: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/api/".to_string(),
            host: None,
            account_field: "api_token".to_string(),
            session_header: "cache-token".to_string(),
            request_id_header: "x-request-id".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
            upstream_base: None,
        }
    }
}

/// Store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

/// Shared key-value store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Which backend to use.
    pub backend: StoreBackend,

    /// Persistence file for the `file` backend.
    pub path: Option<String>,

    /// Reserved key holding the global availability flag.
    pub availability_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
            availability_key: "proxy:unavailable".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Operator API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the operator API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Operator API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [api]
            path_prefix = "/game/"

            [store]
            backend = "file"
            path = "cache.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.path_prefix, "/game/");
        assert_eq!(config.api.session_header, "cache-token");
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.timeouts.fetch_secs, 180);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
