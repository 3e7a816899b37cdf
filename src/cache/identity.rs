//! Cache key derivation from request identity.
//!
//! The account token comes from a form-encoded body field and the session
//! token from a custom header. Both are opaque; only emptiness is checked.

use std::fmt;

use axum::http::{HeaderMap, HeaderName};

use crate::cache::error::ApiError;
use crate::config::ApiConfig;

/// Joins the account and session tokens.
pub const KEY_SEPARATOR: char = '-';

/// Identifies one logical API call in the shared store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from both tokens. Returns `None` if either is empty.
    pub fn new(account: &str, session: &str) -> Option<Self> {
        if account.is_empty() || session.is_empty() {
            return None;
        }
        Some(Self(format!("{account}{KEY_SEPARATOR}{session}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts the cache key from an API request.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    account_field: String,
    session_header: HeaderName,
}

impl IdentityResolver {
    pub fn new(account_field: impl Into<String>, session_header: HeaderName) -> Self {
        Self {
            account_field: account_field.into(),
            session_header,
        }
    }

    /// Build a resolver from validated API configuration.
    pub fn from_config(config: &ApiConfig) -> Result<Self, axum::http::header::InvalidHeaderName> {
        Ok(Self::new(
            config.account_field.clone(),
            HeaderName::from_bytes(config.session_header.as_bytes())?,
        ))
    }

    pub fn session_header(&self) -> &HeaderName {
        &self.session_header
    }

    /// Derive the cache key, failing with `Forbidden` when either token is missing or empty.
    pub fn resolve(&self, body: &[u8], headers: &HeaderMap) -> Result<CacheKey, ApiError> {
        let account = url::form_urlencoded::parse(body)
            .find(|(name, _)| name == self.account_field.as_str())
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();

        let session = headers
            .get(&self.session_header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        CacheKey::new(&account, session).ok_or(ApiError::Forbidden)
    }
}
