//! Version discovery against the three upstream sources.
//!
//! Every lookup follows the same shape: check the cache, on a miss ask
//! upstream, cache the normalized answer for the configured TTL and return
//! it. Upstream failures come back as "unavailable" values and are never
//! cached, so the next run asks again.

pub mod batch;
pub mod github;
pub mod huggingface;
pub mod manager;

pub use batch::DiscoverySummary;
pub use manager::normalize_manager_document;

use domain::ports::cache::{get_typed, set_typed, CacheStore};
use domain::ports::http::{HttpResponse, HttpTransport, TransportError};
use infrastructure::cache::KeyedLocks;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use workflow_manifest::{AuthMode, EndpointConfig, Settings};

/// Outcome of an upstream fetch: whether it may be written to the cache.
pub(crate) enum Fetched<T> {
    Cacheable(T),
    Transient(T),
}

pub struct DiscoveryService {
    http: Arc<dyn HttpTransport>,
    cache: Arc<dyn CacheStore>,
    locks: KeyedLocks,
    endpoints: EndpointConfig,
    ttl: Duration,
    pub(crate) concurrency: usize,
    github_auth: AuthMode,
    hub_auth: AuthMode,
    show_progress: bool,
}

impl DiscoveryService {
    pub fn new(http: Arc<dyn HttpTransport>, cache: Arc<dyn CacheStore>, settings: &Settings) -> Self {
        Self {
            http,
            cache,
            locks: KeyedLocks::new(),
            endpoints: settings.endpoints.clone(),
            ttl: settings.cache.ttl,
            concurrency: settings.discovery.concurrency.max(1),
            github_auth: AuthMode::from_token(settings.credentials.github_token.as_deref()),
            hub_auth: AuthMode::from_token(settings.credentials.hub_token.as_deref()),
            show_progress: false,
        }
    }

    /// Draws a progress bar during batch operations.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn github_auth(&self) -> &AuthMode {
        &self.github_auth
    }

    pub fn hub_auth(&self) -> &AuthMode {
        &self.hub_auth
    }

    pub fn endpoints(&self) -> &EndpointConfig {
        &self.endpoints
    }

    /// Serves `key` from the cache or computes it with `fetch`. Concurrent
    /// callers for the same key wait for the first one and then hit.
    pub(crate) async fn cached<T, F, Fut>(&self, key: &str, fetch: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Fetched<T>>,
    {
        let _guard = self.locks.lock(key).await;

        if let Some(hit) = get_typed::<T>(self.cache.as_ref(), key) {
            debug!("Cache hit: {}", key);
            return hit;
        }

        match fetch().await {
            Fetched::Cacheable(value) => {
                if let Err(e) = set_typed(self.cache.as_ref(), key, &value, self.ttl) {
                    warn!("Failed to cache '{}': {}", key, e);
                }
                value
            }
            Fetched::Transient(value) => value,
        }
    }

    /// GET with a one-shot anonymous retry when a configured token is
    /// rejected. Once the token has been rejected `token` is cleared, so
    /// later requests of the same lookup go out anonymously.
    pub(crate) async fn get_with_auth_fallback(
        &self,
        url: &str,
        token: &mut Option<String>,
    ) -> Result<HttpResponse, TransportError> {
        let response = self.http.get(url, token.as_deref()).await?;
        if response.is_unauthorized() && token.is_some() {
            warn!("Token rejected for {}, retrying without authentication", url);
            *token = None;
            return self.http.get(url, None).await;
        }
        Ok(response)
    }
}

/// Short description of a non-success response for `last_error`.
pub(crate) fn describe_status(response: &HttpResponse) -> String {
    let snippet: String = response.body.chars().take(120).collect();
    if snippet.trim().is_empty() {
        format!("HTTP {}", response.status)
    } else {
        format!("HTTP {}: {}", response.status, snippet.trim())
    }
}
