#![allow(dead_code)]

use application::DiscoveryService;
use async_trait::async_trait;
use domain::ports::http::{HttpResponse, HttpTransport, TransportError};
use infrastructure::MemoryCache;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use workflow_manifest::Settings;

pub const MANAGER_URL: &str = "https://manager.test/custom-node-list.json";
pub const GITHUB_API: &str = "https://github-api.test";
pub const HUB_API: &str = "https://hub.test/api";
pub const HUB_BASE: &str = "https://hub.test";

/// A recorded request: the URL and the bearer token it carried.
pub type Request = (String, Option<String>);

/// Answers from per-URL queues. The last queued answer repeats; unknown URLs
/// get a 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, VecDeque<Result<HttpResponse, TransportError>>>>,
    requests: Mutex<Vec<Request>>,
    latency: Option<Duration>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every answer arrives after `latency`, so concurrent callers overlap.
    pub fn slow(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency: Some(latency),
            ..Self::default()
        })
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) -> &Self {
        self.push(url, Ok(HttpResponse::new(status, body)))
    }

    pub fn fail(&self, url: &str, error: TransportError) -> &Self {
        self.push(url, Err(error))
    }

    fn push(&self, url: &str, answer: Result<HttpResponse, TransportError>) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(answer);
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(
        &self,
        url: &str,
        bearer_token: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), bearer_token.map(str::to_string)));
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Ok(HttpResponse::new(404, "")),
        }
    }
}

pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.endpoints.manager_registry_url = MANAGER_URL.to_string();
    settings.endpoints.github_api_base = GITHUB_API.to_string();
    settings.endpoints.hub_api_base = HUB_API.to_string();
    settings.endpoints.hub_base = HUB_BASE.to_string();
    settings
}

pub fn service(http: Arc<FakeTransport>, settings: &Settings) -> (DiscoveryService, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    (DiscoveryService::new(http, cache.clone(), settings), cache)
}
