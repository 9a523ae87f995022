use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level settings, read from `workflow-architect.toml` and the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheConfig,
    pub endpoints: EndpointConfig,
    pub retry: RetryConfig,
    pub discovery: DiscoveryConfig,
    pub generate: GenerateConfig,
    pub credentials: Credentials,
}

/// Cache settings for discovery results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CacheConfig {
    /// Enable caching.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory. Defaults to `$WORKFLOW_ARCHITECT_CACHE_DIR`, then the
    /// platform cache directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Time-to-live for cached entries (e.g., "24h", "30m").
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    #[schemars(with = "String")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            ttl: default_cache_ttl(),
        }
    }
}

/// Base URLs of the external services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct EndpointConfig {
    /// Package-manager registry document.
    pub manager_registry_url: String,
    pub github_api_base: String,
    pub hub_api_base: String,
    /// Host used for constructed `resolve` download links.
    pub hub_base: String,
    /// Ref queried for a repository's latest commit.
    pub git_default_branch: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            manager_registry_url:
                "https://raw.githubusercontent.com/ltdrdata/ComfyUI-Manager/main/custom-node-list.json"
                    .to_string(),
            github_api_base: "https://api.github.com".to_string(),
            hub_api_base: "https://huggingface.co/api".to_string(),
            hub_base: "https://huggingface.co".to_string(),
            git_default_branch: "HEAD".to_string(),
        }
    }
}

/// Bounded retry with linear backoff for every outgoing request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay added per failed attempt ("1s" waits 1s, then 2s, ...).
    #[serde(default = "default_backoff_step", with = "humantime_serde")]
    #[schemars(with = "String")]
    pub backoff_step: Duration,

    /// Per-request timeout.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    #[schemars(with = "String")]
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_step: default_backoff_step(),
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DiscoveryConfig {
    /// Maximum number of entries discovered at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// Knobs for the emitted artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct GenerateConfig {
    /// Graph-engine install directory assumed by the shell installer.
    pub comfyui_dir: String,
    pub docker_base_image: String,
    /// Download models into the image instead of linking them from a volume.
    pub bake_models: bool,
    pub modal_app_name: String,
    pub modal_gpu: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            comfyui_dir: "/workspace/ComfyUI".to_string(),
            docker_base_image: "runpod/worker-comfyui:5.5.1-base".to_string(),
            bake_models: false,
            modal_app_name: "comfyui-workflows".to_string(),
            modal_gpu: "L40S".to_string(),
        }
    }
}

/// API tokens. Usually supplied through the environment, never written back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Credentials {
    #[serde(skip_serializing)]
    pub github_token: Option<String>,
    #[serde(skip_serializing)]
    pub hub_token: Option<String>,
}

/// Whether requests to a source carry credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    Authenticated(String),
    Anonymous,
}

impl AuthMode {
    pub fn from_token(token: Option<&str>) -> Self {
        match token.map(str::trim) {
            Some(t) if !t.is_empty() => AuthMode::Authenticated(t.to_string()),
            _ => AuthMode::Anonymous,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            AuthMode::Authenticated(token) => Some(token),
            AuthMode::Anonymous => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuthMode::Authenticated(_) => "authenticated",
            AuthMode::Anonymous => "anonymous",
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60) // 24 hours
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_step() -> Duration {
    Duration::from_secs(1)
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_concurrency() -> usize {
    8
}
