use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use workflow_architect::application::DiscoveryService;
use workflow_architect::domain::{CacheStore, HttpTransport};
use workflow_architect::infrastructure::{DiskCache, MemoryCache, ReqwestTransport, ResilientClient};
use workflow_manifest::Settings;

use crate::core::error::CliError;

pub const DEFAULT_CONFIG_FILE: &str = "workflow-architect.toml";

/// Everything a command needs besides its own flags.
pub struct AppContext {
    pub settings: Settings,
    pub registry_path: Option<PathBuf>,
}

impl AppContext {
    pub fn load(config: Option<&Path>, registry_path: Option<PathBuf>) -> Result<Self> {
        let mut settings = load_settings(config)?;
        apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
        Ok(Self {
            settings,
            registry_path,
        })
    }

    /// The file `--write-registry` persists to.
    pub fn writable_registry_path(&self) -> Result<&Path, CliError> {
        self.registry_path.as_deref().ok_or_else(|| {
            CliError::Config("--write-registry needs --registry <path>".to_string())
        })
    }

    /// Builds the discovery service over a retrying HTTP client and the
    /// configured cache. Logs which sources are queried with credentials.
    pub fn discovery_service(&self, show_progress: bool) -> Result<DiscoveryService> {
        let retry = &self.settings.retry;
        let transport = ReqwestTransport::new(retry.timeout)?;
        let http: Arc<dyn HttpTransport> = Arc::new(ResilientClient::new(
            transport,
            retry.max_attempts,
            retry.backoff_step,
        ));

        let cache: Arc<dyn CacheStore> = if self.settings.cache.enabled {
            let dir = self
                .settings
                .cache
                .dir
                .clone()
                .unwrap_or_else(DiskCache::default_dir);
            debug!("Discovery cache at {}", dir.display());
            Arc::new(DiskCache::new(dir)?)
        } else {
            debug!("Discovery cache disabled, using a per-run memory cache");
            Arc::new(MemoryCache::new())
        };

        let service = DiscoveryService::new(http, cache, &self.settings).with_progress(show_progress);
        info!(
            "GitHub access: {}, Hugging Face access: {}",
            service.github_auth().label(),
            service.hub_auth().label()
        );
        Ok(service)
    }
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(Settings::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read settings file: {:?}", path))?;
    parse_settings(&content).map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)).into())
}

fn parse_settings(content: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(content)
}

/// Environment wins over the settings file. `lookup` is `std::env::var` outside tests.
fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), CliError> {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty("GITHUB_TOKEN") {
        settings.credentials.github_token = Some(token);
    }
    if let Some(token) = non_empty("HF_TOKEN") {
        settings.credentials.hub_token = Some(token);
    }
    if let Some(dir) = non_empty("WORKFLOW_ARCHITECT_CACHE_DIR") {
        settings.cache.dir = Some(PathBuf::from(dir));
    }
    if let Some(raw) = non_empty("WORKFLOW_ARCHITECT_CONCURRENCY") {
        let concurrency: usize = raw.trim().parse().map_err(|_| {
            CliError::Config(format!(
                "WORKFLOW_ARCHITECT_CONCURRENCY must be a positive integer, got '{}'",
                raw
            ))
        })?;
        if concurrency == 0 {
            return Err(CliError::Config(
                "WORKFLOW_ARCHITECT_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        settings.discovery.concurrency = concurrency;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::time::Duration;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_settings_file_sections() {
        let settings = parse_settings(
            r#"
            [cache]
            ttl = "2h"

            [generate]
            bake_models = true
            modal_gpu = "A100"
            "#,
        )
        .unwrap();

        assert_eq!(settings.cache.ttl, Duration::from_secs(7200));
        assert!(settings.generate.bake_models);
        assert_eq!(settings.generate.modal_gpu, "A100");
        assert_eq!(settings.discovery.concurrency, 8);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        apply_env_overrides(
            &mut settings,
            env(&[
                ("GITHUB_TOKEN", "ghp_x"),
                ("HF_TOKEN", "  "),
                ("WORKFLOW_ARCHITECT_CACHE_DIR", "/tmp/wa-cache"),
                ("WORKFLOW_ARCHITECT_CONCURRENCY", "3"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.credentials.github_token.as_deref(), Some("ghp_x"));
        assert_eq!(settings.credentials.hub_token, None);
        assert_eq!(settings.cache.dir, Some(PathBuf::from("/tmp/wa-cache")));
        assert_eq!(settings.discovery.concurrency, 3);
    }

    #[test]
    fn test_bad_concurrency_is_a_config_error() {
        let mut settings = Settings::default();
        let err = apply_env_overrides(&mut settings, env(&[("WORKFLOW_ARCHITECT_CONCURRENCY", "many")]))
            .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));

        let err = apply_env_overrides(&mut settings, env(&[("WORKFLOW_ARCHITECT_CONCURRENCY", "0")]))
            .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
