use anyhow::{Context, Result};
use chrono::Utc;
use domain::ports::cache::{sanitize_key, CacheEntry, CacheError, CacheStore};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// One JSON file per key: `<dir>/<sanitized key>.json`. Distinct keys can
/// sanitize to the same file; the stored key decides which one it holds.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// `$WORKFLOW_ARCHITECT_CACHE_DIR` wins, then the platform cache dir.
    pub fn default_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("WORKFLOW_ARCHITECT_CACHE_DIR") {
            if !dir.trim().is_empty() {
                return PathBuf::from(dir);
            }
        }
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("workflow-architect")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

impl CacheStore for DiskCache {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let path = self.path_for(key);
        let content = std::fs::read_to_string(&path).ok()?;

        let entry: CacheEntry<serde_json::Value> = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Ignoring corrupt cache file {}: {}", path.display(), e);
                return None;
            }
        };

        if entry.key != key {
            debug!("{} holds '{}', not '{}'", path.display(), entry.key, key);
            return None;
        }
        if entry.is_expired_at(Utc::now()) {
            let _ = std::fs::remove_file(&path);
            return None;
        }
        Some(entry.value)
    }

    fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry::new(key, value, ttl);
        let body = serde_json::to_string_pretty(&entry)?;

        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_uses_sanitized_filename() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).unwrap();

        cache
            .set("git:kijai/ComfyUI-KJNodes", json!({"tags": ["v1"]}), Duration::from_secs(60))
            .unwrap();

        assert!(dir.path().join("git_kijai_ComfyUI_KJNodes.json").exists());
        assert_eq!(
            cache.get("git:kijai/ComfyUI-KJNodes"),
            Some(json!({"tags": ["v1"]}))
        );
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).unwrap();
        cache.set("k", json!(1), Duration::ZERO).unwrap();

        assert_eq!(cache.get("k"), None);
        assert!(!dir.path().join("k.json").exists());
    }

    #[test]
    fn test_missing_and_corrupt_files_are_misses() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        assert_eq!(cache.get("absent"), None);
        assert_eq!(cache.get("broken"), None);
    }

    #[test]
    fn test_keys_sharing_a_filename_do_not_collide() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).unwrap();

        cache
            .set("git:kijai:ComfyUI-KJNodes", json!({"latestCommit": "aaa"}), Duration::from_secs(60))
            .unwrap();

        assert_eq!(cache.get("git:kijai:ComfyUI_KJNodes"), None);
        assert_eq!(
            cache.get("git:kijai:ComfyUI-KJNodes"),
            Some(json!({"latestCommit": "aaa"}))
        );

        cache
            .set("git:kijai:ComfyUI_KJNodes", json!({"latestCommit": "bbb"}), Duration::from_secs(60))
            .unwrap();
        assert_eq!(
            cache.get("git:kijai:ComfyUI_KJNodes"),
            Some(json!({"latestCommit": "bbb"}))
        );
        assert_eq!(cache.get("git:kijai:ComfyUI-KJNodes"), None);
    }
}
