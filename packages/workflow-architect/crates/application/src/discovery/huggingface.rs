use super::{describe_status, DiscoveryService, Fetched};
use domain::ports::cache::cache_key;
use domain::resolution::hub_resolve_url;
use serde::Deserialize;
use workflow_manifest::HubFileVersion;

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(default)]
    oid: String,
    #[serde(default)]
    size: u64,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    lfs: Option<LfsPointer>,
}

#[derive(Deserialize)]
struct LfsPointer {
    #[serde(default)]
    size: u64,
}

impl DiscoveryService {
    /// Content hash and size of one file on the hub's default branch, plus a
    /// download URL pinned to that hash. A file missing from the tree is a
    /// plain "not found" answer and is cached like any other.
    pub async fn discover_hub_model_version(&self, repo: &str, file_path: &str) -> HubFileVersion {
        let key = cache_key("hub", &[repo, file_path]);
        self.cached(&key, || async move {
            let mut url = format!(
                "{}/models/{}/tree/main",
                self.endpoints.hub_api_base.trim_end_matches('/'),
                repo
            );
            // The tree listing is not recursive.
            if let Some((dir, _)) = file_path.rsplit_once('/') {
                url.push('/');
                url.push_str(dir);
            }

            let mut token = self.hub_auth.token().map(str::to_string);
            let response = match self.get_with_auth_fallback(&url, &mut token).await {
                Ok(response) => response,
                Err(e) => return Fetched::Transient(HubFileVersion::unverified(e.to_string())),
            };
            if !response.is_success() {
                return Fetched::Transient(HubFileVersion::unverified(describe_status(&response)));
            }

            let entries: Vec<TreeEntry> = match serde_json::from_str(&response.body) {
                Ok(entries) => entries,
                Err(e) => {
                    return Fetched::Transient(HubFileVersion::unverified(format!(
                        "unreadable file tree: {}",
                        e
                    )))
                }
            };

            let found = entries
                .into_iter()
                .find(|entry| entry.path == file_path && entry.kind != "directory");

            Fetched::Cacheable(match found {
                Some(entry) => HubFileVersion {
                    verified: true,
                    download_url: Some(hub_resolve_url(
                        &self.endpoints.hub_base,
                        repo,
                        &entry.oid,
                        file_path,
                    )),
                    file_size: entry.lfs.map(|l| l.size).unwrap_or(entry.size),
                    commit: entry.oid,
                    error: None,
                },
                None => HubFileVersion {
                    verified: false,
                    commit: String::new(),
                    file_size: 0,
                    download_url: None,
                    error: None,
                },
            })
        })
        .await
    }
}
