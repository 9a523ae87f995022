use super::{describe_status, DiscoveryService, Fetched};
use domain::ports::cache::cache_key;
use domain::resolution::parse_github_repo;
use serde::Deserialize;
use tracing::{debug, warn};
use workflow_manifest::GitVersions;

/// Page size requested from the tags endpoint; a shorter page is the last.
const TAGS_PER_PAGE: usize = 100;
const MAX_TAG_PAGES: usize = 20;

#[derive(Deserialize)]
struct TagResponse {
    name: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
}

impl DiscoveryService {
    /// Tags and head commit of a GitHub repository. A rejected token is
    /// retried once anonymously; public repositories stay readable.
    pub async fn discover_github_node_versions(&self, repository_url: &str) -> GitVersions {
        let Some((owner, repo)) = parse_github_repo(repository_url) else {
            return GitVersions::unverified(format!(
                "unsupported repository url '{}'",
                repository_url
            ));
        };

        let key = cache_key("git", &[&owner, &repo]);
        self.cached(&key, || async move {
            let base = format!(
                "{}/repos/{}/{}",
                self.endpoints.github_api_base.trim_end_matches('/'),
                owner,
                repo
            );
            let mut token = self.github_auth.token().map(str::to_string);

            let tags = match self.fetch_tags(&base, &mut token).await {
                Ok(tags) => tags,
                Err(error) => {
                    warn!("Tags for {}/{}: {}", owner, repo, error);
                    return Fetched::Transient(GitVersions::unverified(error));
                }
            };

            let commit_url = format!("{}/commits/{}", base, self.endpoints.git_default_branch);
            let response = match self.get_with_auth_fallback(&commit_url, &mut token).await {
                Ok(response) => response,
                Err(e) => {
                    return Fetched::Transient(GitVersions {
                        tags,
                        ..GitVersions::unverified(e.to_string())
                    })
                }
            };

            if !response.is_success() {
                return Fetched::Transient(GitVersions {
                    tags,
                    ..GitVersions::unverified(describe_status(&response))
                });
            }

            match serde_json::from_str::<CommitResponse>(&response.body) {
                Ok(commit) => Fetched::Cacheable(GitVersions {
                    tags,
                    latest_commit: Some(commit.sha),
                    verified: true,
                    error: None,
                }),
                Err(e) => Fetched::Transient(GitVersions {
                    tags,
                    ..GitVersions::unverified(format!("unreadable commit response: {}", e))
                }),
            }
        })
        .await
    }

    /// Every tag of the repository, following pages until one comes back
    /// short. Any page that cannot be read fails the whole listing.
    async fn fetch_tags(&self, base: &str, token: &mut Option<String>) -> Result<Vec<String>, String> {
        let mut tags = Vec::new();
        for page in 1..=MAX_TAG_PAGES {
            let url = if page == 1 {
                format!("{}/tags?per_page={}", base, TAGS_PER_PAGE)
            } else {
                format!("{}/tags?per_page={}&page={}", base, TAGS_PER_PAGE, page)
            };

            let response = self
                .get_with_auth_fallback(&url, token)
                .await
                .map_err(|e| e.to_string())?;
            if !response.is_success() {
                return Err(describe_status(&response));
            }
            let batch: Vec<TagResponse> = serde_json::from_str(&response.body)
                .map_err(|e| format!("unreadable tag list: {}", e))?;

            let last_page = batch.len() < TAGS_PER_PAGE;
            tags.extend(batch.into_iter().map(|t| t.name));
            if last_page {
                return Ok(tags);
            }
            debug!("Tag page {} of {} was full, fetching the next", page, base);
        }
        warn!(
            "{} has more than {} tags, keeping the first {}",
            base,
            MAX_TAG_PAGES * TAGS_PER_PAGE,
            tags.len()
        );
        Ok(tags)
    }
}
