//! Turns registry entries into concrete download URLs and repository coordinates.

use regex::Regex;
use std::sync::OnceLock;
use workflow_manifest::{ModelEntry, ModelSource};

/// Revision used for hub URLs when an entry carries no pinned commit.
pub const DEFAULT_HUB_REVISION: &str = "main";

/// `{hub_base}/{repo}/resolve/{revision}/{file_path}`
pub fn hub_resolve_url(hub_base: &str, repo: &str, revision: &str, file_path: &str) -> String {
    format!(
        "{}/{}/resolve/{}/{}",
        hub_base.trim_end_matches('/'),
        repo.trim_matches('/'),
        revision,
        file_path.trim_start_matches('/')
    )
}

/// Download URL for a model. The first non-empty of: the resolved URL written
/// by discovery, the direct link, a hub URL built from the source.
pub fn model_download_url(entry: &ModelEntry, hub_base: &str) -> Option<String> {
    if let Some(url) = entry.resolved_download_url.as_deref().filter(|u| !u.is_empty()) {
        return Some(url.to_string());
    }

    match entry.source.as_ref()? {
        ModelSource::DirectUrl { url, .. } => Some(url.clone()).filter(|u| !u.is_empty()),
        ModelSource::Hub {
            repo,
            file_path,
            pinned_commit,
            ..
        } => {
            if repo.is_empty() || file_path.is_empty() {
                return None;
            }
            let revision = pinned_commit
                .as_deref()
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_HUB_REVISION);
            Some(hub_resolve_url(hub_base, repo, revision, file_path))
        }
    }
}

fn github_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:https?://|git@)(?:www\.)?github\.com[/:]([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/?$",
        )
        .expect("github url pattern is valid")
    })
}

/// Owner and repository name of a GitHub URL. `None` for any other host.
pub fn parse_github_repo(url: &str) -> Option<(String, String)> {
    let caps = github_pattern().captures(url.trim())?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Directory a repository is cloned into: its last path segment without `.git`.
pub fn repo_dir_name(url: &str) -> Option<String> {
    let name = url
        .trim()
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()?
        .trim_end_matches(".git");
    (!name.is_empty()).then(|| name.to_string())
}
