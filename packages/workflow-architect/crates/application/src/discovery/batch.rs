use super::DiscoveryService;
use chrono::Utc;
use domain::resolution::hub_resolve_url;
use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use workflow_manifest::{ModelEntry, ModelSource, NodeEntry, NodeSource, Registry};

/// Counts from one `discover_all` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub nodes: usize,
    pub nodes_verified: usize,
    pub models: usize,
    pub models_verified: usize,
}

/// An entry copy, before and after its refresh.
enum Refreshed {
    Node(String, NodeEntry),
    Model(String, ModelEntry),
}

impl DiscoveryService {
    /// Refreshes every registry entry from upstream. Entries are discovered
    /// on copies, concurrently, and written back once all are done. A failing
    /// entry records its error and the rest carry on.
    pub async fn discover_all(&self, registry: &mut Registry) -> DiscoverySummary {
        let total = registry.nodes.len() + registry.models.len();
        let progress = self.progress_bar(total as u64, "Discovering");

        let jobs: Vec<Refreshed> = registry
            .nodes
            .iter()
            .map(|(name, entry)| Refreshed::Node(name.clone(), entry.clone()))
            .chain(
                registry
                    .models
                    .iter()
                    .map(|(name, entry)| Refreshed::Model(name.clone(), entry.clone())),
            )
            .collect();

        let results: Vec<Refreshed> = stream::iter(jobs)
            .map(|job| {
                let progress = &progress;
                async move {
                    let refreshed = match job {
                        Refreshed::Node(name, entry) => {
                            progress.set_message(name.clone());
                            let entry = self.refresh_node(&name, entry).await;
                            Refreshed::Node(name, entry)
                        }
                        Refreshed::Model(name, entry) => {
                            progress.set_message(name.clone());
                            let entry = self.refresh_model(&name, entry).await;
                            Refreshed::Model(name, entry)
                        }
                    };
                    progress.inc(1);
                    refreshed
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        progress.finish_and_clear();

        let mut summary = DiscoverySummary::default();
        for result in results {
            match result {
                Refreshed::Node(name, entry) => {
                    summary.nodes += 1;
                    summary.nodes_verified += usize::from(entry.verified);
                    registry.nodes.insert(name, entry);
                }
                Refreshed::Model(name, entry) => {
                    summary.models += 1;
                    summary.models_verified += usize::from(entry.verified);
                    registry.models.insert(name, entry);
                }
            }
        }

        info!(
            "Discovery finished: {}/{} nodes and {}/{} models verified",
            summary.nodes_verified, summary.nodes, summary.models_verified, summary.models
        );
        summary
    }

    async fn refresh_node(&self, name: &str, mut entry: NodeEntry) -> NodeEntry {
        let Some(source) = entry.source.as_mut() else {
            entry.enforce_invariants();
            warn!("{}: {}", name, workflow_manifest::NO_INSTALL_SOURCE);
            return entry;
        };

        match source {
            NodeSource::Manager {
                package_name,
                expected_version,
            } => {
                let found = self.discover_manager_node_versions(package_name).await;
                if expected_version.is_none() {
                    *expected_version = found.latest_version.clone();
                }
                entry.verified = found.available;
                entry.available_versions = found.all_versions;
                entry.last_error = found.error;
            }
            NodeSource::Git {
                repository_url,
                pinned_ref,
            } => {
                if repository_url.trim().is_empty() {
                    entry.verified = false;
                    entry.last_error = Some("git source has no repository url".to_string());
                } else {
                    let found = self.discover_github_node_versions(repository_url).await;
                    if pinned_ref.is_none() {
                        *pinned_ref = found.latest_commit.clone();
                    }
                    entry.verified = found.verified;
                    entry.available_versions = found.tags;
                    entry.last_error = found.error;
                }
            }
        }

        if let Some(error) = &entry.last_error {
            warn!("{}: {}", name, error);
        }
        entry.last_verified_at = Some(Utc::now());
        entry
    }

    async fn refresh_model(&self, name: &str, mut entry: ModelEntry) -> ModelEntry {
        match entry.source.as_mut() {
            None => {
                warn!("{}: {}", name, workflow_manifest::NO_MODEL_SOURCE);
            }
            Some(ModelSource::DirectUrl { .. }) => {
                entry.last_verified_at = Some(Utc::now());
            }
            Some(ModelSource::Hub {
                repo,
                file_path,
                pinned_commit,
                ..
            }) => {
                let found = self.discover_hub_model_version(repo, file_path).await;
                if found.verified {
                    if pinned_commit.is_none() {
                        *pinned_commit = Some(found.commit.clone());
                    }
                    let revision = pinned_commit.as_deref().unwrap_or(&found.commit);
                    entry.resolved_download_url = Some(hub_resolve_url(
                        &self.endpoints.hub_base,
                        repo,
                        revision,
                        file_path,
                    ));
                    entry.resolved_file_size = found.file_size;
                    entry.last_error = None;
                } else {
                    if found.error.is_none() {
                        // Gone upstream: a stale URL would still be downloaded.
                        entry.resolved_download_url = None;
                        entry.resolved_file_size = 0;
                    }
                    entry.last_error = Some(
                        found
                            .error
                            .unwrap_or_else(|| format!("'{}' not found in {}", file_path, repo)),
                    );
                    warn!("{}: {}", name, entry.last_error.as_deref().unwrap_or_default());
                }
                entry.verified = found.verified;
                entry.last_verified_at = Some(Utc::now());
            }
        }

        entry.enforce_invariants();
        entry
    }

    pub(crate) fn progress_bar(&self, len: u64, prefix: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_prefix(prefix);
        pb
    }
}
