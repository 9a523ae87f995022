use crate::discovery::DiscoveryService;
use domain::verification;
use futures_util::future::FutureExt;
use futures_util::stream::{self, StreamExt};
use tracing::warn;
use workflow_manifest::{
    ModelEntry, ModelSource, ModelVerification, NodeEntry, NodeSource, NodeVerification, Registry,
    VerificationReport,
};

enum Verdict {
    Node(String, NodeVerification),
    Model(String, ModelVerification),
}

impl DiscoveryService {
    /// Checks every declared version or ref against upstream. The registry is
    /// only read; what it claims is compared with what discovery reports.
    pub async fn verify_all_versions(&self, registry: &Registry) -> VerificationReport {
        let total = registry.nodes.len() + registry.models.len();
        let progress = self.progress_bar(total as u64, "Verifying");

        let node_checks = registry.nodes.iter().map(|(name, entry)| {
            let progress = &progress;
            async move {
                let verdict = self.verify_node(entry).await;
                progress.inc(1);
                Verdict::Node(name.clone(), verdict)
            }
            .left_future()
        });
        let model_checks = registry.models.iter().map(|(name, entry)| {
            let progress = &progress;
            async move {
                let verdict = self.verify_model(entry).await;
                progress.inc(1);
                Verdict::Model(name.clone(), verdict)
            }
            .right_future()
        });

        let verdicts: Vec<Verdict> = stream::iter(node_checks.chain(model_checks))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        progress.finish_and_clear();

        let mut report = VerificationReport::new();
        for verdict in verdicts {
            match verdict {
                Verdict::Node(name, v) => {
                    if let Some(error) = v.error.as_deref().filter(|_| !v.verified) {
                        warn!("{}: {}", name, error);
                    }
                    report.nodes.insert(name, v);
                }
                Verdict::Model(name, v) => {
                    if let Some(error) = v.error.as_deref().filter(|_| !v.verified) {
                        warn!("{}: {}", name, error);
                    }
                    report.models.insert(name, v);
                }
            }
        }
        report
    }

    async fn verify_node(&self, entry: &NodeEntry) -> NodeVerification {
        match &entry.source {
            None => verification::unsourced_node(),
            Some(NodeSource::Manager {
                package_name,
                expected_version,
            }) => {
                let found = self.discover_manager_node_versions(package_name).await;
                verification::judge_manager(expected_version.as_deref(), &found)
            }
            Some(NodeSource::Git {
                repository_url,
                pinned_ref,
            }) => {
                if repository_url.trim().is_empty() {
                    return NodeVerification::failed("git source has no repository url");
                }
                let found = self.discover_github_node_versions(repository_url).await;
                verification::judge_git(pinned_ref.as_deref(), &found)
            }
        }
    }

    async fn verify_model(&self, entry: &ModelEntry) -> ModelVerification {
        match &entry.source {
            None => verification::unsourced_model(),
            Some(ModelSource::DirectUrl { .. }) => verification::judge_direct(),
            Some(ModelSource::Hub {
                repo, file_path, ..
            }) => {
                let found = self.discover_hub_model_version(repo, file_path).await;
                verification::judge_hub(&found)
            }
        }
    }
}
