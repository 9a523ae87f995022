//! Deployment artifacts built from a registry.
//!
//! Generators never fail. Anything they cannot install turns into a comment
//! or a warning line in the output, so a partial registry still yields a
//! usable artifact.

pub mod dockerfile;
pub mod installer;
pub mod modal;

pub use dockerfile::generate_dockerfile;
pub use installer::generate_installer;
pub use modal::generate_modal_app;

use anyhow::{Context, Result};
use domain::resolution::{model_download_url, repo_dir_name};
use domain::rules;
use std::path::{Path, PathBuf};
use tracing::info;
use workflow_manifest::{
    ModelSource, NodeEntry, NodeSource, Registry, Settings, WorkflowDependencySet,
};

pub const INSTALLER_FILE: &str = "install.sh";
pub const DOCKERFILE_FILE: &str = "Dockerfile";
pub const MODAL_APP_FILE: &str = "modal_app.py";

/// A package installed through the package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerInstall {
    pub package: String,
    /// `package` or `package@version`.
    pub spec: String,
}

/// A package cloned from source control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInstall {
    pub package: String,
    /// `None` when the registry entry carries no usable URL.
    pub url: Option<String>,
    pub dir_name: String,
    pub pinned_ref: Option<String>,
}

/// Hub coordinates, kept for generators that download through a hub client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubCoordinates {
    pub repo: String,
    pub file_path: String,
    pub revision: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDownload {
    pub filename: String,
    /// `None` when no download URL can be resolved.
    pub url: Option<String>,
    pub subdir: String,
    /// Every directory the file is placed in, `subdir` first.
    pub destinations: Vec<String>,
    pub hub: Option<HubCoordinates>,
}

/// What to install, in a fixed order, shared by every generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallPlan {
    pub title: Option<String>,
    pub manager: Vec<ManagerInstall>,
    pub git: Vec<GitInstall>,
    pub models: Vec<ModelDownload>,
    /// Node types the registry cannot map to a package.
    pub unmapped_nodes: Vec<String>,
}

impl InstallPlan {
    /// Covers the whole registry, or only what `context` references.
    pub fn build(
        registry: &Registry,
        context: Option<&WorkflowDependencySet>,
        hub_base: &str,
    ) -> Self {
        let mut plan = InstallPlan {
            title: context.map(|c| format!("{} ({})", c.display_name, c.id)),
            ..Default::default()
        };

        match context {
            Some(context) => {
                let mut packages: Vec<&str> = Vec::new();
                for node_type in &context.node_types {
                    match registry.package_for_node_type(node_type) {
                        Some((package, _)) => {
                            if !packages.contains(&package) {
                                packages.push(package);
                            }
                        }
                        None => plan.unmapped_nodes.push(node_type.clone()),
                    }
                }
                for package in packages {
                    if let Some(entry) = registry.nodes.get(package) {
                        plan.add_node(package, entry);
                    }
                }
                for filename in &context.models {
                    plan.add_model(registry, filename, hub_base);
                }
            }
            None => {
                for (package, entry) in &registry.nodes {
                    plan.add_node(package, entry);
                }
                for filename in registry.models.keys() {
                    plan.add_model(registry, filename, hub_base);
                }
            }
        }

        plan
    }

    fn add_node(&mut self, package: &str, entry: &NodeEntry) {
        match &entry.source {
            Some(NodeSource::Manager {
                package_name,
                expected_version,
            }) => {
                let spec = match expected_version.as_deref().filter(|v| !v.is_empty()) {
                    Some(version) => format!("{}@{}", package_name, version),
                    None => package_name.clone(),
                };
                if !self.manager.iter().any(|m| m.spec == spec) {
                    self.manager.push(ManagerInstall {
                        package: package.to_string(),
                        spec,
                    });
                }
            }
            Some(NodeSource::Git {
                repository_url,
                pinned_ref,
            }) => {
                let url = Some(repository_url.trim().to_string()).filter(|u| !u.is_empty());
                let dir_name = url
                    .as_deref()
                    .and_then(repo_dir_name)
                    .unwrap_or_else(|| package.to_string());
                self.git.push(GitInstall {
                    package: package.to_string(),
                    url,
                    dir_name,
                    pinned_ref: pinned_ref.clone().filter(|r| !r.is_empty()),
                });
            }
            None => self.unmapped_nodes.push(package.to_string()),
        }
    }

    fn add_model(&mut self, registry: &Registry, filename: &str, hub_base: &str) {
        let entry = registry.models.get(filename);
        let declared = entry
            .and_then(|e| e.source.as_ref())
            .map(|s| s.destination_subdir());
        let destinations = rules::model_destinations(filename, declared);
        let subdir = destinations
            .first()
            .cloned()
            .unwrap_or_else(|| rules::FALLBACK_MODEL_DESTINATION.to_string());

        let hub = match entry.and_then(|e| e.source.as_ref()) {
            Some(ModelSource::Hub {
                repo,
                file_path,
                pinned_commit,
                ..
            }) if !repo.is_empty() && !file_path.is_empty() => Some(HubCoordinates {
                repo: repo.clone(),
                file_path: file_path.clone(),
                revision: pinned_commit
                    .clone()
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| domain::resolution::DEFAULT_HUB_REVISION.to_string()),
            }),
            _ => None,
        };

        self.models.push(ModelDownload {
            filename: filename.to_string(),
            url: entry.and_then(|e| model_download_url(e, hub_base)),
            subdir,
            destinations,
            hub,
        });
    }
}

/// Single-quotes a value for POSIX shells.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Escapes a value for use inside a double-quoted shell string.
pub fn shell_escape_double(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Writes all three artifacts into `dir`. The installer is made executable.
pub fn write_artifacts(
    dir: &Path,
    registry: &Registry,
    context: Option<&WorkflowDependencySet>,
    settings: &Settings,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let artifacts = [
        (INSTALLER_FILE, generate_installer(registry, context, settings)),
        (DOCKERFILE_FILE, generate_dockerfile(registry, context, settings)),
        (MODAL_APP_FILE, generate_modal_app(registry, context, settings)),
    ];

    let mut written = Vec::new();
    for (name, content) in artifacts {
        let path = dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
        written.push(path);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let installer = dir.join(INSTALLER_FILE);
        std::fs::set_permissions(&installer, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to mark {} executable", installer.display()))?;
    }

    Ok(written)
}
