use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use workflow_architect::domain::{analyze_directory, analyze_file, curated_registry};
use workflow_manifest::{Registry, RegistryFormat, WorkflowDependencySet};

use crate::core::error::CliError;

/// The curated seed, overlaid with the registry file when one is given.
/// A missing file is not an error so that `--write-registry` can create it.
pub fn load_registry(path: Option<&Path>) -> Result<Registry> {
    let mut registry = curated_registry();
    let Some(path) = path else {
        return Ok(registry);
    };

    let format = registry_format(path)?;
    if !path.exists() {
        warn!(
            "Registry {} does not exist yet, starting from the curated seed",
            path.display()
        );
        return Ok(registry);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read registry file: {:?}", path))?;
    let loaded = Registry::parse(&content, format).map_err(|e| CliError::Registry {
        path: path.to_path_buf(),
        reason: format!("{:#}", e),
    })?;
    info!(
        "Loaded {} node(s) and {} model(s) from {}",
        loaded.nodes.len(),
        loaded.models.len(),
        path.display()
    );
    registry.merge(loaded);
    Ok(registry)
}

/// Writes the registry in the format its extension names.
pub fn save_registry(path: &Path, registry: &Registry) -> Result<()> {
    let content = registry.render(registry_format(path)?)?;
    ensure_parent(path)?;
    fs::write(path, content).with_context(|| format!("Failed to write registry: {:?}", path))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    ensure_parent(path)?;
    fs::write(path, content + "\n").with_context(|| format!("Failed to write {:?}", path))
}

/// Analyzes the explicit files, then every workflow under `dir`. Duplicate
/// paths are analyzed once.
pub fn collect_workflows(files: &[PathBuf], dir: Option<&Path>) -> Result<Vec<WorkflowDependencySet>> {
    let mut workflows = Vec::new();
    let mut seen: Vec<PathBuf> = Vec::new();

    for file in files {
        if seen.contains(file) {
            continue;
        }
        let set = analyze_file(file).with_context(|| format!("Failed to analyze {:?}", file))?;
        seen.push(file.clone());
        workflows.push(set);
    }

    if let Some(dir) = dir {
        for set in analyze_directory(dir)
            .with_context(|| format!("Failed to analyze workflows in {:?}", dir))?
        {
            let already = set
                .source_location
                .as_ref()
                .is_some_and(|loc| seen.iter().any(|s| s == Path::new(loc)));
            if !already {
                workflows.push(set);
            }
        }
    }

    Ok(workflows)
}

fn registry_format(path: &Path) -> Result<RegistryFormat> {
    RegistryFormat::from_path(path).map_err(|e| {
        CliError::Registry {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_manifest::NodeEntry;

    #[test]
    fn test_registry_file_overlays_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("registry.yaml");
        let mut own = Registry::new();
        own.node_types.insert("MyNode".into(), "my-pack".into());
        own.nodes.insert("my-pack".into(), NodeEntry::manager("my-pack", Some("0.1.0")));
        save_registry(&path, &own).unwrap();

        let registry = load_registry(Some(&path)).unwrap();

        assert!(registry.package_for_node_type("MyNode").is_some());
        assert!(registry.package_for_node_type("ClownsharKSampler_Beta").is_some());
    }

    #[test]
    fn test_missing_registry_file_falls_back_to_seed() {
        let dir = tempfile::tempdir().unwrap();
        let registry = load_registry(Some(&dir.path().join("new.toml"))).unwrap();
        assert_eq!(registry, curated_registry());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let err = load_registry(Some(Path::new("registry.ini"))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::Registry { .. })
        ));
    }
}
