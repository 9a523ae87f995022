use super::{analyze_str, analyze_text, push_unique, AnalyzeError};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;
use workflow_manifest::{
    DependencyReport, MissingDependencies, Registry, WorkflowDependencySet,
};

/// Analyzes one file. Structured parsing is tried first; anything that is not
/// an API-format graph goes through the textual scanner.
pub fn analyze_file(path: &Path) -> Result<WorkflowDependencySet, AnalyzeError> {
    let content = std::fs::read_to_string(path).map_err(|source| AnalyzeError::Io {
        path: path.display().to_string(),
        source,
    })?;

    match analyze_str(&content, Some(path)) {
        Ok(set) => Ok(set),
        Err(e) => {
            debug!("Falling back to text scan for {}: {}", path.display(), e);
            Ok(analyze_text(&content, Some(path)))
        }
    }
}

/// Analyzes every `.json` file below `dir`, in path order. Files that cannot
/// be read are skipped with a warning.
pub fn analyze_directory(dir: &Path) -> Result<Vec<WorkflowDependencySet>, AnalyzeError> {
    if !dir.is_dir() {
        return Err(AnalyzeError::Io {
            path: dir.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut sets = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let is_json = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if !entry.file_type().is_file() || !is_json {
            continue;
        }

        match analyze_file(entry.path()) {
            Ok(set) => sets.push(set),
            Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    Ok(sets)
}

/// Aggregates workflows and lists every identifier the registry cannot serve.
/// A node type is missing when it has no package mapping or the mapped package
/// has no entry.
pub fn build_report(workflows: Vec<WorkflowDependencySet>, registry: &Registry) -> DependencyReport {
    let mut all_node_types = Vec::new();
    let mut all_models = Vec::new();

    for set in &workflows {
        for node_type in &set.node_types {
            push_unique(&mut all_node_types, node_type);
        }
        for model in &set.models {
            push_unique(&mut all_models, model);
        }
    }

    let missing_from_registry = MissingDependencies {
        nodes: all_node_types
            .iter()
            .filter(|t| registry.package_for_node_type(t).is_none())
            .cloned()
            .collect(),
        models: all_models
            .iter()
            .filter(|m| !registry.contains_model(m))
            .cloned()
            .collect(),
    };

    DependencyReport {
        generated_at: Utc::now(),
        workflows,
        all_node_types,
        all_models,
        missing_from_registry,
    }
}
