//! Static analysis of workflow graphs: which custom node types and which model
//! files a workflow needs, what it is called, and what kind of output it makes.

pub mod graph;
pub mod report;
pub mod text;

pub use graph::{AnalyzeError, GraphNode, WorkflowGraph};
pub use report::{analyze_directory, analyze_file, build_report};
pub use text::analyze_text;

use crate::rules;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::OnceLock;
use workflow_manifest::WorkflowDependencySet;

/// Analyzes a workflow graph given as JSON text.
pub fn analyze_str(
    content: &str,
    source: Option<&Path>,
) -> Result<WorkflowDependencySet, AnalyzeError> {
    let graph = WorkflowGraph::parse_str(content)?;
    Ok(analyze_graph(&graph, source))
}

/// Extracts custom node types, model filenames, identity and type from a graph.
pub fn analyze_graph(graph: &WorkflowGraph, source: Option<&Path>) -> WorkflowDependencySet {
    let mut node_types = Vec::new();
    let mut models = Vec::new();

    for node in &graph.nodes {
        if !rules::is_builtin_node(&node.class_type) {
            push_unique(&mut node_types, &node.class_type);
        }

        // Input shapes differ per node type, so scan the serialized inputs.
        let serialized = serde_json::Value::Object(node.inputs.clone()).to_string();
        for model in model_filenames(&serialized) {
            push_unique(&mut models, &model);
        }
    }

    let prefix = graph.nodes.iter().find_map(|node| {
        rules::OUTPUT_PREFIX_FIELDS
            .iter()
            .find_map(|field| node.inputs.get(*field).and_then(|v| v.as_str()))
            .filter(|p| is_meaningful_prefix(p))
            .map(str::to_string)
    });

    let hash = (!graph.is_empty()).then(|| content_hash(&graph.raw.to_string()));
    let identity = WorkflowIdentity::derive(prefix.as_deref(), hash.as_deref(), source);
    let workflow_type = rules::classify(graph.nodes.iter().map(|n| n.class_type.as_str()));

    WorkflowDependencySet {
        id: identity.id,
        display_name: identity.display_name,
        source_location: source.map(|p| p.display().to_string()),
        workflow_type,
        node_types,
        models,
    }
}

/// Name and stable id of a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowIdentity {
    pub id: String,
    pub display_name: String,
}

impl WorkflowIdentity {
    /// Priority: output prefix, then content hash, then source filename.
    pub fn derive(prefix: Option<&str>, hash: Option<&str>, source: Option<&Path>) -> Self {
        let stem = source
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty());

        if let Some(prefix) = prefix {
            let id = slugify(prefix);
            if !id.is_empty() {
                return Self {
                    id,
                    display_name: prefix.to_string(),
                };
            }
        }

        if let Some(hash) = hash {
            let short = &hash[..12.min(hash.len())];
            return Self {
                id: format!("workflow-{}", short),
                display_name: stem
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Workflow {}", &short[..8.min(short.len())])),
            };
        }

        match stem {
            Some(stem) => Self {
                id: slugify(stem),
                display_name: stem.to_string(),
            },
            None => Self {
                id: "workflow".to_string(),
                display_name: "Workflow".to_string(),
            },
        }
    }
}

pub(crate) fn is_meaningful_prefix(prefix: &str) -> bool {
    let trimmed = prefix.trim();
    !trimmed.is_empty() && trimmed != rules::DEFAULT_OUTPUT_PREFIX
}

pub(crate) fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Lowercase, alphanumerics kept, every other run collapsed to one `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn model_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let extensions = rules::MODEL_EXTENSIONS.join("|");
        Regex::new(&format!(r#""([^"]*\.(?i:{}))""#, extensions))
            .expect("model filename pattern is valid")
    })
}

/// Model filenames found in JSON text. Only the final path segment is kept.
pub(crate) fn model_filenames(text: &str) -> Vec<String> {
    model_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| basename(m.as_str()))
        .filter(|name| rules::has_model_extension(name))
        .map(str::to_string)
        .collect()
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

pub(crate) fn push_unique(items: &mut Vec<String>, item: &str) {
    if !items.iter().any(|existing| existing == item) {
        items.push(item.to_string());
    }
}
