use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of what a workflow produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowType {
    Image,
    Video,
    FaceSwap,
    Upscale,
    #[default]
    Other,
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowType::Image => "image",
            WorkflowType::Video => "video",
            WorkflowType::FaceSwap => "face-swap",
            WorkflowType::Upscale => "upscale",
            WorkflowType::Other => "other",
        };
        f.write_str(label)
    }
}

/// Dependencies extracted from one workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDependencySet {
    pub id: String,
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<String>,

    #[serde(default)]
    pub workflow_type: WorkflowType,

    /// Non-built-in node types, in first-seen order, without duplicates.
    #[serde(default)]
    pub node_types: Vec<String>,

    /// Model filenames, in first-seen order, without duplicates.
    #[serde(default)]
    pub models: Vec<String>,
}

/// Identifiers referenced by workflows but absent from the registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct MissingDependencies {
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub models: Vec<String>,
}

impl MissingDependencies {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.models.is_empty()
    }
}

/// Aggregate over one or many analyzed workflows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyReport {
    pub generated_at: DateTime<Utc>,
    pub workflows: Vec<WorkflowDependencySet>,
    pub all_node_types: Vec<String>,
    pub all_models: Vec<String>,
    pub missing_from_registry: MissingDependencies,
}

/// Counts for the CLI summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub workflows: usize,
    pub node_types: usize,
    pub models: usize,
    pub missing_nodes: usize,
    pub missing_models: usize,
}

impl DependencyReport {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            workflows: self.workflows.len(),
            node_types: self.all_node_types.len(),
            models: self.all_models.len(),
            missing_nodes: self.missing_from_registry.nodes.len(),
            missing_models: self.missing_from_registry.models.len(),
        }
    }
}
