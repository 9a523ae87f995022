use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Verdict for one node package.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeVerification {
    pub verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_versions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeVerification {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            verified: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Verdict for one model file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelVerification {
    pub verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_commit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelVerification {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            verified: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Per-entry verdicts over a whole registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeVerification>,
    #[serde(default)]
    pub models: BTreeMap<String, ModelVerification>,
}

impl VerificationReport {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            nodes: BTreeMap::new(),
            models: BTreeMap::new(),
        }
    }

    pub fn failing_nodes(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, status)| !status.verified)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn failing_models(&self) -> Vec<&str> {
        self.models
            .iter()
            .filter(|(_, status)| !status.verified)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn all_verified(&self) -> bool {
        self.nodes.values().all(|s| s.verified) && self.models.values().all(|s| s.verified)
    }
}

impl Default for VerificationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failing_entries_are_listed_in_key_order() {
        let mut report = VerificationReport::new();
        report.nodes.insert("b-pack".into(), NodeVerification::failed("gone"));
        report.nodes.insert(
            "a-pack".into(),
            NodeVerification {
                verified: true,
                ..Default::default()
            },
        );
        report
            .models
            .insert("vae.safetensors".into(), ModelVerification::failed("missing"));

        assert_eq!(report.failing_nodes(), vec!["b-pack"]);
        assert_eq!(report.failing_models(), vec!["vae.safetensors"]);
        assert!(!report.all_verified());
    }

    #[test]
    fn test_empty_report_is_verified() {
        assert!(VerificationReport::new().all_verified());
    }
}
