pub mod types;
pub use types::*;

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The dependency registry: the single source of truth for install and
/// download sources. Keys are stable identifiers, so every map is ordered and
/// anything generated from it is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    /// Node type (as written in a workflow graph) -> package name.
    #[serde(default)]
    pub node_types: BTreeMap<String, String>,

    /// Package name -> install source and verification metadata.
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeEntry>,

    /// Model filename -> download source and verification metadata.
    #[serde(default)]
    pub models: BTreeMap<String, ModelEntry>,
}

/// On-disk formats a registry can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryFormat {
    Json,
    Toml,
    Yaml,
}

impl RegistryFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match ext {
            "json" => Ok(RegistryFormat::Json),
            "toml" => Ok(RegistryFormat::Toml),
            "yaml" | "yml" => Ok(RegistryFormat::Yaml),
            _ => anyhow::bail!("Unsupported registry format: '{}'", ext),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a registry document and re-applies the source invariants.
    pub fn parse(content: &str, format: RegistryFormat) -> Result<Self> {
        let mut registry: Registry = match format {
            RegistryFormat::Json => {
                serde_json::from_str(content).context("Failed to parse JSON registry")?
            }
            RegistryFormat::Toml => {
                toml::from_str(content).context("Failed to parse TOML registry")?
            }
            RegistryFormat::Yaml => {
                serde_yaml::from_str(content).context("Failed to parse YAML registry")?
            }
        };
        registry.enforce_invariants();
        Ok(registry)
    }

    pub fn render(&self, format: RegistryFormat) -> Result<String> {
        match format {
            RegistryFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to serialize registry")
            }
            RegistryFormat::Toml => {
                toml::to_string_pretty(self).context("Failed to serialize registry")
            }
            RegistryFormat::Yaml => {
                serde_yaml::to_string(self).context("Failed to serialize registry")
            }
        }
    }

    pub fn enforce_invariants(&mut self) {
        for entry in self.nodes.values_mut() {
            entry.enforce_invariants();
        }
        for entry in self.models.values_mut() {
            entry.enforce_invariants();
        }
    }

    /// Overlays `other` on top of `self`. Entries present in both are replaced
    /// wholesale by `other`'s; everything else is kept.
    pub fn merge(&mut self, other: Registry) {
        self.node_types.extend(other.node_types);
        self.nodes.extend(other.nodes);
        self.models.extend(other.models);
    }

    /// Package that provides `node_type`, if the mapping and the entry exist.
    pub fn package_for_node_type(&self, node_type: &str) -> Option<(&str, &NodeEntry)> {
        let package = self.node_types.get(node_type)?;
        self.nodes
            .get_key_value(package)
            .map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn contains_model(&self, filename: &str) -> bool {
        self.models.contains_key(filename)
    }
}
