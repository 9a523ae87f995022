//! Normalized discovery results. These are what the cache stores.

use serde::{Deserialize, Serialize};

/// One package from the package-manager registry document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManagerPackage {
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub versions: Vec<String>,
}

/// Result of looking up one package in the package-manager registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagerVersions {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(default)]
    pub all_versions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ManagerVersions {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Tags and head commit of a source-control repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitVersions {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_commit: Option<String>,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GitVersions {
    pub fn unverified(error: impl Into<String>) -> Self {
        Self {
            verified: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Content hash, size and resolvable URL of one file in a model-hub repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HubFileVersion {
    pub verified: bool,
    /// Empty when the file was not found.
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HubFileVersion {
    pub fn unverified(error: impl Into<String>) -> Self {
        Self {
            verified: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
