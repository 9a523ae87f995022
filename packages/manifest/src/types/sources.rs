use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sentinel error recorded on a node entry that has no install source.
pub const NO_INSTALL_SOURCE: &str = "no install source defined";

/// Sentinel error recorded on a model entry that has no download source.
pub const NO_MODEL_SOURCE: &str = "no source defined";

/// How to obtain one third-party node package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSource {
    /// Resolved through the package-manager registry by package name.
    #[serde(rename_all = "camelCase")]
    Manager {
        package_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_version: Option<String>,
    },

    /// A source-control repository and a tag, branch or commit.
    #[serde(rename_all = "camelCase")]
    Git {
        #[serde(default)]
        repository_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pinned_ref: Option<String>,
    },
}

/// A registry entry for one node package.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<NodeSource>,

    #[serde(default)]
    pub verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verified_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_versions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl NodeEntry {
    pub fn new(source: NodeSource) -> Self {
        Self {
            source: Some(source),
            ..Default::default()
        }
    }

    pub fn manager(package_name: impl Into<String>, expected_version: Option<&str>) -> Self {
        Self::new(NodeSource::Manager {
            package_name: package_name.into(),
            expected_version: expected_version.map(str::to_string),
        })
    }

    pub fn git(repository_url: impl Into<String>, pinned_ref: Option<&str>) -> Self {
        Self::new(NodeSource::Git {
            repository_url: repository_url.into(),
            pinned_ref: pinned_ref.map(str::to_string),
        })
    }

    /// An entry with no install source. It can never verify.
    pub fn unsourced() -> Self {
        let mut entry = Self::default();
        entry.enforce_invariants();
        entry
    }

    /// Re-applies the invariants that do not depend on upstream state.
    pub fn enforce_invariants(&mut self) {
        if self.source.is_none() {
            self.verified = false;
            self.last_error = Some(NO_INSTALL_SOURCE.to_string());
        }
    }
}

/// How to obtain one binary model file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSource {
    /// A file inside a model-hub repository.
    #[serde(rename_all = "camelCase")]
    Hub {
        repo: String,
        file_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pinned_commit: Option<String>,
        destination_subdir: String,
    },

    /// A direct download link. Trusted unconditionally.
    #[serde(rename_all = "camelCase")]
    DirectUrl {
        url: String,
        destination_subdir: String,
    },
}

impl ModelSource {
    pub fn destination_subdir(&self) -> &str {
        match self {
            ModelSource::Hub {
                destination_subdir, ..
            }
            | ModelSource::DirectUrl {
                destination_subdir, ..
            } => destination_subdir,
        }
    }
}

/// A registry entry for one model file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ModelSource>,

    #[serde(default)]
    pub verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verified_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub resolved_file_size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_download_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ModelEntry {
    pub fn new(source: ModelSource) -> Self {
        let mut entry = Self {
            source: Some(source),
            ..Default::default()
        };
        entry.enforce_invariants();
        entry
    }

    pub fn hub(
        repo: impl Into<String>,
        file_path: impl Into<String>,
        pinned_commit: Option<&str>,
        destination_subdir: impl Into<String>,
    ) -> Self {
        Self::new(ModelSource::Hub {
            repo: repo.into(),
            file_path: file_path.into(),
            pinned_commit: pinned_commit.map(str::to_string),
            destination_subdir: destination_subdir.into(),
        })
    }

    pub fn direct_url(url: impl Into<String>, destination_subdir: impl Into<String>) -> Self {
        Self::new(ModelSource::DirectUrl {
            url: url.into(),
            destination_subdir: destination_subdir.into(),
        })
    }

    pub fn unsourced() -> Self {
        let mut entry = Self::default();
        entry.enforce_invariants();
        entry
    }

    /// Direct links are always verified; unsourced entries never are.
    pub fn enforce_invariants(&mut self) {
        match &self.source {
            Some(ModelSource::DirectUrl { .. }) => {
                self.verified = true;
                self.last_error = None;
            }
            Some(ModelSource::Hub { .. }) => {}
            None => {
                self.verified = false;
                self.last_error = Some(NO_MODEL_SOURCE.to_string());
            }
        }
    }
}
