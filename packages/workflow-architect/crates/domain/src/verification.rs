//! Verdicts that compare what the registry declares with what discovery saw.

use thiserror::Error;
use workflow_manifest::{
    GitVersions, HubFileVersion, ManagerVersions, ModelVerification, NodeVerification,
    VerificationReport, NO_INSTALL_SOURCE, NO_MODEL_SOURCE,
};

/// Shortest commit prefix accepted as a pin.
pub const MIN_COMMIT_PREFIX: usize = 7;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Verification failed: {nodes} node(s) and {models} model(s) failed verification")]
    Unverified { nodes: usize, models: usize },
}

/// Verified iff the package exists upstream. The reported version is the pin
/// when there is one.
pub fn judge_manager(expected_version: Option<&str>, found: &ManagerVersions) -> NodeVerification {
    if !found.available {
        return NodeVerification {
            available_versions: Some(found.all_versions.clone()),
            ..NodeVerification::failed(
                found
                    .error
                    .clone()
                    .unwrap_or_else(|| "package not found in registry".to_string()),
            )
        };
    }

    NodeVerification {
        verified: true,
        resolved_version: expected_version
            .map(str::to_string)
            .or_else(|| found.latest_version.clone()),
        available_versions: Some(found.all_versions.clone()),
        error: None,
    }
}

/// Verified iff the pin is a known tag or the head commit. Without a pin the
/// repository only has to be reachable.
pub fn judge_git(pinned_ref: Option<&str>, found: &GitVersions) -> NodeVerification {
    let available_versions = Some(found.tags.clone());

    let Some(pin) = pinned_ref.filter(|p| !p.is_empty()) else {
        return NodeVerification {
            verified: found.verified,
            resolved_version: found.latest_commit.clone(),
            available_versions,
            error: found.error.clone(),
        };
    };

    let is_tag = found.tags.iter().any(|t| t == pin);
    let is_head = found
        .latest_commit
        .as_deref()
        .is_some_and(|head| matches_commit(pin, head));

    if is_tag || is_head {
        NodeVerification {
            verified: true,
            resolved_version: Some(pin.to_string()),
            available_versions,
            error: None,
        }
    } else {
        let reason = match &found.error {
            Some(e) => format!("pinned ref '{}' not verifiable: {}", pin, e),
            None => format!("pinned ref '{}' is neither a tag nor the latest commit", pin),
        };
        NodeVerification {
            available_versions,
            ..NodeVerification::failed(reason)
        }
    }
}

fn matches_commit(pin: &str, head: &str) -> bool {
    pin.eq_ignore_ascii_case(head)
        || (pin.len() >= MIN_COMMIT_PREFIX
            && head
                .get(..pin.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(pin)))
}

pub fn judge_hub(found: &HubFileVersion) -> ModelVerification {
    if found.verified {
        ModelVerification {
            verified: true,
            resolved_commit: Some(found.commit.clone()).filter(|c| !c.is_empty()),
            file_size: Some(found.file_size),
            error: None,
        }
    } else {
        ModelVerification::failed(
            found
                .error
                .clone()
                .unwrap_or_else(|| "file not found in repository tree".to_string()),
        )
    }
}

pub fn judge_direct() -> ModelVerification {
    ModelVerification {
        verified: true,
        resolved_commit: None,
        file_size: None,
        error: None,
    }
}

pub fn unsourced_node() -> NodeVerification {
    NodeVerification::failed(NO_INSTALL_SOURCE)
}

pub fn unsourced_model() -> ModelVerification {
    ModelVerification::failed(NO_MODEL_SOURCE)
}

/// Gate for CI: fails with the count of unverified entries, if any.
pub fn assert_all_verified(report: &VerificationReport) -> Result<(), VerificationError> {
    let nodes = report.failing_nodes().len();
    let models = report.failing_models().len();
    if nodes == 0 && models == 0 {
        Ok(())
    } else {
        Err(VerificationError::Unverified { nodes, models })
    }
}
