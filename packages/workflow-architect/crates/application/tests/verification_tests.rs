mod common;

use common::*;
use domain::{assert_all_verified, VerificationError};
use pretty_assertions::assert_eq;
use workflow_manifest::{ModelEntry, NodeEntry, Registry};

const TAGS_URL: &str = "https://github-api.test/repos/kijai/ComfyUI-WanVideoWrapper/tags?per_page=100";
const COMMIT_URL: &str = "https://github-api.test/repos/kijai/ComfyUI-WanVideoWrapper/commits/HEAD";

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .nodes
        .insert("RES4LYF".into(), NodeEntry::manager("res4lyf", Some("1.4.0")));
    registry.nodes.insert(
        "comfyui-wanvideowrapper".into(),
        NodeEntry::git("https://github.com/kijai/ComfyUI-WanVideoWrapper", Some("1.2.3")),
    );
    registry.models.insert(
        "4x-UltraSharp.pth".into(),
        ModelEntry::direct_url("https://example.com/4x-UltraSharp.pth", "upscale_models"),
    );
    registry
}

#[tokio::test]
async fn test_all_declared_versions_verify() {
    let http = FakeTransport::new();
    http.respond(
        MANAGER_URL,
        200,
        r#"[{"package": "res4lyf", "name": "RES4LYF", "versions": ["1.3.0", "1.4.0"]}]"#,
    );
    http.respond(TAGS_URL, 200, r#"[{"name": "1.2.3"}, {"name": "1.2.2"}]"#);
    http.respond(COMMIT_URL, 200, r#"{"sha": "e4f5a6b7c8d9"}"#);
    let (service, _) = service(http, &settings());

    let report = service.verify_all_versions(&registry()).await;

    assert!(report.all_verified(), "{:?}", report);
    assert_eq!(report.nodes["RES4LYF"].resolved_version.as_deref(), Some("1.4.0"));
    assert!(report.models["4x-UltraSharp.pth"].verified);
    assert!(assert_all_verified(&report).is_ok());
}

#[tokio::test]
async fn test_unknown_package_and_unknown_tag_fail_the_gate() {
    let http = FakeTransport::new();
    http.respond(
        MANAGER_URL,
        200,
        r#"[{"package": "comfyui-kjnodes", "version": "1.1.2"}]"#,
    );
    http.respond(TAGS_URL, 200, "[]");
    http.respond(COMMIT_URL, 200, r#"{"sha": "e4f5a6b7c8d9"}"#);
    let (service, _) = service(http, &settings());

    let report = service.verify_all_versions(&registry()).await;

    assert_eq!(report.failing_nodes(), vec!["RES4LYF", "comfyui-wanvideowrapper"]);
    assert!(report.failing_models().is_empty());
    let error = assert_all_verified(&report).unwrap_err();
    assert_eq!(error, VerificationError::Unverified { nodes: 2, models: 0 });
    assert_eq!(
        error.to_string(),
        "Verification failed: 2 node(s) and 0 model(s) failed verification"
    );
}

#[tokio::test]
async fn test_commit_prefix_pin_verifies() {
    let http = FakeTransport::new();
    http.respond(TAGS_URL, 200, "[]");
    http.respond(COMMIT_URL, 200, r#"{"sha": "e4f5a6b7c8d9"}"#);
    let (service, _) = service(http, &settings());

    let mut registry = Registry::new();
    registry.nodes.insert(
        "comfyui-wanvideowrapper".into(),
        NodeEntry::git("https://github.com/kijai/ComfyUI-WanVideoWrapper", Some("e4f5a6b")),
    );

    let report = service.verify_all_versions(&registry).await;

    assert!(report.all_verified());
}

#[tokio::test]
async fn test_unsourced_entries_fail() {
    let http = FakeTransport::new();
    let (service, _) = service(http.clone(), &settings());

    let mut registry = Registry::new();
    registry.nodes.insert("ghost".into(), NodeEntry::unsourced());
    registry
        .models
        .insert("ghost.safetensors".into(), ModelEntry::unsourced());

    let report = service.verify_all_versions(&registry).await;

    assert_eq!(report.failing_nodes(), vec!["ghost"]);
    assert_eq!(report.failing_models(), vec!["ghost.safetensors"]);
    assert_eq!(http.request_count(), 0);
}

#[tokio::test]
async fn test_verification_leaves_registry_untouched() {
    let http = FakeTransport::new();
    let (service, _) = service(http, &settings());
    let registry = registry();
    let before = registry.clone();

    service.verify_all_versions(&registry).await;

    assert_eq!(registry, before);
}
