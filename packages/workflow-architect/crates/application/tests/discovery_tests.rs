mod common;

use common::*;
use domain::ports::http::TransportError;
use futures_util::future::join;
use std::time::Duration;
use pretty_assertions::assert_eq;
use workflow_manifest::{ModelEntry, ModelSource, NodeEntry, NodeSource, Registry};

const MANAGER_DOC: &str = r#"{
  "custom_nodes": [
    {"id": "res4lyf", "title": "RES4LYF", "version": "1.4.0", "versions": ["1.3.0", "1.4.0"]},
    {"id": "comfyui-kjnodes", "title": "KJNodes for ComfyUI", "version": "1.1.2"}
  ]
}"#;

const TAGS_URL: &str = "https://github-api.test/repos/Gourieff/ComfyUI-ReActor/tags?per_page=100";
const COMMIT_URL: &str = "https://github-api.test/repos/Gourieff/ComfyUI-ReActor/commits/HEAD";
const TREE_URL: &str = "https://hub.test/api/models/black-forest-labs/FLUX.1-dev/tree/main";

const TREE: &str = r#"[
  {"type": "file", "path": "README.md", "oid": "0a1b", "size": 120},
  {"type": "file", "path": "ae.safetensors", "oid": "f0e1d2c3", "size": 135,
   "lfs": {"oid": "sha256:beef", "size": 335304388}}
]"#;

#[tokio::test]
async fn test_manager_lookup_is_cached() {
    let http = FakeTransport::new();
    http.respond(MANAGER_URL, 200, MANAGER_DOC);
    let (service, _) = service(http.clone(), &settings());

    let first = service.discover_manager_node_versions("res4lyf").await;
    let second = service.discover_manager_node_versions("res4lyf").await;

    assert!(first.available);
    assert_eq!(first.latest_version.as_deref(), Some("1.4.0"));
    assert_eq!(first, second);
    assert_eq!(http.request_count(), 1);

    // A different package reuses the cached document.
    let kj = service.discover_manager_node_versions("KJNodes for ComfyUI").await;
    assert_eq!(kj.latest_version.as_deref(), Some("1.1.2"));
    assert_eq!(http.request_count(), 1);
}

#[tokio::test]
async fn test_unavailable_manager_document_is_not_cached() {
    let http = FakeTransport::new();
    http.respond(MANAGER_URL, 503, "busy").respond(MANAGER_URL, 200, MANAGER_DOC);
    let (service, _) = service(http.clone(), &settings());

    let first = service.discover_manager_node_versions("res4lyf").await;
    assert!(!first.available);
    assert!(first.error.is_some());

    let second = service.discover_manager_node_versions("res4lyf").await;
    assert!(second.available);
    assert_eq!(http.request_count(), 2);
}

#[tokio::test]
async fn test_unknown_manager_package() {
    let http = FakeTransport::new();
    http.respond(MANAGER_URL, 200, MANAGER_DOC);
    let (service, _) = service(http, &settings());

    let found = service.discover_manager_node_versions("does-not-exist").await;

    assert!(!found.available);
    assert!(found.all_versions.is_empty());
    assert!(found.error.unwrap().contains("does-not-exist"));
}

#[tokio::test]
async fn test_rejected_github_token_falls_back_to_anonymous() {
    let http = FakeTransport::new();
    http.respond(TAGS_URL, 401, "Bad credentials")
        .respond(TAGS_URL, 200, r#"[{"name": "v0.6.0"}, {"name": "v0.5.2"}]"#);
    http.respond(COMMIT_URL, 200, r#"{"sha": "9c3a5e1f00aa"}"#);
    let mut settings = settings();
    settings.credentials.github_token = Some("expired".into());
    let (service, _) = service(http.clone(), &settings);

    let found = service
        .discover_github_node_versions("https://github.com/Gourieff/ComfyUI-ReActor")
        .await;

    assert!(found.verified);
    assert_eq!(found.tags, vec!["v0.6.0", "v0.5.2"]);
    assert_eq!(found.latest_commit.as_deref(), Some("9c3a5e1f00aa"));
    assert_eq!(
        http.requests(),
        vec![
            (TAGS_URL.to_string(), Some("expired".to_string())),
            (TAGS_URL.to_string(), None),
            (COMMIT_URL.to_string(), None),
        ]
    );
}

#[tokio::test]
async fn test_github_failure_is_retried_on_next_call() {
    let http = FakeTransport::new();
    http.respond(TAGS_URL, 200, "[]");
    http.fail(COMMIT_URL, TransportError::Network("connection reset".into()))
        .respond(COMMIT_URL, 200, r#"{"sha": "abc1234"}"#);
    let (service, _) = service(http.clone(), &settings());
    let url = "https://github.com/Gourieff/ComfyUI-ReActor.git";

    let first = service.discover_github_node_versions(url).await;
    assert!(!first.verified);
    assert!(first.error.unwrap().contains("connection reset"));

    let second = service.discover_github_node_versions(url).await;
    assert!(second.verified);

    let third = service.discover_github_node_versions(url).await;
    assert_eq!(third, second);
    assert_eq!(http.request_count(), 4);
}

#[tokio::test]
async fn test_rate_limited_tag_list_is_not_cached() {
    let http = FakeTransport::new();
    http.respond(TAGS_URL, 403, "API rate limit exceeded")
        .respond(TAGS_URL, 200, r#"[{"name": "v0.6.0"}]"#);
    http.respond(COMMIT_URL, 200, r#"{"sha": "9c3a5e1f00aa"}"#);
    let (service, cache) = service(http.clone(), &settings());
    let url = "https://github.com/Gourieff/ComfyUI-ReActor";

    let first = service.discover_github_node_versions(url).await;
    assert!(!first.verified);
    assert!(first.error.unwrap().contains("HTTP 403"));
    assert!(cache.is_empty());

    let second = service.discover_github_node_versions(url).await;
    assert!(second.verified);
    assert_eq!(second.tags, vec!["v0.6.0"]);
    assert_eq!(http.request_count(), 3);
}

#[tokio::test]
async fn test_tag_list_follows_pages() {
    let first_page: Vec<String> = (0..100)
        .map(|i| format!(r#"{{"name": "v0.0.{}"}}"#, i))
        .collect();
    let second_page_url = format!("{}&page=2", TAGS_URL);
    let http = FakeTransport::new();
    http.respond(TAGS_URL, 200, &format!("[{}]", first_page.join(",")));
    http.respond(&second_page_url, 200, r#"[{"name": "v1.0"}]"#);
    http.respond(COMMIT_URL, 200, r#"{"sha": "9c3a5e1f00aa"}"#);
    let (service, _) = service(http.clone(), &settings());

    let found = service
        .discover_github_node_versions("https://github.com/Gourieff/ComfyUI-ReActor")
        .await;

    assert!(found.verified);
    assert_eq!(found.tags.len(), 101);
    assert_eq!(found.tags.last().map(String::as_str), Some("v1.0"));
    let urls: Vec<String> = http.requests().into_iter().map(|(url, _)| url).collect();
    assert_eq!(
        urls,
        vec![TAGS_URL.to_string(), second_page_url, COMMIT_URL.to_string()]
    );
}

#[tokio::test]
async fn test_unreadable_tag_page_fails_the_listing() {
    let http = FakeTransport::new();
    http.respond(TAGS_URL, 200, "<html>maintenance</html>");
    http.respond(COMMIT_URL, 200, r#"{"sha": "9c3a5e1f00aa"}"#);
    let (service, cache) = service(http.clone(), &settings());

    let found = service
        .discover_github_node_versions("https://github.com/Gourieff/ComfyUI-ReActor")
        .await;

    assert!(!found.verified);
    assert!(found.error.unwrap().contains("unreadable tag list"));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_non_github_url_is_unverified_without_requests() {
    let http = FakeTransport::new();
    let (service, _) = service(http.clone(), &settings());

    let found = service
        .discover_github_node_versions("https://gitlab.com/someone/nodes")
        .await;

    assert!(!found.verified);
    assert_eq!(http.request_count(), 0);
}

#[tokio::test]
async fn test_hub_file_resolves_to_pinned_url() {
    let http = FakeTransport::new();
    http.respond(TREE_URL, 200, TREE);
    let (service, _) = service(http.clone(), &settings());

    let found = service
        .discover_hub_model_version("black-forest-labs/FLUX.1-dev", "ae.safetensors")
        .await;

    assert!(found.verified);
    assert_eq!(found.commit, "f0e1d2c3");
    assert_eq!(found.file_size, 335_304_388);
    assert_eq!(
        found.download_url.as_deref(),
        Some("https://hub.test/black-forest-labs/FLUX.1-dev/resolve/f0e1d2c3/ae.safetensors")
    );

    let again = service
        .discover_hub_model_version("black-forest-labs/FLUX.1-dev", "ae.safetensors")
        .await;
    assert_eq!(again, found);
    assert_eq!(http.request_count(), 1);
}

#[tokio::test]
async fn test_hub_nested_path_lists_its_directory() {
    let nested_url = "https://hub.test/api/models/Comfy-Org/flux_text_encoders/tree/main/split_files/text_encoders";
    let http = FakeTransport::new();
    http.respond(
        nested_url,
        200,
        r#"[{"type": "file", "path": "split_files/text_encoders/clip_l.safetensors", "oid": "77aa", "size": 246144152}]"#,
    );
    let (service, _) = service(http, &settings());

    let found = service
        .discover_hub_model_version(
            "Comfy-Org/flux_text_encoders",
            "split_files/text_encoders/clip_l.safetensors",
        )
        .await;

    assert!(found.verified);
    assert_eq!(found.file_size, 246_144_152);
}

#[tokio::test]
async fn test_concurrent_lookups_share_one_request() {
    let http = FakeTransport::slow(Duration::from_millis(50));
    http.respond(TREE_URL, 200, TREE);
    let (service, _) = service(http.clone(), &settings());

    let (a, b) = join(
        service.discover_hub_model_version("black-forest-labs/FLUX.1-dev", "ae.safetensors"),
        service.discover_hub_model_version("black-forest-labs/FLUX.1-dev", "ae.safetensors"),
    )
    .await;

    assert!(a.verified);
    assert_eq!(a, b);
    assert_eq!(http.request_count(), 1);
}

#[tokio::test]
async fn test_hub_missing_file() {
    let http = FakeTransport::new();
    http.respond(TREE_URL, 200, TREE);
    let (service, _) = service(http, &settings());

    let found = service
        .discover_hub_model_version("black-forest-labs/FLUX.1-dev", "flux1-schnell.safetensors")
        .await;

    assert!(!found.verified);
    assert_eq!(found.commit, "");
    assert_eq!(found.file_size, 0);
    assert_eq!(found.download_url, None);
}

#[tokio::test]
async fn test_discover_all_pins_and_records_errors() {
    let http = FakeTransport::new();
    http.respond(MANAGER_URL, 200, MANAGER_DOC);
    http.respond(TAGS_URL, 200, r#"[{"name": "v0.6.0"}]"#);
    http.respond(COMMIT_URL, 200, r#"{"sha": "9c3a5e1f00aa"}"#);
    http.respond(TREE_URL, 200, TREE);
    let (service, _) = service(http, &settings());

    let mut registry = Registry::new();
    registry
        .nodes
        .insert("RES4LYF".into(), NodeEntry::manager("res4lyf", None));
    registry.nodes.insert(
        "comfyui-reactor".into(),
        NodeEntry::git("https://github.com/Gourieff/ComfyUI-ReActor", None),
    );
    registry.nodes.insert("broken".into(), NodeEntry::git("", None));
    registry.models.insert(
        "ae.safetensors".into(),
        ModelEntry::hub("black-forest-labs/FLUX.1-dev", "ae.safetensors", None, "vae"),
    );
    registry
        .models
        .insert("mystery.ckpt".into(), ModelEntry::unsourced());

    let summary = service.discover_all(&mut registry).await;

    assert_eq!(summary.nodes, 3);
    assert_eq!(summary.nodes_verified, 2);
    assert_eq!(summary.models, 2);
    assert_eq!(summary.models_verified, 1);

    let res4lyf = &registry.nodes["RES4LYF"];
    assert!(res4lyf.verified);
    assert!(matches!(
        &res4lyf.source,
        Some(NodeSource::Manager { expected_version: Some(v), .. }) if v == "1.4.0"
    ));

    let reactor = &registry.nodes["comfyui-reactor"];
    assert!(matches!(
        &reactor.source,
        Some(NodeSource::Git { pinned_ref: Some(r), .. }) if r == "9c3a5e1f00aa"
    ));
    assert_eq!(reactor.available_versions, vec!["v0.6.0"]);

    let broken = &registry.nodes["broken"];
    assert!(!broken.verified);
    assert_eq!(broken.last_error.as_deref(), Some("git source has no repository url"));

    let ae = &registry.models["ae.safetensors"];
    assert!(ae.verified);
    assert!(matches!(
        &ae.source,
        Some(ModelSource::Hub { pinned_commit: Some(c), .. }) if c == "f0e1d2c3"
    ));
    assert_eq!(
        ae.resolved_download_url.as_deref(),
        Some("https://hub.test/black-forest-labs/FLUX.1-dev/resolve/f0e1d2c3/ae.safetensors")
    );

    assert!(!registry.models["mystery.ckpt"].verified);
}

#[tokio::test]
async fn test_discover_all_keeps_existing_pins() {
    let http = FakeTransport::new();
    http.respond(TREE_URL, 200, TREE);
    let (service, _) = service(http, &settings());

    let mut registry = Registry::new();
    registry.models.insert(
        "ae.safetensors".into(),
        ModelEntry::hub("black-forest-labs/FLUX.1-dev", "ae.safetensors", Some("0ld"), "vae"),
    );

    service.discover_all(&mut registry).await;

    assert_eq!(
        registry.models["ae.safetensors"].resolved_download_url.as_deref(),
        Some("https://hub.test/black-forest-labs/FLUX.1-dev/resolve/0ld/ae.safetensors")
    );
}

#[tokio::test]
async fn test_vanished_hub_file_drops_its_download_url() {
    let http = FakeTransport::new();
    http.respond(TREE_URL, 200, TREE);
    let (service, _) = service(http, &settings());

    let mut stale = ModelEntry::hub(
        "black-forest-labs/FLUX.1-dev",
        "flux1-schnell.safetensors",
        Some("0ld"),
        "diffusion_models",
    );
    stale.verified = true;
    stale.resolved_download_url = Some(
        "https://hub.test/black-forest-labs/FLUX.1-dev/resolve/0ld/flux1-schnell.safetensors".into(),
    );
    stale.resolved_file_size = 23_782_506_688;
    let mut registry = Registry::new();
    registry.models.insert("flux1-schnell.safetensors".into(), stale);

    service.discover_all(&mut registry).await;

    let entry = &registry.models["flux1-schnell.safetensors"];
    assert!(!entry.verified);
    assert_eq!(entry.resolved_download_url, None);
    assert_eq!(entry.resolved_file_size, 0);
    assert!(entry.last_error.as_deref().unwrap().contains("not found"));
}
