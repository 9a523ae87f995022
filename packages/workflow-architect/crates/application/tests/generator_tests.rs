use application::generators::{
    generate_dockerfile, generate_installer, generate_modal_app, write_artifacts, DOCKERFILE_FILE,
    INSTALLER_FILE, MODAL_APP_FILE,
};
use domain::analyzer::{analyze_str, build_report};
use domain::curated_registry;
use pretty_assertions::assert_eq;
use workflow_manifest::{Settings, WorkflowDependencySet};

const FLUX_WORKFLOW: &str = r#"{
    "1": { "class_type": "UNETLoader", "inputs": { "unet_name": "flux1-dev.safetensors" } },
    "2": { "class_type": "ClownsharKSampler_Beta", "inputs": { "model": ["1", 0] } },
    "3": { "class_type": "SaveImage", "inputs": { "filename_prefix": "flux/portrait" } }
}"#;

const UNKNOWN_WORKFLOW: &str = r#"{
    "1": { "class_type": "MysteryNode_XL", "inputs": { "weights": "mystery-v3.safetensors" } },
    "2": { "class_type": "SaveImage", "inputs": { "filename_prefix": "mystery" } }
}"#;

fn analyze(json: &str) -> WorkflowDependencySet {
    analyze_str(json, None).unwrap()
}

#[test]
fn test_resolved_workflow_installs_everything_it_needs() {
    let registry = curated_registry();
    let workflow = analyze(FLUX_WORKFLOW);
    let report = build_report(vec![workflow.clone()], &registry);
    assert!(report.missing_from_registry.is_empty());

    let script = generate_installer(&registry, Some(&workflow), &Settings::default());

    let install_lines: Vec<&str> = script.lines().filter(|l| l.contains("node install")).collect();
    assert_eq!(install_lines.len(), 1);
    assert!(install_lines[0].contains("'res4lyf'"));

    let downloads: Vec<&str> = script
        .lines()
        .filter(|l| l.starts_with("download_model "))
        .collect();
    assert_eq!(downloads.len(), 1);
    assert!(downloads[0].ends_with("diffusion_models/flux1-dev.safetensors\""));
    assert!(!script.contains("WARNING"));
}

#[test]
fn test_unknown_dependencies_become_warnings() {
    let registry = curated_registry();
    let workflow = analyze(UNKNOWN_WORKFLOW);

    let script = generate_installer(&registry, Some(&workflow), &Settings::default());

    assert!(!script.contains("node install"));
    assert!(script.contains("# MysteryNode_XL: no install source in registry"));
    assert!(script.contains(
        "echo \"WARNING: no download source for mystery-v3.safetensors, skipping\" >&2"
    ));
    assert!(!script.contains("download_model '"));
}

#[test]
fn test_generators_agree_on_node_installs() {
    let registry = curated_registry();
    let workflow = analyze(FLUX_WORKFLOW);
    let settings = Settings::default();

    let dockerfile = generate_dockerfile(&registry, Some(&workflow), &settings);
    let modal = generate_modal_app(&registry, Some(&workflow), &settings);

    assert!(dockerfile.contains("node install 'res4lyf'"));
    assert!(modal.contains("comfy node install 'res4lyf'"));
    assert!(dockerfile.contains("#   diffusion_models/flux1-dev.safetensors"));
    assert!(modal.contains("\"flux1-dev.safetensors\""));
}

#[test]
fn test_write_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("deploy");

    let written = write_artifacts(&out, &curated_registry(), None, &Settings::default()).unwrap();

    assert_eq!(
        written,
        vec![
            out.join(INSTALLER_FILE),
            out.join(DOCKERFILE_FILE),
            out.join(MODAL_APP_FILE)
        ]
    );
    for path in &written {
        assert!(!std::fs::read_to_string(path).unwrap().is_empty());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(out.join(INSTALLER_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn test_generation_is_deterministic() {
    let registry = curated_registry();
    let settings = Settings::default();

    assert_eq!(
        generate_installer(&registry, None, &settings),
        generate_installer(&registry, None, &settings)
    );
    assert_eq!(
        generate_modal_app(&registry, None, &settings),
        generate_modal_app(&registry, None, &settings)
    );
}
