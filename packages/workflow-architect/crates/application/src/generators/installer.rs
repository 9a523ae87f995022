use super::{shell_escape_double, shell_quote, InstallPlan};
use workflow_manifest::{Registry, Settings, WorkflowDependencySet};

/// An idempotent bash installer: nodes into `custom_nodes`, models into
/// `models/<subdir>`. Re-running it skips everything already present.
pub fn generate_installer(
    registry: &Registry,
    context: Option<&WorkflowDependencySet>,
    settings: &Settings,
) -> String {
    let plan = InstallPlan::build(registry, context, &settings.endpoints.hub_base);
    render(&plan, settings)
}

fn render(plan: &InstallPlan, settings: &Settings) -> String {
    let mut out = String::new();
    let hub_base = settings.endpoints.hub_base.trim_end_matches('/');

    out.push_str("#!/usr/bin/env bash\n");
    out.push_str("# Generated by workflow-architect. Safe to re-run.\n");
    if let Some(title) = &plan.title {
        out.push_str(&format!("# Workflow: {}\n", title.replace('\n', " ")));
    }
    out.push_str("set -euo pipefail\n\n");

    out.push_str(&format!(
        "COMFYUI_DIR=\"${{COMFYUI_DIR:-{}}}\"\n",
        shell_escape_double(&settings.generate.comfyui_dir),
    ));
    out.push_str("CUSTOM_NODES_DIR=\"$COMFYUI_DIR/custom_nodes\"\n");
    out.push_str("MODELS_DIR=\"$COMFYUI_DIR/models\"\n");
    out.push_str(&format!("HUB_BASE={}\n", shell_quote(hub_base)));
    out.push('\n');

    out.push_str(DOWNLOAD_MODEL_FN);
    out.push('\n');
    out.push_str("mkdir -p \"$CUSTOM_NODES_DIR\" \"$MODELS_DIR\"\n");

    if !plan.manager.is_empty() {
        out.push_str("\n# Package-manager nodes\n");
        let specs: Vec<String> = plan.manager.iter().map(|m| shell_quote(&m.spec)).collect();
        out.push_str(&format!(
            "comfy --workspace \"$COMFYUI_DIR\" node install {}\n",
            specs.join(" "),
        ));
    }

    if !plan.git.is_empty() {
        out.push_str("\n# Source-control nodes\n");
    }
    for node in &plan.git {
        let Some(url) = &node.url else {
            out.push_str(&format!(
                "# {}: git source has no repository URL, skipped\n",
                node.package,
            ));
            out.push_str(&format!(
                "echo \"WARNING: {} has no repository URL, skipping\" >&2\n",
                shell_escape_double(&node.package),
            ));
            continue;
        };

        let dir = format!(
            "\"$CUSTOM_NODES_DIR/{}\"",
            shell_escape_double(&node.dir_name)
        );
        out.push_str(&format!("# {}\n", node.package));
        out.push_str(&format!("if [ ! -d {} ]; then\n", dir));
        out.push_str(&format!("    git clone {} {}\n", shell_quote(url), dir));
        out.push_str("fi\n");
        out.push_str(&format!("git -C {} fetch --tags --quiet\n", dir));
        match &node.pinned_ref {
            Some(pin) => {
                out.push_str(&format!("git -C {} checkout --quiet {}\n", dir, shell_quote(pin)));
            }
            None => out.push_str("# no pinned ref, staying on the default branch\n"),
        }
        let requirements = format!(
            "\"$CUSTOM_NODES_DIR/{}/requirements.txt\"",
            shell_escape_double(&node.dir_name)
        );
        out.push_str(&format!("if [ -f {} ]; then\n", requirements));
        out.push_str(&format!("    pip install -r {}\n", requirements));
        out.push_str("fi\n");
    }

    if !plan.unmapped_nodes.is_empty() {
        out.push('\n');
        for node_type in &plan.unmapped_nodes {
            out.push_str(&format!("# {}: no install source in registry\n", node_type));
        }
    }

    if !plan.models.is_empty() {
        out.push_str("\n# Models\n");
    }
    for model in &plan.models {
        let target = format!(
            "\"$MODELS_DIR/{}/{}\"",
            shell_escape_double(&model.subdir),
            shell_escape_double(&model.filename)
        );
        match &model.url {
            Some(url) => {
                out.push_str(&format!("download_model {} {}\n", shell_quote(url), target));
            }
            None => {
                out.push_str(&format!(
                    "echo \"WARNING: no download source for {}, skipping\" >&2\n",
                    shell_escape_double(&model.filename),
                ));
            }
        }
    }

    out.push_str("\necho \"Done.\"\n");
    out
}

const DOWNLOAD_MODEL_FN: &str = r#"download_model() {
    local url="$1"
    local target="$2"
    if [ -f "$target" ]; then
        echo "Already present: $target"
        return 0
    fi
    mkdir -p "$(dirname "$target")"
    echo "Downloading $(basename "$target")"
    if [ -n "${HF_TOKEN:-}" ] && [[ "$url" == "$HUB_BASE"/* ]]; then
        curl -fL --retry 3 -H "Authorization: Bearer $HF_TOKEN" -o "$target.part" "$url"
    else
        curl -fL --retry 3 -o "$target.part" "$url"
    fi
    mv "$target.part" "$target"
}
"#;
