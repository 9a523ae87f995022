use super::{shell_quote, InstallPlan};
use domain::rules::MODEL_CATEGORIES;
use workflow_manifest::{Registry, Settings, WorkflowDependencySet};

/// Install location of the engine inside the worker base image.
pub const IMAGE_COMFYUI_DIR: &str = "/comfyui";

/// Where the start-up script looks for an engine install, in order.
pub const ENGINE_DIR_CANDIDATES: &[&str] = &["/comfyui", "/workspace/ComfyUI", "/ComfyUI", "/opt/ComfyUI"];

/// Where the start-up script looks for a mounted model volume, in order.
pub const MODEL_VOLUME_CANDIDATES: &[&str] = &[
    "/runpod-volume/models",
    "/runpod-volume/ComfyUI/models",
    "/workspace/models",
    "/models",
];

const LINK_SCRIPT: &str = "/usr/local/bin/link-models.sh";
const ENTRYPOINT_SCRIPT: &str = "/usr/local/bin/entrypoint-wrapper.sh";
const DOWNLOAD_SCRIPT: &str = "/usr/local/bin/download-model.sh";

/// A worker image: same node installs as the shell installer, models linked
/// from a volume at start-up unless baking is enabled.
pub fn generate_dockerfile(
    registry: &Registry,
    context: Option<&WorkflowDependencySet>,
    settings: &Settings,
) -> String {
    let plan = InstallPlan::build(registry, context, &settings.endpoints.hub_base);
    let mut out = String::new();
    let nodes_dir = format!("{}/custom_nodes", IMAGE_COMFYUI_DIR);
    let models_dir = format!("{}/models", IMAGE_COMFYUI_DIR);

    out.push_str("# syntax=docker/dockerfile:1.4\n");
    out.push_str("# Generated by workflow-architect.\n");
    if let Some(title) = &plan.title {
        out.push_str(&format!("# Workflow: {}\n", title.replace('\n', " ")));
    }
    out.push_str(&format!("FROM {}\n\n", settings.generate.docker_base_image));

    if !plan.manager.is_empty() {
        let specs: Vec<String> = plan.manager.iter().map(|m| shell_quote(&m.spec)).collect();
        out.push_str(&format!(
            "RUN comfy --workspace {} node install {}\n\n",
            IMAGE_COMFYUI_DIR,
            specs.join(" "),
        ));
    }

    for node in &plan.git {
        let Some(url) = &node.url else {
            out.push_str(&format!(
                "# {}: git source has no repository URL, skipped\n\n",
                node.package,
            ));
            continue;
        };
        let dir = shell_quote(&format!("{}/{}", nodes_dir, node.dir_name));
        out.push_str(&format!("# {}\n", node.package));
        out.push_str(&format!("RUN git clone {} {} \\\n", shell_quote(url), dir));
        out.push_str(&format!("    && cd {} \\\n", dir));
        out.push_str("    && git fetch --tags --quiet \\\n");
        if let Some(pin) = &node.pinned_ref {
            out.push_str(&format!("    && git checkout --quiet {} \\\n", shell_quote(pin)));
        }
        out.push_str(
            "    && if [ -f requirements.txt ]; then pip install --no-cache-dir -r requirements.txt; fi\n\n",
        );
    }

    for node_type in &plan.unmapped_nodes {
        out.push_str(&format!("# {}: no install source in registry\n", node_type));
    }
    if !plan.unmapped_nodes.is_empty() {
        out.push('\n');
    }

    if settings.generate.bake_models && !plan.models.is_empty() {
        let hub_base = settings.endpoints.hub_base.trim_end_matches('/');
        out.push_str(&format!("COPY --chmod=755 <<'EOF' {}\n", DOWNLOAD_SCRIPT));
        out.push_str(&download_script(hub_base));
        out.push_str("EOF\n\n");
        for model in &plan.models {
            let target = shell_quote(&format!("{}/{}/{}", models_dir, model.subdir, model.filename));
            match &model.url {
                // Only hub downloads get the token secret mounted.
                Some(url) if url.starts_with(&format!("{}/", hub_base)) => {
                    out.push_str(&format!(
                        "RUN --mount=type=secret,id=hf_token {} {} {}\n",
                        DOWNLOAD_SCRIPT,
                        shell_quote(url),
                        target,
                    ));
                }
                Some(url) => {
                    out.push_str(&format!("RUN {} {} {}\n", DOWNLOAD_SCRIPT, shell_quote(url), target));
                }
                None => {
                    out.push_str(&format!("# WARNING: no download source for {}\n", model.filename));
                }
            }
        }
        out.push('\n');
    } else if !plan.models.is_empty() {
        out.push_str("# Models are linked from a mounted volume at start-up:\n");
        for model in &plan.models {
            out.push_str(&format!("#   {}/{}\n", model.subdir, model.filename));
        }
        out.push('\n');
    }

    out.push_str(&format!("COPY --chmod=755 <<'EOF' {}\n", LINK_SCRIPT));
    out.push_str(&link_models_script());
    out.push_str("EOF\n\n");

    out.push_str(&format!("COPY --chmod=755 <<'EOF' {}\n", ENTRYPOINT_SCRIPT));
    out.push_str("#!/usr/bin/env bash\n");
    out.push_str("set -e\n");
    out.push_str(&format!(
        "{} || echo \"link-models: failed, continuing\" >&2\n",
        LINK_SCRIPT,
    ));
    out.push_str("exec \"$@\"\n");
    out.push_str("EOF\n\n");

    out.push_str(&format!("ENTRYPOINT [\"{}\"]\n", ENTRYPOINT_SCRIPT));
    out.push_str("CMD [\"/start.sh\"]\n");
    out
}

/// Finds the engine and a model volume, then links each known model category
/// into the engine's layout. Existing targets are left alone.
fn link_models_script() -> String {
    let mut script = String::new();
    script.push_str("#!/usr/bin/env bash\n");
    script.push_str("set -euo pipefail\n\n");

    script.push_str("COMFY_ROOT=\"\"\n");
    script.push_str(&format!("for candidate in {}; do\n", ENGINE_DIR_CANDIDATES.join(" ")));
    script.push_str("    if [ -d \"$candidate\" ]; then COMFY_ROOT=\"$candidate\"; break; fi\n");
    script.push_str("done\n");
    script.push_str("if [ -z \"$COMFY_ROOT\" ]; then\n");
    script.push_str("    echo \"link-models: no engine install found\" >&2\n");
    script.push_str("    exit 0\n");
    script.push_str("fi\n\n");

    script.push_str("VOLUME_MODELS=\"\"\n");
    script.push_str(&format!("for candidate in {}; do\n", MODEL_VOLUME_CANDIDATES.join(" ")));
    script.push_str("    if [ -d \"$candidate\" ]; then VOLUME_MODELS=\"$candidate\"; break; fi\n");
    script.push_str("done\n");
    script.push_str("if [ -z \"$VOLUME_MODELS\" ]; then\n");
    script.push_str("    echo \"link-models: no model volume mounted\" >&2\n");
    script.push_str("    exit 0\n");
    script.push_str("fi\n\n");

    script.push_str("mkdir -p \"$COMFY_ROOT/models\"\n");
    script.push_str(&format!("for category in {}; do\n", MODEL_CATEGORIES.join(" ")));
    script.push_str(LINK_CATEGORY_BODY);
    script.push_str("done\n");
    script.push_str("echo \"link-models: linked $VOLUME_MODELS into $COMFY_ROOT/models\"\n");
    script
}

const LINK_CATEGORY_BODY: &str = r#"    source_dir="$VOLUME_MODELS/$category"
    target="$COMFY_ROOT/models/$category"
    [ -d "$source_dir" ] || continue
    if [ ! -e "$target" ] && [ ! -L "$target" ]; then
        ln -s "$source_dir" "$target"
        continue
    fi
    [ -d "$target" ] || continue
    for file in "$source_dir"/*; do
        [ -e "$file" ] || continue
        name="$(basename "$file")"
        if [ ! -e "$target/$name" ] && [ ! -L "$target/$name" ]; then
            ln -s "$file" "$target/$name"
        fi
    done
"#;

/// Build-time downloader. The token is sent only to URLs under the hub base.
fn download_script(hub_base: &str) -> String {
    let mut script = String::new();
    script.push_str("#!/usr/bin/env bash\n");
    script.push_str("set -euo pipefail\n");
    script.push_str(&format!("hub_base={}\n", shell_quote(hub_base)));
    script.push_str(DOWNLOAD_SCRIPT_BODY);
    script
}

const DOWNLOAD_SCRIPT_BODY: &str = r#"url="$1"
target="$2"
if [ -f "$target" ]; then exit 0; fi
mkdir -p "$(dirname "$target")"
if [ -f /run/secrets/hf_token ] && [[ "$url" == "$hub_base"/* ]]; then
    curl -fL --retry 3 -H "Authorization: Bearer $(cat /run/secrets/hf_token)" -o "$target" "$url"
else
    curl -fL --retry 3 -o "$target" "$url"
fi
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_manifest::{ModelEntry, NodeEntry};

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .nodes
            .insert("comfyui-kjnodes".into(), NodeEntry::manager("comfyui-kjnodes", None));
        registry.models.insert(
            "ae.safetensors".into(),
            ModelEntry::hub("black-forest-labs/FLUX.1-dev", "ae.safetensors", Some("abc"), "vae"),
        );
        registry
    }

    #[test]
    fn test_layout_and_entrypoint() {
        let dockerfile = generate_dockerfile(&registry(), None, &Settings::default());

        assert!(dockerfile.starts_with("# syntax=docker/dockerfile:1.4\n"));
        assert!(dockerfile.contains("FROM runpod/worker-comfyui:5.5.1-base"));
        assert!(dockerfile.contains("RUN comfy --workspace /comfyui node install 'comfyui-kjnodes'"));
        assert!(dockerfile.contains("for candidate in /runpod-volume/models"));
        assert!(dockerfile.contains("ln -s \"$source_dir\" \"$target\""));
        assert!(dockerfile.contains("exec \"$@\""));
        assert!(dockerfile.contains("ENTRYPOINT [\"/usr/local/bin/entrypoint-wrapper.sh\"]"));
        assert!(dockerfile.trim_end().ends_with("CMD [\"/start.sh\"]"));
    }

    #[test]
    fn test_models_are_not_baked_by_default() {
        let dockerfile = generate_dockerfile(&registry(), None, &Settings::default());
        assert!(!dockerfile.contains("download-model.sh"));
        assert!(dockerfile.contains("#   vae/ae.safetensors"));
    }

    #[test]
    fn test_baked_models_use_secret_mount() {
        let mut settings = Settings::default();
        settings.generate.bake_models = true;

        let dockerfile = generate_dockerfile(&registry(), None, &settings);

        assert!(dockerfile.contains(
            "RUN --mount=type=secret,id=hf_token /usr/local/bin/download-model.sh \
             'https://huggingface.co/black-forest-labs/FLUX.1-dev/resolve/abc/ae.safetensors' \
             '/comfyui/models/vae/ae.safetensors'"
        ));
    }

    #[test]
    fn test_direct_downloads_never_see_the_hub_token() {
        let mut settings = Settings::default();
        settings.generate.bake_models = true;
        let mut registry = registry();
        registry.models.insert(
            "4x-UltraSharp.pth".into(),
            ModelEntry::direct_url("https://example.com/4x-UltraSharp.pth", "upscale_models"),
        );

        let dockerfile = generate_dockerfile(&registry, None, &settings);

        assert!(dockerfile.contains(
            "RUN /usr/local/bin/download-model.sh 'https://example.com/4x-UltraSharp.pth' \
             '/comfyui/models/upscale_models/4x-UltraSharp.pth'"
        ));
        let direct_line = dockerfile
            .lines()
            .find(|line| line.contains("example.com"))
            .unwrap();
        assert!(!direct_line.contains("hf_token"));
        assert!(dockerfile.contains("hub_base='https://huggingface.co'"));
        assert!(dockerfile.contains(r#"[[ "$url" == "$hub_base"/* ]]"#));
    }
}
