use super::{shell_quote, InstallPlan, ModelDownload};
use workflow_manifest::{Registry, Settings, WorkflowDependencySet};

/// Engine location inside the serverless image.
const MODAL_COMFYUI_DIR: &str = "/root/comfy/ComfyUI";
const CACHE_VOLUME: &str = "comfyui-model-cache";

/// A Modal app: an image with the engine and nodes, a class that stages
/// models and runs the engine server, and a small web front.
pub fn generate_modal_app(
    registry: &Registry,
    context: Option<&WorkflowDependencySet>,
    settings: &Settings,
) -> String {
    let plan = InstallPlan::build(registry, context, &settings.endpoints.hub_base);
    let generate = &settings.generate;
    let mut out = String::new();

    out.push_str("# Generated by workflow-architect.\n");
    if let Some(title) = &plan.title {
        out.push_str(&format!("# Workflow: {}\n", title.replace('\n', " ")));
    }
    out.push_str(PY_IMPORTS);

    out.push_str(&format!("APP_NAME = {}\n", py_str(&generate.modal_app_name)));
    out.push_str(&format!("COMFYUI_DIR = {}\n", py_str(MODAL_COMFYUI_DIR)));
    out.push_str("CACHE_DIR = \"/cache\"\n");
    out.push_str("PORT = 8188\n\n");

    out.push_str("image = (\n");
    out.push_str("    modal.Image.debian_slim(python_version=\"3.11\")\n");
    out.push_str("    .apt_install(\"git\", \"wget\", \"curl\", \"libgl1\", \"libglib2.0-0\")\n");
    out.push_str("    .pip_install(\"comfy-cli\", \"huggingface_hub[hf_transfer]\", \"fastapi[standard]\")\n");
    out.push_str("    .run_commands(\"comfy --skip-prompt install --fast-deps --nvidia\")\n");
    if !plan.manager.is_empty() {
        let specs: Vec<String> = plan.manager.iter().map(|m| shell_quote(&m.spec)).collect();
        let command = format!("comfy node install {}", specs.join(" "));
        out.push_str(&format!("    .run_commands({})\n", py_str(&command)));
    }
    for node in &plan.git {
        match &node.url {
            Some(url) => {
                let dir = shell_quote(&format!(
                    "{}/custom_nodes/{}",
                    MODAL_COMFYUI_DIR, node.dir_name
                ));
                let mut command = format!(
                    "git clone {} {} && cd {} && git fetch --tags --quiet",
                    shell_quote(url),
                    dir,
                    dir
                );
                if let Some(pin) = &node.pinned_ref {
                    command.push_str(&format!(" && git checkout --quiet {}", shell_quote(pin)));
                }
                command.push_str(
                    " && (if [ -f requirements.txt ]; then pip install -r requirements.txt; fi)",
                );
                out.push_str(&format!("    .run_commands({})\n", py_str(&command)));
            }
            None => {
                out.push_str(&format!(
                    "    # {}: git source has no repository URL, skipped\n",
                    node.package,
                ));
            }
        }
    }
    for node_type in &plan.unmapped_nodes {
        out.push_str(&format!("    # {}: no install source in registry\n", node_type));
    }
    out.push_str("    .env({\"HF_HUB_ENABLE_HF_TRANSFER\": \"1\"})\n");
    out.push_str(")\n\n");

    out.push_str("app = modal.App(APP_NAME, image=image)\n");
    out.push_str(&format!(
        "cache_volume = modal.Volume.from_name({}, create_if_missing=True)\n\n",
        py_str(CACHE_VOLUME),
    ));

    write_model_tables(&mut out, &plan.models);

    let packages: Vec<&str> = plan
        .manager
        .iter()
        .map(|m| m.package.as_str())
        .chain(plan.git.iter().map(|g| g.package.as_str()))
        .collect();
    out.push_str(&format!("NODE_PACKAGES = {}\n\n", py_list(&packages)));

    out.push_str(PY_DOWNLOAD_MODELS);
    out.push('\n');

    out.push_str(&format!(
        "@app.cls(gpu={}, volumes={{CACHE_DIR: cache_volume}}, timeout=3600, scaledown_window=300)\n",
        py_str(&generate.modal_gpu),
    ));
    out.push_str(PY_CLASS);
    out.push('\n');
    out.push_str(PY_WEB);
    out
}

fn write_model_tables(out: &mut String, models: &[ModelDownload]) {
    out.push_str("# (filename, repo, file_path, revision, destinations)\n");
    out.push_str("HUB_MODELS = [\n");
    for model in models {
        if let Some(hub) = &model.hub {
            out.push_str(&format!(
                "    ({}, {}, {}, {}, {}),\n",
                py_str(&model.filename),
                py_str(&hub.repo),
                py_str(&hub.file_path),
                py_str(&hub.revision),
                py_list(&model.destinations),
            ));
        }
    }
    out.push_str("]\n\n");

    out.push_str("# (filename, url, destinations)\n");
    out.push_str("URL_MODELS = [\n");
    for model in models.iter().filter(|m| m.hub.is_none()) {
        match &model.url {
            Some(url) => {
                out.push_str(&format!(
                    "    ({}, {}, {}),\n",
                    py_str(&model.filename),
                    py_str(url),
                    py_list(&model.destinations),
                ));
            }
            None => {
                out.push_str(&format!("    # WARNING: no download source for {}\n", model.filename));
            }
        }
    }
    out.push_str("]\n\n");
}

/// A Python string literal. JSON string escapes are valid Python.
fn py_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn py_list<S: AsRef<str>>(values: &[S]) -> String {
    let items: Vec<String> = values.iter().map(|v| py_str(v.as_ref())).collect();
    format!("[{}]", items.join(", "))
}

const PY_IMPORTS: &str = r#"import json
import os
import shutil
import subprocess
import time
import urllib.request
import uuid

import modal

"#;

const PY_DOWNLOAD_MODELS: &str = r#"def place_model(source, filename, destinations):
    for subdir in destinations:
        target_dir = os.path.join(COMFYUI_DIR, "models", subdir)
        os.makedirs(target_dir, exist_ok=True)
        target = os.path.join(target_dir, filename)
        if not os.path.exists(target):
            shutil.copy2(source, target)


def download_models():
    from huggingface_hub import hf_hub_download

    token = os.environ.get("HF_TOKEN") or None
    for filename, repo, file_path, revision, destinations in HUB_MODELS:
        cached = hf_hub_download(
            repo_id=repo,
            filename=file_path,
            revision=revision,
            cache_dir=CACHE_DIR,
            token=token,
        )
        place_model(cached, filename, destinations)

    for filename, url, destinations in URL_MODELS:
        cached = os.path.join(CACHE_DIR, "direct", filename)
        if not os.path.exists(cached):
            os.makedirs(os.path.dirname(cached), exist_ok=True)
            urllib.request.urlretrieve(url, cached + ".part")
            os.replace(cached + ".part", cached)
        place_model(cached, filename, destinations)
"#;

const PY_CLASS: &str = r#"class ComfyUI:
    @modal.enter()
    def start(self):
        download_models()
        cache_volume.commit()

        listen = ["--listen", "127.0.0.1", "--port", str(PORT)]
        self.process = subprocess.Popen(["comfy", "--workspace", COMFYUI_DIR, "launch", "--"] + listen)
        time.sleep(5)
        if self.process.poll() is not None:
            print("comfy launch exited early, starting main.py directly")
            self.process = subprocess.Popen(["python", "main.py"] + listen, cwd=COMFYUI_DIR)

        self.wait_for_server()

    def wait_for_server(self, timeout=600):
        deadline = time.time() + timeout
        while time.time() < deadline:
            try:
                with urllib.request.urlopen(f"http://127.0.0.1:{PORT}/system_stats", timeout=5) as response:
                    if response.status == 200:
                        return
            except Exception:
                pass
            time.sleep(2)
        raise RuntimeError(f"server not healthy after {timeout}s")

    @modal.method()
    def execute(self, workflow: dict, timeout: int = 900) -> dict:
        payload = json.dumps({"prompt": workflow, "client_id": str(uuid.uuid4())}).encode()
        request = urllib.request.Request(
            f"http://127.0.0.1:{PORT}/prompt",
            data=payload,
            headers={"Content-Type": "application/json"},
        )
        with urllib.request.urlopen(request) as response:
            prompt_id = json.loads(response.read())["prompt_id"]

        deadline = time.time() + timeout
        while time.time() < deadline:
            with urllib.request.urlopen(f"http://127.0.0.1:{PORT}/history/{prompt_id}") as response:
                history = json.loads(response.read())
            if prompt_id in history:
                return {"prompt_id": prompt_id, "outputs": history[prompt_id].get("outputs", {})}
            time.sleep(1)
        raise TimeoutError(f"prompt {prompt_id} did not finish within {timeout}s")
"#;

const PY_WEB: &str = r#"@app.function()
@modal.asgi_app()
def web():
    from fastapi import FastAPI, HTTPException

    api = FastAPI(title=APP_NAME)

    @api.get("/")
    def root():
        return {"app": APP_NAME, "endpoints": ["/health", "/debug", "/execute"]}

    @api.get("/health")
    def health():
        return {"status": "ok"}

    @api.get("/debug")
    def debug():
        return {
            "node_packages": NODE_PACKAGES,
            "hub_models": [m[0] for m in HUB_MODELS],
            "url_models": [m[0] for m in URL_MODELS],
        }

    @api.post("/execute")
    def execute(body: dict):
        workflow = body.get("workflow") or body.get("prompt")
        if not isinstance(workflow, dict):
            raise HTTPException(status_code=400, detail="body must carry a workflow object")
        return ComfyUI().execute.remote(workflow)

    return api
"#;
