//! Hand-curated pins. Discovery and user-supplied registries are layered on
//! top with [`Registry::merge`].

use workflow_manifest::{ModelEntry, NodeEntry, Registry};

/// Node type -> package name.
const NODE_TYPES: &[(&str, &str)] = &[
    ("ClownsharKSampler_Beta", "RES4LYF"),
    ("ClownsharkChainsampler_Beta", "RES4LYF"),
    ("VHS_VideoCombine", "comfyui-videohelpersuite"),
    ("VHS_LoadVideo", "comfyui-videohelpersuite"),
    ("ReActorFaceSwap", "comfyui-reactor"),
    ("ReActorRestoreFace", "comfyui-reactor"),
    ("UltimateSDUpscale", "comfyui_ultimatesdupscale"),
    ("ImageResizeKJ", "comfyui-kjnodes"),
    ("WanVideoSampler", "ComfyUI-WanVideoWrapper"),
    ("WanVideoModelLoader", "ComfyUI-WanVideoWrapper"),
];

enum SeedNode {
    Manager(&'static str),
    Git(&'static str),
}

const NODES: &[(&str, SeedNode)] = &[
    ("RES4LYF", SeedNode::Manager("res4lyf")),
    (
        "comfyui-videohelpersuite",
        SeedNode::Manager("comfyui-videohelpersuite"),
    ),
    (
        "comfyui-reactor",
        SeedNode::Git("https://github.com/Gourieff/ComfyUI-ReActor"),
    ),
    (
        "comfyui_ultimatesdupscale",
        SeedNode::Manager("comfyui_ultimatesdupscale"),
    ),
    ("comfyui-kjnodes", SeedNode::Manager("comfyui-kjnodes")),
    (
        "ComfyUI-WanVideoWrapper",
        SeedNode::Git("https://github.com/kijai/ComfyUI-WanVideoWrapper"),
    ),
];

enum SeedModel {
    Hub {
        repo: &'static str,
        path: &'static str,
        subdir: &'static str,
    },
    Direct {
        url: &'static str,
        subdir: &'static str,
    },
}

const MODELS: &[(&str, SeedModel)] = &[
    (
        "flux1-dev.safetensors",
        SeedModel::Hub {
            repo: "black-forest-labs/FLUX.1-dev",
            path: "flux1-dev.safetensors",
            subdir: "diffusion_models",
        },
    ),
    (
        "ae.safetensors",
        SeedModel::Hub {
            repo: "black-forest-labs/FLUX.1-dev",
            path: "ae.safetensors",
            subdir: "vae",
        },
    ),
    (
        "clip_l.safetensors",
        SeedModel::Hub {
            repo: "comfyanonymous/flux_text_encoders",
            path: "clip_l.safetensors",
            subdir: "text_encoders",
        },
    ),
    (
        "t5xxl_fp16.safetensors",
        SeedModel::Hub {
            repo: "comfyanonymous/flux_text_encoders",
            path: "t5xxl_fp16.safetensors",
            subdir: "text_encoders",
        },
    ),
    (
        "4x-UltraSharp.pth",
        SeedModel::Direct {
            url: "https://huggingface.co/lokCX/4x-Ultrasharp/resolve/main/4x-UltraSharp.pth",
            subdir: "upscale_models",
        },
    ),
    (
        "inswapper_128.onnx",
        SeedModel::Direct {
            url: "https://github.com/facefusion/facefusion-assets/releases/download/models/inswapper_128.onnx",
            subdir: "insightface",
        },
    ),
];

/// The built-in registry every run starts from.
pub fn curated_registry() -> Registry {
    let mut registry = Registry::new();

    for (node_type, package) in NODE_TYPES {
        registry
            .node_types
            .insert(node_type.to_string(), package.to_string());
    }

    for (package, source) in NODES {
        let entry = match source {
            SeedNode::Manager(name) => NodeEntry::manager(*name, None),
            SeedNode::Git(url) => NodeEntry::git(*url, None),
        };
        registry.nodes.insert(package.to_string(), entry);
    }

    for (filename, source) in MODELS {
        let entry = match source {
            SeedModel::Hub { repo, path, subdir } => ModelEntry::hub(*repo, *path, None, *subdir),
            SeedModel::Direct { url, subdir } => ModelEntry::direct_url(*url, *subdir),
        };
        registry.models.insert(filename.to_string(), entry);
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mapping_has_an_entry() {
        let registry = curated_registry();
        for node_type in registry.node_types.keys() {
            assert!(
                registry.package_for_node_type(node_type).is_some(),
                "{} maps to a package without an entry",
                node_type
            );
        }
    }

    #[test]
    fn test_direct_links_start_verified() {
        let registry = curated_registry();
        assert!(registry.models["4x-UltraSharp.pth"].verified);
        assert!(!registry.models["flux1-dev.safetensors"].verified);
    }
}
