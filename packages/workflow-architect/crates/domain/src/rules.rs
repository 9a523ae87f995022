//! Best-effort pattern tables used by the analyzer and the generators.
//!
//! Every table is ordered data, so rules can be extended without touching
//! the code that consumes them.

use workflow_manifest::WorkflowType;

/// Node types shipped with the graph engine itself. Stored lowercase;
/// lookups are case-insensitive.
pub const BUILTIN_NODE_TYPES: &[&str] = &[
    // Loaders
    "checkpointloader",
    "checkpointloadersimple",
    "unetloader",
    "unclipcheckpointloader",
    "cliploader",
    "dualcliploader",
    "triplecliploader",
    "quadruplecliploader",
    "vaeloader",
    "loraloader",
    "loraloadermodelonly",
    "controlnetloader",
    "diffcontrolnetloader",
    "upscalemodelloader",
    "clipvisionloader",
    "stylemodelloader",
    "gligenloader",
    "hypernetworkloader",
    "photomakerloader",
    "imageonlycheckpointloader",
    // Conditioning
    "cliptextencode",
    "cliptextencodeflux",
    "cliptextencodesdxl",
    "cliptextencodesdxlrefiner",
    "cliptextencodehunyuandit",
    "clipsetlastlayer",
    "clipvisionencode",
    "conditioningaverage",
    "conditioningcombine",
    "conditioningconcat",
    "conditioningsetarea",
    "conditioningsetareapercentage",
    "conditioningsetmask",
    "conditioningsettimesteprange",
    "conditioningzeroout",
    "controlnetapply",
    "controlnetapplyadvanced",
    "fluxguidance",
    "stylemodelapply",
    "unclipconditioning",
    // Sampling
    "ksampler",
    "ksampleradvanced",
    "samplercustom",
    "samplercustomadvanced",
    "ksamplerselect",
    "basicscheduler",
    "basicguider",
    "cfgguider",
    "randomnoise",
    "disablenoise",
    "modelsamplingflux",
    "modelsamplingsd3",
    "modelsamplingdiscrete",
    // Latents
    "emptylatentimage",
    "emptysd3latentimage",
    "emptyhunyuanlatentvideo",
    "latentupscale",
    "latentupscaleby",
    "latentcomposite",
    "latentblend",
    "latentfrombatch",
    "repeatlatentbatch",
    "setlatentnoisemask",
    "vaedecode",
    "vaeencode",
    "vaeencodeforinpaint",
    "vaedecodetiled",
    "vaeencodetiled",
    // Images
    "loadimage",
    "loadimagemask",
    "saveimage",
    "previewimage",
    "saveanimatedwebp",
    "saveanimatedpng",
    "savevideo",
    "createvideo",
    "imagescale",
    "imagescaleby",
    "imagescaletototalpixels",
    "imageupscalewithmodel",
    "imageinvert",
    "imagebatch",
    "imagepadforoutpaint",
    "imagecrop",
    "imageblend",
    "imageblur",
    "imagesharpen",
    "imagecompositemasked",
    "emptyimage",
    // Masks
    "masktoimage",
    "imagetomask",
    "solidmask",
    "invertmask",
    "growmask",
    "featheredmask",
    "cropmask",
    "maskcomposite",
    // Misc
    "note",
    "markdownnote",
    "primitivenode",
    "reroute",
    "modelmergesimple",
];

/// File suffixes recognised as model weights.
pub const MODEL_EXTENSIONS: &[&str] = &[
    "safetensors",
    "ckpt",
    "pt",
    "pth",
    "bin",
    "gguf",
    "sft",
    "onnx",
];

/// Input fields that carry a workflow's output name.
pub const OUTPUT_PREFIX_FIELDS: &[&str] = &["filename_prefix", "output_prefix"];

/// The engine's default prefix. Carries no identity.
pub const DEFAULT_OUTPUT_PREFIX: &str = "ComfyUI";

/// Ordered classification rules. First rule with a matching keyword wins.
pub const WORKFLOW_TYPE_RULES: &[(WorkflowType, &[&str])] = &[
    (
        WorkflowType::FaceSwap,
        &["reactor", "faceswap", "face_swap", "instantid", "pulid", "faceid"],
    ),
    (
        WorkflowType::Video,
        &[
            "video",
            "animatediff",
            "vhs_",
            "wanvideo",
            "img2vid",
            "svd_",
            "ltxv",
            "hunyuanvideo",
        ],
    ),
    (
        WorkflowType::Upscale,
        &["upscale", "esrgan", "supir"],
    ),
    (
        WorkflowType::Image,
        &["ksampler", "sampler", "saveimage", "emptylatentimage"],
    ),
];

/// Filename rules choosing where a downloaded model is copied. A file may
/// land in several directories; an empty match falls back to `checkpoints`.
pub const MODEL_DESTINATION_RULES: &[(&str, &[&str])] = &[
    ("vae", &["vae"]),
    ("lora", &["loras"]),
    ("controlnet", &["controlnet"]),
    ("upscale", &["upscale_models"]),
    ("esrgan", &["upscale_models"]),
    ("clip_vision", &["clip_vision"]),
    ("clip_l", &["text_encoders", "clip"]),
    ("clip_g", &["text_encoders", "clip"]),
    ("t5", &["text_encoders", "clip"]),
    ("umt5", &["text_encoders", "clip"]),
    ("flux", &["diffusion_models", "unet"]),
    ("wan2", &["diffusion_models", "unet"]),
    ("unet", &["diffusion_models", "unet"]),
    ("inswapper", &["insightface"]),
];

pub const FALLBACK_MODEL_DESTINATION: &str = "checkpoints";

/// Subdirectories of the engine's model layout linked from an external volume.
pub const MODEL_CATEGORIES: &[&str] = &[
    "checkpoints",
    "clip",
    "clip_vision",
    "controlnet",
    "diffusion_models",
    "embeddings",
    "insightface",
    "loras",
    "text_encoders",
    "unet",
    "upscale_models",
    "vae",
];

pub fn is_builtin_node(node_type: &str) -> bool {
    BUILTIN_NODE_TYPES
        .iter()
        .any(|builtin| builtin.eq_ignore_ascii_case(node_type))
}

pub fn has_model_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => MODEL_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

/// Keyword match over the concatenated node types of a workflow.
pub fn classify<'a>(node_types: impl IntoIterator<Item = &'a str>) -> WorkflowType {
    let haystack = node_types
        .into_iter()
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join(" ");

    WORKFLOW_TYPE_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(kind, _)| *kind)
        .unwrap_or_default()
}

/// Destination subdirectories for a model file, declared one first.
pub fn model_destinations(filename: &str, declared: Option<&str>) -> Vec<String> {
    let lowered = filename.to_ascii_lowercase();
    let mut destinations: Vec<String> = Vec::new();

    if let Some(dir) = declared.filter(|d| !d.is_empty()) {
        destinations.push(dir.to_string());
    }

    for (pattern, dirs) in MODEL_DESTINATION_RULES {
        if lowered.contains(pattern) {
            for dir in *dirs {
                if !destinations.iter().any(|d| d == dir) {
                    destinations.push(dir.to_string());
                }
            }
            break;
        }
    }

    if destinations.is_empty() {
        destinations.push(FALLBACK_MODEL_DESTINATION.to_string());
    }
    destinations
}
