//! Pattern-based extraction for files that are not an API-format graph,
//! such as UI exports or truncated documents.

use super::{content_hash, is_meaningful_prefix, model_filenames, push_unique, WorkflowIdentity};
use crate::rules;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use workflow_manifest::WorkflowDependencySet;

struct TextPatterns {
    class_type: Regex,
    ui_node_type: Regex,
    prefix: Regex,
}

fn patterns() -> &'static TextPatterns {
    static PATTERNS: OnceLock<TextPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| TextPatterns {
        class_type: Regex::new(r#""class_type"\s*:\s*"([^"]+)""#).expect("valid pattern"),
        ui_node_type: Regex::new(r#"\{\s*"id"\s*:\s*\d+\s*,\s*"type"\s*:\s*"([^"]+)""#)
            .expect("valid pattern"),
        prefix: Regex::new(r#""(?:filename_prefix|output_prefix)"\s*:\s*"([^"]+)""#)
            .expect("valid pattern"),
    })
}

/// Analyzes arbitrary text by pattern matching. Never fails; unknown shapes
/// simply yield fewer dependencies.
pub fn analyze_text(content: &str, source: Option<&Path>) -> WorkflowDependencySet {
    let patterns = patterns();
    let mut all_types = Vec::new();

    for regex in [&patterns.class_type, &patterns.ui_node_type] {
        for caps in regex.captures_iter(content) {
            if let Some(m) = caps.get(1) {
                push_unique(&mut all_types, m.as_str());
            }
        }
    }

    let mut models = Vec::new();
    for model in model_filenames(content) {
        push_unique(&mut models, &model);
    }

    let prefix = patterns
        .prefix
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|p| is_meaningful_prefix(p));

    let hash = (!content.trim().is_empty()).then(|| content_hash(content));
    let identity = WorkflowIdentity::derive(prefix, hash.as_deref(), source);
    let workflow_type = rules::classify(all_types.iter().map(String::as_str));

    WorkflowDependencySet {
        id: identity.id,
        display_name: identity.display_name,
        source_location: source.map(|p| p.display().to_string()),
        workflow_type,
        node_types: all_types
            .into_iter()
            .filter(|t| !rules::is_builtin_node(t))
            .collect(),
        models,
    }
}
