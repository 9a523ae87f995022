use serde_json::{Map, Value};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Invalid graph format: {0}")]
    InvalidGraphFormat(String),
    #[error("Failed to parse workflow JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One node of a workflow graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub class_type: String,
    pub inputs: Map<String, Value>,
}

/// A workflow graph in the engine's API format: node id -> `{class_type, inputs}`.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowGraph {
    /// Nodes ordered by numeric id where ids are numeric.
    pub nodes: Vec<GraphNode>,
    /// The graph value as parsed, used for content hashing.
    pub raw: Value,
}

/// Keys under which a graph may be wrapped.
const WRAPPER_KEYS: &[&str] = &["workflow", "prompt"];

impl WorkflowGraph {
    pub fn parse_str(content: &str) -> Result<Self, AnalyzeError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value)
    }

    /// Accepts a direct graph mapping or a `{workflow: <graph>}` wrapper.
    pub fn from_value(value: Value) -> Result<Self, AnalyzeError> {
        let Value::Object(map) = value else {
            return Err(AnalyzeError::InvalidGraphFormat(
                "expected a JSON object of nodes".to_string(),
            ));
        };

        if is_direct_graph(&map) {
            return Ok(Self::from_map(map));
        }

        for key in WRAPPER_KEYS {
            if let Some(Value::Object(inner)) = map.get(*key) {
                if is_direct_graph(inner) {
                    return Ok(Self::from_map(inner.clone()));
                }
            }
        }

        Err(AnalyzeError::InvalidGraphFormat(
            "neither a node mapping nor a {workflow: ...} wrapper".to_string(),
        ))
    }

    fn from_map(map: Map<String, Value>) -> Self {
        let mut nodes: Vec<GraphNode> = map
            .iter()
            .filter_map(|(id, node)| {
                let class_type = node.get("class_type")?.as_str()?.to_string();
                let inputs = node
                    .get("inputs")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                Some(GraphNode {
                    id: id.clone(),
                    class_type,
                    inputs,
                })
            })
            .collect();

        nodes.sort_by(|a, b| compare_node_ids(&a.id, &b.id));

        Self {
            nodes,
            raw: Value::Object(map),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A mapping is a graph when it is empty or at least one value has a `class_type`.
fn is_direct_graph(map: &Map<String, Value>) -> bool {
    map.is_empty()
        || map
            .values()
            .any(|v| v.get("class_type").and_then(Value::as_str).is_some())
}

fn compare_node_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
