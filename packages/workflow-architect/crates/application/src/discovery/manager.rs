use super::{describe_status, DiscoveryService, Fetched};
use domain::ports::cache::cache_key;
use serde_json::{Map, Value};
use tracing::warn;
use workflow_manifest::{ManagerPackage, ManagerVersions};

impl DiscoveryService {
    /// Looks a package up in the package-manager registry, by exact `package`
    /// field first and exact `name` second.
    pub async fn discover_manager_node_versions(&self, package_name: &str) -> ManagerVersions {
        let key = cache_key("manager", &[package_name]);
        self.cached(&key, || async move {
            let packages = self.manager_document().await;
            if packages.is_empty() {
                return Fetched::Transient(ManagerVersions::unavailable(
                    "package registry document is empty or unavailable",
                ));
            }
            Fetched::Cacheable(find_package(&packages, package_name))
        })
        .await
    }

    /// The whole registry document, normalized. Empty when unavailable.
    async fn manager_document(&self) -> Vec<ManagerPackage> {
        let url = self.endpoints.manager_registry_url.clone();
        let key = cache_key("manager-registry", &[&url]);
        self.cached(&key, || async move {
            let response = match self.http.get(&url, None).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Package registry unreachable: {}", e);
                    return Fetched::Transient(Vec::new());
                }
            };
            if !response.is_success() {
                warn!("Package registry returned {}", describe_status(&response));
                return Fetched::Transient(Vec::new());
            }

            match serde_json::from_str::<Value>(&response.body) {
                Ok(document) => {
                    let packages = normalize_manager_document(&document);
                    if packages.is_empty() {
                        warn!("Package registry document contains no packages");
                        Fetched::Transient(packages)
                    } else {
                        Fetched::Cacheable(packages)
                    }
                }
                Err(e) => {
                    warn!("Package registry document is malformed: {}", e);
                    Fetched::Transient(Vec::new())
                }
            }
        })
        .await
    }
}

fn find_package(packages: &[ManagerPackage], package_name: &str) -> ManagerVersions {
    let found = packages
        .iter()
        .find(|p| p.package == package_name)
        .or_else(|| packages.iter().find(|p| p.name == package_name));

    match found {
        Some(package) => {
            let mut all_versions = package.versions.clone();
            if all_versions.is_empty() {
                all_versions.extend(package.version.clone());
            }
            ManagerVersions {
                available: true,
                latest_version: package
                    .version
                    .clone()
                    .or_else(|| package.versions.last().cloned()),
                all_versions,
                error: None,
            }
        }
        None => ManagerVersions::unavailable(format!(
            "package '{}' not found in registry",
            package_name
        )),
    }
}

/// Accepts a list of entries, an object keyed by package id, or either of
/// those under a `custom_nodes` key.
pub fn normalize_manager_document(document: &Value) -> Vec<ManagerPackage> {
    match document {
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| entry.as_object().and_then(|o| normalize_entry(o, None)))
            .collect(),
        Value::Object(map) => {
            if let Some(inner) = map.get("custom_nodes") {
                return normalize_manager_document(inner);
            }
            map.iter()
                .filter_map(|(id, entry)| {
                    entry
                        .as_object()
                        .and_then(|o| normalize_entry(o, Some(id.as_str())))
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

fn normalize_entry(entry: &Map<String, Value>, id: Option<&str>) -> Option<ManagerPackage> {
    let text = |field: &str| {
        entry
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    };

    let package = text("package")
        .or_else(|| text("id"))
        .or_else(|| id.map(str::to_string))
        .unwrap_or_default();
    let name = text("name").or_else(|| text("title")).unwrap_or_default();
    if package.is_empty() && name.is_empty() {
        return None;
    }

    let version = entry.get("version").and_then(version_string);
    let versions = entry
        .get("versions")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(version_string).collect())
        .unwrap_or_default();

    Some(ManagerPackage {
        package,
        name,
        version,
        versions,
    })
}

fn version_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_and_keyed_object_normalize_alike() {
        let array = json!([
            { "package": "res4lyf", "name": "RES4LYF", "version": "1.2.0", "versions": ["1.0.0", "1.2.0"] }
        ]);
        let keyed = json!({
            "res4lyf": { "name": "RES4LYF", "version": "1.2.0", "versions": ["1.0.0", "1.2.0"] }
        });

        assert_eq!(
            normalize_manager_document(&array),
            normalize_manager_document(&keyed)
        );
    }

    #[test]
    fn test_custom_nodes_wrapper() {
        let doc = json!({ "custom_nodes": [ { "id": "comfyui-kjnodes", "title": "KJNodes" } ] });
        let packages = normalize_manager_document(&doc);
        assert_eq!(packages[0].package, "comfyui-kjnodes");
        assert_eq!(packages[0].name, "KJNodes");
    }

    #[test]
    fn test_match_by_package_then_name() {
        let packages = normalize_manager_document(&json!([
            { "package": "a", "name": "shared", "version": "9.9" },
            { "package": "shared", "versions": ["0.1", "0.2"] },
            { "package": "b", "name": "Only Name", "version": "1.0" }
        ]));

        let found = find_package(&packages, "shared");
        assert!(found.available);
        assert_eq!(found.latest_version.as_deref(), Some("0.2"));

        let by_name = find_package(&packages, "Only Name");
        assert_eq!(by_name.latest_version.as_deref(), Some("1.0"));
        assert_eq!(by_name.all_versions, vec!["1.0"]);
        assert!(!find_package(&packages, "missing").available);
    }

    #[test]
    fn test_garbage_documents_normalize_to_nothing() {
        assert!(normalize_manager_document(&json!("text")).is_empty());
        assert!(normalize_manager_document(&json!([1, 2, {}])).is_empty());
    }
}
