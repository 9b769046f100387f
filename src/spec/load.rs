use super::provider::OpenApiProvider;
use anyhow::Context;
use oas3::OpenApiV3Spec;
use std::path::Path;

/// Remove path-item keys that are neither HTTP verbs nor known path-item
/// fields, so `oas3` does not reject vendor documents.
fn strip_unknown_verbs(val: &mut serde_json::Value) {
    const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

    let Some(serde_json::Value::Object(paths_map)) = val.get_mut("paths") else {
        return;
    };
    for item in paths_map.values_mut() {
        if let serde_json::Value::Object(obj) = item {
            obj.retain(|k, _| {
                let lk = k.to_ascii_lowercase();
                match lk.as_str() {
                    "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                    m if METHODS.contains(&m) => true,
                    _ => k.starts_with("x-"),
                }
            });
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Load an OpenAPI document from disk. `.yaml`/`.yml` files are parsed as
/// YAML, everything else as JSON.
pub fn load_provider(path: &Path) -> anyhow::Result<OpenApiProvider> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read OpenAPI document {}", path.display()))?;
    provider_from_str(&content, is_yaml(path))
        .with_context(|| format!("failed to parse OpenAPI document {}", path.display()))
}

/// Build a provider from document text.
pub fn provider_from_str(content: &str, yaml: bool) -> anyhow::Result<OpenApiProvider> {
    let mut value: serde_json::Value = if yaml {
        serde_yaml::from_str(content)?
    } else {
        serde_json::from_str(content)?
    };

    strip_unknown_verbs(&mut value);
    let spec: OpenApiV3Spec = serde_json::from_value(value.clone())?;
    tracing::debug!(title = %spec.info.title, "loaded OpenAPI document");
    Ok(OpenApiProvider::new(spec, value))
}
