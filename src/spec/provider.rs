use super::schema::{Schema, SchemaType};
use crate::error::ProviderError;
use http::Method;
use oas3::spec::{MediaType, ObjectOrReference, Operation};
use oas3::OpenApiV3Spec;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Which schema of an operation to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaPart {
    /// The JSON request body.
    Request,
    /// The success response, as declared.
    Response,
    /// The success response with list wrappers removed: a bare array yields
    /// its item schema, and so does an object whose array property is one of
    /// the configured wrapper keys.
    UnwrappedResponse,
}

/// A schema returned by a [`SchemaProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchema {
    pub schema: Schema,
    /// `true` when an array (or list wrapper) was removed to get here.
    pub unwrapped: bool,
}

/// The service-description lookups the generation engine needs.
///
/// Implementations must be side-effect free: the validation gate and the
/// field-model builder query the same operation independently and expect the
/// same answer.
pub trait SchemaProvider {
    /// Resolve the request or response schema of `verb path`.
    ///
    /// Returns `Ok(None)` when the operation exists but declares no schema for
    /// that part, and [`ProviderError::OperationNotFound`] when the operation
    /// does not exist at all.
    fn operation_schema(
        &self,
        verb: &Method,
        path: &str,
        part: SchemaPart,
    ) -> Result<Option<ResolvedSchema>, ProviderError>;

    /// Resolve a named component schema.
    fn component(&self, name: &str) -> Result<Schema, ProviderError>;

    /// All component schemas, in name order.
    fn components(&self) -> Vec<(String, Schema)>;

    /// Declared numeric status codes of an operation, ascending.
    fn status_codes(&self, verb: &Method, path: &str) -> Vec<u16>;

    fn has_status(&self, verb: &Method, path: &str, code: u16) -> bool {
        self.status_codes(verb, path).contains(&code)
    }

    fn operation_summary(&self, verb: &Method, path: &str) -> Option<String>;

    fn has_operation(&self, verb: &Method, path: &str) -> bool;

    /// Every declared path template, in lexicographic order.
    fn paths(&self) -> Vec<String>;
}

/// Default list wrapper keys recognised by [`SchemaPart::UnwrappedResponse`].
pub const DEFAULT_LIST_WRAPPER_KEYS: &[&str] = &["items", "data", "results"];

/// [`SchemaProvider`] backed by a parsed OpenAPI 3.1 document.
pub struct OpenApiProvider {
    spec: OpenApiV3Spec,
    /// The document as JSON, used for `#/components/responses` and
    /// `#/components/requestBodies` lookups.
    raw: Value,
    components: BTreeMap<String, Value>,
    list_wrapper_keys: Vec<String>,
}

impl std::fmt::Debug for OpenApiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenApiProvider")
            .field("title", &self.spec.info.title)
            .field("components", &self.components.len())
            .finish()
    }
}

impl OpenApiProvider {
    /// Build a provider from the parsed document and its raw JSON form.
    pub fn new(spec: OpenApiV3Spec, raw: Value) -> Self {
        let mut components = BTreeMap::new();
        if let Some(c) = spec.components.as_ref() {
            for (name, schema) in &c.schemas {
                match serde_json::to_value(schema) {
                    Ok(v) => {
                        components.insert(name.clone(), v);
                    }
                    Err(err) => {
                        tracing::warn!(component = %name, %err, "skipping unserialisable component");
                    }
                }
            }
        }
        OpenApiProvider {
            spec,
            raw,
            components,
            list_wrapper_keys: DEFAULT_LIST_WRAPPER_KEYS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Replace the object keys treated as list wrappers.
    #[must_use]
    pub fn with_list_wrapper_keys(mut self, keys: Vec<String>) -> Self {
        self.list_wrapper_keys = keys;
        self
    }

    /// API title from `info.title`.
    pub fn title(&self) -> &str {
        &self.spec.info.title
    }

    fn operation(&self, verb: &Method, path: &str) -> Option<&Operation> {
        let item = self.spec.paths.as_ref()?.get(path)?;
        item.methods()
            .into_iter()
            .find(|(m, _)| m == verb)
            .map(|(_, op)| op)
    }

    fn resolve(&self, value: &Value) -> Schema {
        Schema::from_value(value, &self.components)
    }

    /// Schema of a media type as raw JSON. Direct references stay as
    /// `{"$ref": ...}` so that reference identity survives resolution.
    fn media_schema(media: &MediaType) -> Option<Value> {
        match media.schema.as_ref()? {
            ObjectOrReference::Object(schema_obj) => serde_json::to_value(schema_obj).ok(),
            ObjectOrReference::Ref { ref_path, .. } => Some(json!({ "$ref": ref_path })),
        }
    }

    /// Raw schema from a JSON `content` object in the document itself.
    fn raw_content_schema(content: &Value) -> Option<Value> {
        let content = content.as_object()?;
        content
            .get("application/json")
            .and_then(|m| m.get("schema"))
            .or_else(|| content.values().find_map(|m| m.get("schema")))
            .cloned()
    }

    fn raw_component(&self, section: &str, ref_path: &str) -> Option<&Value> {
        let prefix = format!("#/components/{section}/");
        let name = ref_path.strip_prefix(&prefix)?;
        self.raw.get("components")?.get(section)?.get(name)
    }

    fn request_schema(&self, op: &Operation) -> Option<Value> {
        match op.request_body.as_ref()? {
            ObjectOrReference::Object(body) => body
                .content
                .get("application/json")
                .and_then(Self::media_schema)
                .or_else(|| body.content.values().find_map(Self::media_schema)),
            ObjectOrReference::Ref { ref_path, .. } => self
                .raw_component("requestBodies", ref_path)
                .and_then(|body| body.get("content"))
                .and_then(Self::raw_content_schema),
        }
    }

    /// Raw success-response schema: 200 JSON first, then any 2xx JSON, then
    /// any 2xx media type.
    fn response_schema(&self, op: &Operation) -> Option<Value> {
        let responses = op.responses.as_ref()?;
        let mut by_status: BTreeMap<u16, Vec<(String, Value)>> = BTreeMap::new();
        for (status_str, resp_ref) in responses {
            let Ok(status) = status_str.parse::<u16>() else {
                continue;
            };
            if !(200..300).contains(&status) {
                continue;
            }
            let entries = by_status.entry(status).or_default();
            match resp_ref {
                ObjectOrReference::Object(resp) => {
                    for (mt, media) in &resp.content {
                        if let Some(schema) = Self::media_schema(media) {
                            entries.push((mt.clone(), schema));
                        }
                    }
                }
                ObjectOrReference::Ref { ref_path, .. } => {
                    let content = self
                        .raw_component("responses", ref_path)
                        .and_then(|r| r.get("content"))
                        .and_then(Value::as_object);
                    if let Some(content) = content {
                        for (mt, media) in content {
                            if let Some(schema) = media.get("schema") {
                                entries.push((mt.clone(), schema.clone()));
                            }
                        }
                    }
                }
            }
        }

        let json_for = |status: &u16| {
            by_status.get(status).and_then(|entries| {
                entries
                    .iter()
                    .find(|(mt, _)| mt == "application/json")
                    .map(|(_, s)| s.clone())
            })
        };

        json_for(&200)
            .or_else(|| by_status.keys().find_map(json_for))
            .or_else(|| {
                by_status
                    .values()
                    .find_map(|entries| entries.first().map(|(_, s)| s.clone()))
            })
    }

    fn unwrap_list(&self, schema: Schema) -> ResolvedSchema {
        if schema.is_array() {
            let item = schema.items.map(|b| *b).unwrap_or_default();
            return ResolvedSchema {
                schema: item,
                unwrapped: true,
            };
        }
        if schema.schema_type == Some(SchemaType::Object) || !schema.properties.is_empty() {
            for key in &self.list_wrapper_keys {
                if let Some(prop) = schema.properties.get(key) {
                    if prop.is_array() {
                        let item = prop.items.as_deref().cloned().unwrap_or_default();
                        return ResolvedSchema {
                            schema: item,
                            unwrapped: true,
                        };
                    }
                }
            }
        }
        ResolvedSchema {
            schema,
            unwrapped: false,
        }
    }
}

impl SchemaProvider for OpenApiProvider {
    fn operation_schema(
        &self,
        verb: &Method,
        path: &str,
        part: SchemaPart,
    ) -> Result<Option<ResolvedSchema>, ProviderError> {
        let op = self
            .operation(verb, path)
            .ok_or_else(|| ProviderError::OperationNotFound {
                verb: verb.clone(),
                path: path.to_string(),
            })?;

        let raw = match part {
            SchemaPart::Request => self.request_schema(op),
            SchemaPart::Response | SchemaPart::UnwrappedResponse => self.response_schema(op),
        };
        let Some(raw) = raw else {
            return Ok(None);
        };
        let schema = self.resolve(&raw);
        Ok(Some(match part {
            SchemaPart::UnwrappedResponse => self.unwrap_list(schema),
            _ => ResolvedSchema {
                schema,
                unwrapped: false,
            },
        }))
    }

    fn component(&self, name: &str) -> Result<Schema, ProviderError> {
        if !self.components.contains_key(name) {
            return Err(ProviderError::ComponentNotFound(name.to_string()));
        }
        Ok(self.resolve(&json!({ "$ref": format!("#/components/schemas/{name}") })))
    }

    fn components(&self) -> Vec<(String, Schema)> {
        self.components
            .keys()
            .filter_map(|name| self.component(name).ok().map(|s| (name.clone(), s)))
            .collect()
    }

    fn status_codes(&self, verb: &Method, path: &str) -> Vec<u16> {
        let mut codes: Vec<u16> = self
            .operation(verb, path)
            .and_then(|op| op.responses.as_ref())
            .map(|r| r.keys().filter_map(|k| k.parse().ok()).collect())
            .unwrap_or_default();
        codes.sort_unstable();
        codes
    }

    fn operation_summary(&self, verb: &Method, path: &str) -> Option<String> {
        self.operation(verb, path)
            .and_then(|op| op.summary.clone().or_else(|| op.description.clone()))
            .filter(|s| !s.trim().is_empty())
    }

    fn has_operation(&self, verb: &Method, path: &str) -> bool {
        self.operation(verb, path).is_some()
    }

    fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .spec
            .paths
            .as_ref()
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }
}
