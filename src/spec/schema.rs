use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const COMPONENT_PREFIX: &str = "#/components/schemas/";

/// Declared JSON Schema type of a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl SchemaType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(SchemaType::String),
            "integer" => Some(SchemaType::Integer),
            "number" => Some(SchemaType::Number),
            "boolean" => Some(SchemaType::Boolean),
            "object" => Some(SchemaType::Object),
            "array" => Some(SchemaType::Array),
            _ => None,
        }
    }

    /// `true` for string, integer, number and boolean.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            SchemaType::String | SchemaType::Integer | SchemaType::Number | SchemaType::Boolean
        )
    }
}

/// A fully resolved schema.
///
/// `$ref`, `allOf`, `oneOf` and `anyOf` have already been expanded. The only
/// trace of a reference that survives is [`Schema::reference`], which is set
/// when the schema was written as a *direct* `$ref` to a component and is the
/// identity the alias optimizer keys on.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Free-form value schema (`additionalProperties`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    /// Component name when the schema is a direct `$ref`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Set on the placeholder that stops a `$ref` cycle.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recursive: bool,
}

impl Schema {
    /// Resolve a raw JSON schema against a set of component schemas.
    pub fn from_value(value: &Value, components: &BTreeMap<String, Value>) -> Schema {
        SchemaResolver::new(components).resolve(value)
    }

    /// Shorthand for a scalar schema, mostly useful in tests.
    pub fn scalar(schema_type: SchemaType) -> Schema {
        Schema {
            schema_type: Some(schema_type),
            ..Schema::default()
        }
    }

    /// The full `$ref` string for the direct reference, if any.
    pub fn reference_path(&self) -> Option<String> {
        self.reference
            .as_ref()
            .map(|name| format!("{COMPONENT_PREFIX}{name}"))
    }

    pub fn is_array(&self) -> bool {
        self.schema_type == Some(SchemaType::Array) || self.items.is_some()
    }
}

/// Extract the component name from a `#/components/schemas/<name>` pointer.
pub fn component_name(ref_path: &str) -> Option<&str> {
    ref_path.strip_prefix(COMPONENT_PREFIX)
}

/// Expands raw JSON schemas, tracking the `$ref` chain to stop on cycles.
pub(crate) struct SchemaResolver<'a> {
    components: &'a BTreeMap<String, Value>,
    stack: Vec<String>,
}

impl<'a> SchemaResolver<'a> {
    pub(crate) fn new(components: &'a BTreeMap<String, Value>) -> Self {
        SchemaResolver {
            components,
            stack: Vec::new(),
        }
    }

    pub(crate) fn resolve(&mut self, value: &Value) -> Schema {
        let Some(obj) = value.as_object() else {
            // `true`, `false` and anything else non-object are free-form.
            return Schema::default();
        };

        if let Some(ref_path) = obj.get("$ref").and_then(Value::as_str) {
            let mut schema = self.resolve_ref(ref_path);
            if let Some(desc) = obj.get("description").and_then(Value::as_str) {
                schema.description = Some(desc.to_string());
            }
            return schema;
        }

        let mut schema = Schema::default();
        self.apply_type(obj.get("type"), &mut schema);
        if obj.get("nullable").and_then(Value::as_bool) == Some(true) {
            schema.nullable = true;
        }
        schema.format = obj.get("format").and_then(Value::as_str).map(String::from);
        schema.description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(String::from);

        if let Some(props) = obj.get("properties").and_then(Value::as_object) {
            for (name, prop) in props {
                schema.properties.insert(name.clone(), self.resolve(prop));
            }
        }
        if let Some(required) = obj.get("required").and_then(Value::as_array) {
            schema.required = required
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect();
        }
        if let Some(items) = obj.get("items") {
            schema.items = Some(Box::new(self.resolve(items)));
        }
        match obj.get("additionalProperties") {
            Some(Value::Bool(true)) => {
                schema.additional_properties = Some(Box::new(Schema::default()));
            }
            Some(v) if v.is_object() => {
                schema.additional_properties = Some(Box::new(self.resolve(v)));
            }
            _ => {}
        }

        if let Some(all_of) = obj.get("allOf").and_then(Value::as_array) {
            for part in all_of {
                let resolved = self.resolve(part);
                merge_into(&mut schema, resolved, true);
            }
        }

        let variants = obj
            .get("oneOf")
            .or_else(|| obj.get("anyOf"))
            .and_then(Value::as_array);
        if let Some(variants) = variants {
            self.apply_variants(variants, &mut schema);
        }

        schema
    }

    fn resolve_ref(&mut self, ref_path: &str) -> Schema {
        let Some(name) = component_name(ref_path) else {
            tracing::warn!(ref_path, "unsupported $ref target, treating as free-form");
            return Schema::default();
        };
        if self.stack.iter().any(|n| n == name) {
            return Schema {
                schema_type: Some(SchemaType::Object),
                reference: Some(name.to_string()),
                recursive: true,
                ..Schema::default()
            };
        }
        let Some(component) = self.components.get(name) else {
            tracing::warn!(component = name, "unresolved $ref, treating as free-form");
            return Schema::default();
        };
        self.stack.push(name.to_string());
        let mut schema = self.resolve(component);
        self.stack.pop();
        // A component that is itself an alias of another component keeps the
        // outermost name: that is the one the author referenced.
        schema.reference = Some(name.to_string());
        schema
    }

    fn apply_type(&self, ty: Option<&Value>, schema: &mut Schema) {
        match ty {
            Some(Value::String(s)) => {
                if s == "null" {
                    schema.nullable = true;
                } else {
                    schema.schema_type = SchemaType::parse(s);
                }
            }
            Some(Value::Array(types)) => {
                for t in types.iter().filter_map(Value::as_str) {
                    if t == "null" {
                        schema.nullable = true;
                    } else if schema.schema_type.is_none() {
                        schema.schema_type = SchemaType::parse(t);
                    }
                }
            }
            _ => {}
        }
    }

    fn apply_variants(&mut self, variants: &[Value], schema: &mut Schema) {
        let mut resolved = Vec::new();
        for variant in variants {
            let is_null = variant.get("type").and_then(Value::as_str) == Some("null");
            if is_null {
                schema.nullable = true;
            } else {
                resolved.push(self.resolve(variant));
            }
        }
        match resolved.len() {
            0 => {}
            1 => {
                let mut only = resolved.remove(0);
                // Wrapped in a composition, so no longer a direct reference.
                only.reference = None;
                merge_into(schema, only, true);
            }
            _ => {
                let all_objects = resolved.iter().all(|s| {
                    s.schema_type == Some(SchemaType::Object) || !s.properties.is_empty()
                });
                if all_objects {
                    for variant in resolved {
                        merge_into(schema, variant, false);
                    }
                } else {
                    tracing::debug!("heterogeneous oneOf/anyOf, treating as free-form");
                }
            }
        }
    }
}

/// Merge `other` into `target`. `keep_required` controls whether the
/// other schema's required list is carried over (allOf) or dropped (oneOf).
fn merge_into(target: &mut Schema, other: Schema, keep_required: bool) {
    if target.schema_type.is_none() {
        target.schema_type = other.schema_type;
    }
    if target.format.is_none() {
        target.format = other.format;
    }
    if target.description.is_none() {
        target.description = other.description;
    }
    target.nullable |= other.nullable;
    for (name, prop) in other.properties {
        target.properties.entry(name).or_insert(prop);
    }
    if keep_required {
        for name in other.required {
            if !target.required.contains(&name) {
                target.required.push(name);
            }
        }
    }
    if target.items.is_none() {
        target.items = other.items;
    }
    if target.additional_properties.is_none() {
        target.additional_properties = other.additional_properties;
    }
}
