use crate::spec::{Schema, SchemaType};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Scalar kinds a field can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
    /// Untyped or free-form value.
    Any,
}

impl PrimitiveKind {
    pub fn of(schema: &Schema) -> Self {
        match schema.schema_type {
            Some(SchemaType::String) => PrimitiveKind::String,
            Some(SchemaType::Integer) => PrimitiveKind::Integer,
            Some(SchemaType::Number) => PrimitiveKind::Number,
            Some(SchemaType::Boolean) => PrimitiveKind::Boolean,
            _ => PrimitiveKind::Any,
        }
    }
}

/// Resolved type of a field, model alias, array item or map value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRef {
    Primitive {
        primitive: PrimitiveKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    /// String-keyed map.
    Map { value: Box<TypeRef> },
    Array { item: Box<TypeRef> },
    /// A composite in the [`TypeRegistry`].
    Named { name: String },
    /// Optional wrapper. Only struct fields holding an array or a nested
    /// object get it; array items and map values never do.
    Wrapped { inner: Box<TypeRef> },
}

impl TypeRef {
    pub fn primitive(schema: &Schema) -> Self {
        TypeRef::Primitive {
            primitive: PrimitiveKind::of(schema),
            format: schema.format.clone(),
        }
    }

    pub fn any() -> Self {
        TypeRef::Primitive {
            primitive: PrimitiveKind::Any,
            format: None,
        }
    }

    pub fn named(name: &str) -> Self {
        TypeRef::Named {
            name: name.to_string(),
        }
    }

    pub fn array(item: TypeRef) -> Self {
        TypeRef::Array {
            item: Box::new(item),
        }
    }

    pub fn map(value: TypeRef) -> Self {
        TypeRef::Map {
            value: Box::new(value),
        }
    }

    pub fn wrapped(inner: TypeRef) -> Self {
        TypeRef::Wrapped {
            inner: Box::new(inner),
        }
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, TypeRef::Wrapped { .. })
    }

    /// Every registry name this reference mentions.
    pub fn named_types(&self) -> Vec<&str> {
        match self {
            TypeRef::Primitive { .. } => Vec::new(),
            TypeRef::Named { name } => vec![name.as_str()],
            TypeRef::Map { value: inner }
            | TypeRef::Array { item: inner }
            | TypeRef::Wrapped { inner } => inner.named_types(),
        }
    }
}

/// One field of a generated type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Snake-cased, sanitised identifier.
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    /// Property key in the OpenAPI document.
    pub source_key: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// Order fields required-first, then alphabetically by name.
pub fn sort_fields(fields: &mut [Field]) {
    fields.sort_by(|a, b| b.required.cmp(&a.required).then_with(|| a.name.cmp(&b.name)));
}

/// A named composite type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositeType {
    pub name: String,
    pub fields: Vec<Field>,
    /// Value type for keys not covered by `fields`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<TypeRef>,
    /// Component this type was built from, when aliased.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// Generated composites keyed by name. The first registration of a name wins.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, Arc<CompositeType>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ty`, or return the node already registered under its name.
    pub fn register(&mut self, ty: CompositeType) -> Arc<CompositeType> {
        Arc::clone(
            self.types
                .entry(ty.name.clone())
                .or_insert_with(|| Arc::new(ty)),
        )
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CompositeType>> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Types in name order.
    pub fn types(&self) -> Vec<Arc<CompositeType>> {
        self.types.values().map(Arc::clone).collect()
    }
}
