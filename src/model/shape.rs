use crate::spec::{Schema, SchemaType};
use serde::Serialize;

/// Structural shape of a resolved schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", content = "item", rename_all = "snake_case")]
pub enum Shape {
    /// A scalar, or an untyped schema accepted as any value.
    Primitive,
    /// No properties, but a value schema for arbitrary keys.
    Map,
    /// An array; carries the shape of its items.
    Array(Box<Shape>),
    /// Declared object with neither properties nor a value schema.
    AmbiguousObject,
    /// Object with properties, or a reference that stops a cycle.
    Object,
}

impl Shape {
    /// `true` for arrays (at any depth) whose items are ambiguous objects.
    pub fn is_array_of_ambiguous(&self) -> bool {
        match self {
            Shape::Array(item) => {
                matches!(**item, Shape::AmbiguousObject) || item.is_array_of_ambiguous()
            }
            _ => false,
        }
    }

    pub fn is_array_of_primitives(&self) -> bool {
        matches!(self, Shape::Array(item) if **item == Shape::Primitive)
    }
}

/// Classify a schema. Checks run in priority order: primitive, map, array,
/// ambiguous object, object.
pub fn classify(schema: &Schema) -> Shape {
    if schema.recursive {
        return Shape::Object;
    }
    if schema.schema_type.is_some_and(SchemaType::is_scalar) {
        return Shape::Primitive;
    }
    let has_props = !schema.properties.is_empty();
    if schema.schema_type.is_none()
        && !has_props
        && schema.items.is_none()
        && schema.additional_properties.is_none()
    {
        return Shape::Primitive;
    }
    if !has_props && schema.additional_properties.is_some() {
        return Shape::Map;
    }
    if schema.is_array() {
        let item = schema
            .items
            .as_deref()
            .map_or(Shape::Primitive, classify);
        return Shape::Array(Box::new(item));
    }
    if !has_props {
        return Shape::AmbiguousObject;
    }
    Shape::Object
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn object(props: &[&str]) -> Schema {
        Schema {
            schema_type: Some(SchemaType::Object),
            properties: props
                .iter()
                .map(|p| (p.to_string(), Schema::scalar(SchemaType::String)))
                .collect::<BTreeMap<_, _>>(),
            ..Schema::default()
        }
    }

    fn array_of(item: Schema) -> Schema {
        Schema {
            schema_type: Some(SchemaType::Array),
            items: Some(Box::new(item)),
            ..Schema::default()
        }
    }

    #[test]
    fn test_classification_order() {
        assert_eq!(classify(&Schema::scalar(SchemaType::Integer)), Shape::Primitive);
        assert_eq!(classify(&Schema::default()), Shape::Primitive);
        assert_eq!(classify(&object(&[])), Shape::AmbiguousObject);
        assert_eq!(classify(&object(&["id"])), Shape::Object);

        let map = Schema {
            schema_type: Some(SchemaType::Object),
            additional_properties: Some(Box::new(Schema::scalar(SchemaType::String))),
            ..Schema::default()
        };
        assert_eq!(classify(&map), Shape::Map);
    }

    #[test]
    fn test_array_shapes() {
        let ambiguous = classify(&array_of(object(&[])));
        assert!(ambiguous.is_array_of_ambiguous());
        assert!(classify(&array_of(array_of(object(&[])))).is_array_of_ambiguous());

        let scalars = classify(&array_of(Schema::scalar(SchemaType::String)));
        assert!(scalars.is_array_of_primitives());
        assert!(!scalars.is_array_of_ambiguous());

        assert_eq!(
            classify(&array_of(object(&["id"]))),
            Shape::Array(Box::new(Shape::Object))
        );
    }

    #[test]
    fn test_recursive_placeholder_is_object() {
        let placeholder = Schema {
            reference: Some("Node".to_string()),
            recursive: true,
            ..Schema::default()
        };
        assert_eq!(classify(&placeholder), Shape::Object);
    }
}
