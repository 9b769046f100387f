use super::naming::{field_name, normalize_key, to_camel_case, unique_name};
use super::shape::{classify, Shape};
use super::types::{sort_fields, CompositeType, Field, TypeRef, TypeRegistry};
use crate::alias::{AliasCandidate, AliasDecision, AliasOptimizer};
use crate::error::BuildError;
use crate::spec::{Schema, SchemaPart, SchemaProvider};
use http::Method;
use serde::Serialize;
use std::collections::BTreeSet;

/// Why a property produced no field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AmbiguousObject,
    ArrayOfAmbiguousObjects,
    /// Nested object whose own properties were all skipped.
    EmptyFields,
}

/// A property left out of a generated type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedProperty {
    pub type_name: String,
    pub property: String,
    pub reason: SkipReason,
}

/// Body of a top-level generated model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "body", rename_all = "snake_case")]
pub enum ModelBody {
    Fields {
        fields: Vec<Field>,
        #[serde(skip_serializing_if = "Option::is_none")]
        additional_properties: Option<TypeRef>,
    },
    /// The model is another type: a named component, an array or a map.
    Alias { target: TypeRef },
}

/// Turns resolved schemas into field models, registering nested types.
///
/// Nested objects are named parent name + camel-cased property name, object
/// map values `<Parent><Prop>Value`. Registration is first-writer-wins, so the
/// same nested name produced by two resources yields one type.
pub struct ModelBuilder<'a> {
    provider: &'a dyn SchemaProvider,
    registry: TypeRegistry,
    aliases: AliasOptimizer,
    /// Types whose fields are being built; a reference back to one of them
    /// ends the recursion.
    building: BTreeSet<String>,
    skipped: Vec<SkippedProperty>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(provider: &'a dyn SchemaProvider, alias_components: bool) -> Self {
        ModelBuilder {
            provider,
            registry: TypeRegistry::new(),
            aliases: AliasOptimizer::new(alias_components),
            building: BTreeSet::new(),
            skipped: Vec::new(),
        }
    }

    /// Resolve `verb path` through the provider and build it as model `name`.
    pub fn build_operation(
        &mut self,
        name: &str,
        verb: &Method,
        path: &str,
        part: SchemaPart,
    ) -> Result<ModelBody, BuildError> {
        let resolved = self
            .provider
            .operation_schema(verb, path, part)
            .ok()
            .flatten()
            .ok_or_else(|| BuildError::SchemaNotFound {
                verb: verb.clone(),
                path: path.to_string(),
            })?;
        self.build_model(name, &resolved.schema)
    }

    /// Build a top-level model.
    pub fn build_model(&mut self, name: &str, schema: &Schema) -> Result<ModelBody, BuildError> {
        if let Some(target) = self.try_alias(name, schema) {
            return Ok(ModelBody::Alias { target });
        }
        if schema.recursive {
            return Ok(ModelBody::Alias {
                target: self.recursive_ref(schema),
            });
        }

        let shape = classify(schema);
        match shape {
            Shape::Primitive => Ok(ModelBody::Alias {
                target: TypeRef::primitive(schema),
            }),
            Shape::Map => {
                let value = self.map_value(&format!("{name}Value"), schema)?;
                Ok(ModelBody::Alias {
                    target: TypeRef::map(value),
                })
            }
            Shape::Array(_) if shape.is_array_of_ambiguous() => {
                Err(BuildError::ArrayOfAmbiguousObjects {
                    type_name: name.to_string(),
                })
            }
            Shape::Array(_) => {
                let item = self.array_item(&format!("{name}Item"), schema)?;
                Ok(ModelBody::Alias {
                    target: TypeRef::array(item),
                })
            }
            Shape::AmbiguousObject => Err(BuildError::Indeterminate {
                type_name: name.to_string(),
            }),
            Shape::Object => {
                let (fields, additional_properties) = self.build_fields(name, schema)?;
                Ok(ModelBody::Fields {
                    fields,
                    additional_properties,
                })
            }
        }
    }

    /// Optional scalar fields of `schema`, used as list filters.
    pub fn search_params(&self, schema: &Schema) -> Vec<Field> {
        let mut seen = BTreeSet::new();
        let mut fields: Vec<Field> = schema
            .properties
            .iter()
            .filter(|(_, prop)| prop.schema_type.is_some_and(|t| t.is_scalar()))
            .map(|(key, prop)| Field {
                name: unique_name(&mut seen, &field_name(key)),
                type_ref: TypeRef::primitive(prop),
                source_key: key.clone(),
                required: false,
                doc: prop.description.clone(),
            })
            .collect();
        sort_fields(&mut fields);
        fields
    }

    /// Skipped properties recorded since the last call.
    pub fn take_skipped(&mut self) -> Vec<SkippedProperty> {
        std::mem::take(&mut self.skipped)
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn into_parts(self) -> (TypeRegistry, Vec<AliasDecision>) {
        (self.registry, self.aliases.into_decisions())
    }

    fn try_alias(&mut self, target: &str, schema: &Schema) -> Option<TypeRef> {
        let candidate = self.aliases.candidate(self.provider, schema)?;
        if let Err(err) = self.ensure_component(&candidate) {
            tracing::debug!(component = %candidate.component, %err, "alias component not buildable");
            return None;
        }
        self.aliases.record(target, &candidate);
        let named = TypeRef::named(&candidate.type_name);
        Some(if candidate.array {
            TypeRef::array(named)
        } else {
            named
        })
    }

    fn ensure_component(&mut self, candidate: &AliasCandidate) -> Result<(), BuildError> {
        let name = candidate.type_name.as_str();
        if self.registry.contains(name) || self.building.contains(name) {
            return Ok(());
        }
        self.building.insert(name.to_string());
        let built = match candidate.shape {
            Shape::Map => self
                .map_value(&format!("{name}Value"), &candidate.schema)
                .map(|value| (Vec::new(), Some(value))),
            _ => self.build_fields(name, &candidate.schema),
        };
        self.building.remove(name);
        let (fields, additional_properties) = built?;
        self.registry.register(CompositeType {
            name: name.to_string(),
            fields,
            additional_properties,
            component: Some(candidate.component.clone()),
            doc: candidate.schema.description.clone(),
        });
        Ok(())
    }

    /// Reference to the component a cycle placeholder stands for.
    fn recursive_ref(&mut self, schema: &Schema) -> TypeRef {
        let Some(component) = schema.reference.as_deref() else {
            return TypeRef::any();
        };
        let name = to_camel_case(component);
        if self.registry.contains(&name) || self.building.contains(&name) {
            return TypeRef::named(&name);
        }
        let Ok(resolved) = self.provider.component(component) else {
            return TypeRef::any();
        };
        let shape = classify(&resolved);
        if !matches!(shape, Shape::Object | Shape::Map) {
            return TypeRef::any();
        }
        let candidate = AliasCandidate {
            component: component.to_string(),
            reference: schema.reference_path().unwrap_or_default(),
            type_name: name.clone(),
            array: false,
            shape,
            schema: resolved,
        };
        match self.ensure_component(&candidate) {
            Ok(()) => TypeRef::named(&name),
            Err(_) => TypeRef::any(),
        }
    }

    fn ensure_structural(&mut self, name: &str, schema: &Schema) -> Result<(), BuildError> {
        if self.registry.contains(name) || self.building.contains(name) {
            return Ok(());
        }
        self.building.insert(name.to_string());
        let built = self.build_fields(name, schema);
        self.building.remove(name);
        let (fields, additional_properties) = built?;
        self.registry.register(CompositeType {
            name: name.to_string(),
            fields,
            additional_properties,
            component: None,
            doc: schema.description.clone(),
        });
        Ok(())
    }

    fn build_fields(
        &mut self,
        type_name: &str,
        schema: &Schema,
    ) -> Result<(Vec<Field>, Option<TypeRef>), BuildError> {
        let required: BTreeSet<String> = schema.required.iter().map(|r| normalize_key(r)).collect();
        let mut seen = BTreeSet::new();
        let mut fields = Vec::new();

        for (key, prop) in &schema.properties {
            let Some(type_ref) = self.field_type(type_name, key, prop)? else {
                continue;
            };
            fields.push(Field {
                name: unique_name(&mut seen, &field_name(key)),
                type_ref,
                source_key: key.clone(),
                required: required.contains(&normalize_key(key)),
                doc: prop.description.clone(),
            });
        }
        if fields.is_empty() && !schema.properties.is_empty() {
            return Err(BuildError::EmptyFields {
                type_name: type_name.to_string(),
            });
        }

        let additional = if schema.additional_properties.is_some() {
            Some(self.map_value(&format!("{type_name}Value"), schema)?)
        } else {
            None
        };
        sort_fields(&mut fields);
        Ok((fields, additional))
    }

    fn skip(&mut self, type_name: &str, property: &str, reason: SkipReason) {
        tracing::debug!(type_name, property, ?reason, "property skipped");
        self.skipped.push(SkippedProperty {
            type_name: type_name.to_string(),
            property: property.to_string(),
            reason,
        });
    }

    /// Type of a struct field, or `None` when the property is skipped.
    fn field_type(
        &mut self,
        parent: &str,
        key: &str,
        prop: &Schema,
    ) -> Result<Option<TypeRef>, BuildError> {
        let target = format!("{parent}.{}", field_name(key));
        if let Some(aliased) = self.try_alias(&target, prop) {
            return Ok(Some(TypeRef::wrapped(aliased)));
        }
        if prop.recursive {
            return Ok(Some(TypeRef::wrapped(self.recursive_ref(prop))));
        }

        let nested = format!("{parent}{}", to_camel_case(key));
        let shape = classify(prop);
        let type_ref = match shape {
            Shape::Primitive => TypeRef::primitive(prop),
            Shape::Map => TypeRef::map(self.map_value(&format!("{nested}Value"), prop)?),
            Shape::Array(_) if shape.is_array_of_ambiguous() => {
                self.skip(parent, key, SkipReason::ArrayOfAmbiguousObjects);
                return Ok(None);
            }
            Shape::Array(_) => TypeRef::wrapped(TypeRef::array(self.array_item(&nested, prop)?)),
            Shape::AmbiguousObject => {
                self.skip(parent, key, SkipReason::AmbiguousObject);
                return Ok(None);
            }
            Shape::Object => match self.ensure_structural(&nested, prop) {
                Ok(()) => TypeRef::wrapped(TypeRef::named(&nested)),
                Err(BuildError::EmptyFields { .. }) => {
                    self.skip(parent, key, SkipReason::EmptyFields);
                    return Ok(None);
                }
                Err(err) => return Err(err),
            },
        };
        Ok(Some(type_ref))
    }

    fn array_item(&mut self, name: &str, array: &Schema) -> Result<TypeRef, BuildError> {
        match array.items.as_deref() {
            Some(item) => self.element_type(name, item),
            None => Ok(TypeRef::any()),
        }
    }

    fn map_value(&mut self, name: &str, map: &Schema) -> Result<TypeRef, BuildError> {
        match map.additional_properties.as_deref() {
            Some(value) => self.element_type(name, value),
            None => Ok(TypeRef::any()),
        }
    }

    /// Type of an array item or map value. Never wrapped; ambiguous objects
    /// become free-form values.
    fn element_type(&mut self, name: &str, schema: &Schema) -> Result<TypeRef, BuildError> {
        if schema.recursive {
            return Ok(self.recursive_ref(schema));
        }
        let type_ref = match classify(schema) {
            Shape::Primitive => TypeRef::primitive(schema),
            Shape::Map => TypeRef::map(self.map_value(&format!("{name}Value"), schema)?),
            Shape::Array(_) => TypeRef::array(self.array_item(name, schema)?),
            Shape::AmbiguousObject => TypeRef::any(),
            Shape::Object => match self.ensure_structural(name, schema) {
                Ok(()) => TypeRef::named(name),
                Err(BuildError::EmptyFields { .. }) => TypeRef::any(),
                Err(err) => return Err(err),
            },
        };
        Ok(type_ref)
    }
}
