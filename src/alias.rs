//! # Alias Optimizer
//!
//! When a model or field schema is written as a direct `$ref` to a component
//! (or an array of one), the generated code can reference one named type
//! instead of emitting a structural copy. The optimizer only fires when the
//! component, resolved on its own, is an object or a map; references to
//! scalars, ambiguous objects and arrays are built structurally. Two schemas
//! that merely look alike are never aliased.

use crate::model::{classify, to_camel_case, Shape};
use crate::spec::{Schema, SchemaProvider};
use serde::Serialize;

/// A position that references a named component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasDecision {
    /// Model name, or `Type.field` for fields.
    pub target: String,
    /// Component name as declared in the document.
    pub component: String,
    /// Registry name of the component type.
    pub type_name: String,
    /// Original `$ref` string.
    pub reference: String,
    /// The position holds an array of the component.
    pub array: bool,
}

/// A reference that may become an alias once its component is built.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasCandidate {
    pub component: String,
    pub type_name: String,
    pub reference: String,
    pub array: bool,
    /// Shape of the component on its own: [`Shape::Object`] or [`Shape::Map`].
    pub shape: Shape,
    pub schema: Schema,
}

#[derive(Debug, Clone)]
pub struct AliasOptimizer {
    enabled: bool,
    decisions: Vec<AliasDecision>,
}

impl AliasOptimizer {
    pub fn new(enabled: bool) -> Self {
        AliasOptimizer {
            enabled,
            decisions: Vec::new(),
        }
    }

    /// Check whether `schema` can be aliased to a component.
    pub fn candidate(&self, provider: &dyn SchemaProvider, schema: &Schema) -> Option<AliasCandidate> {
        if !self.enabled {
            return None;
        }
        let (direct, array) = match (&schema.reference, schema.items.as_deref()) {
            (Some(_), _) => (schema, false),
            (None, Some(item)) if schema.is_array() && item.reference.is_some() => (item, true),
            _ => return None,
        };
        if direct.recursive {
            return None;
        }
        let component = direct.reference.clone()?;
        let reference = direct.reference_path()?;

        let resolved = provider.component(&component).ok()?;
        let shape = classify(&resolved);
        if !matches!(shape, Shape::Object | Shape::Map) {
            tracing::debug!(%component, ?shape, "reference not aliased");
            return None;
        }
        Some(AliasCandidate {
            type_name: to_camel_case(&component),
            component,
            reference,
            array,
            shape,
            schema: resolved,
        })
    }

    /// Record an alias after its component type has been built.
    pub fn record(&mut self, target: &str, candidate: &AliasCandidate) {
        if self.decisions.iter().any(|d| d.target == target) {
            return;
        }
        self.decisions.push(AliasDecision {
            target: target.to_string(),
            component: candidate.component.clone(),
            type_name: candidate.type_name.clone(),
            reference: candidate.reference.clone(),
            array: candidate.array,
        });
    }

    /// Decisions ordered by target.
    pub fn into_decisions(mut self) -> Vec<AliasDecision> {
        self.decisions.sort_by(|a, b| a.target.cmp(&b.target));
        self.decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::provider_from_str;

    const DOC: &str = r##"
openapi: 3.1.0
info: { title: t, version: "1" }
paths: {}
components:
  schemas:
    Widget:
      type: object
      properties:
        id: { type: string }
    Labels:
      type: object
      additionalProperties: { type: string }
    Blob:
      type: object
    Name:
      type: string
"##;

    fn reference(name: &str) -> Schema {
        Schema {
            reference: Some(name.to_string()),
            ..Schema::default()
        }
    }

    #[test]
    fn test_candidates_for_objects_and_maps_only() {
        let provider = provider_from_str(DOC, true).unwrap();
        let optimizer = AliasOptimizer::new(true);

        let widget = optimizer.candidate(&provider, &reference("Widget")).unwrap();
        assert_eq!(widget.reference, "#/components/schemas/Widget");
        assert_eq!(widget.shape, Shape::Object);
        assert!(!widget.array);

        assert_eq!(
            optimizer.candidate(&provider, &reference("Labels")).unwrap().shape,
            Shape::Map
        );
        assert!(optimizer.candidate(&provider, &reference("Blob")).is_none());
        assert!(optimizer.candidate(&provider, &reference("Name")).is_none());
        assert!(optimizer.candidate(&provider, &reference("Missing")).is_none());
    }

    #[test]
    fn test_array_of_reference_and_structural_schemas() {
        let provider = provider_from_str(DOC, true).unwrap();
        let optimizer = AliasOptimizer::new(true);

        let array = Schema {
            items: Some(Box::new(reference("Widget"))),
            ..Schema::default()
        };
        assert!(optimizer.candidate(&provider, &array).unwrap().array);

        // same structure, no reference
        let structural = provider.component("Widget").map(|mut s| {
            s.reference = None;
            s
        });
        assert!(optimizer.candidate(&provider, &structural.unwrap()).is_none());
    }

    #[test]
    fn test_disabled_and_recorded_once() {
        let provider = provider_from_str(DOC, true).unwrap();
        assert!(AliasOptimizer::new(false)
            .candidate(&provider, &reference("Widget"))
            .is_none());

        let mut optimizer = AliasOptimizer::new(true);
        let candidate = optimizer.candidate(&provider, &reference("Widget")).unwrap();
        optimizer.record("Widget", &candidate);
        optimizer.record("Widget", &candidate);
        optimizer.record("Gadget.part", &candidate);
        let decisions = optimizer.into_decisions();
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].target, "Gadget.part");
    }
}
