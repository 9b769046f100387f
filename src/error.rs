//! Error types shared across the generation pipeline.
//!
//! Errors fall into two groups:
//!
//! - [`FatalError`] aborts the whole run. It is returned when an annotation
//!   is an authoring mistake (a verb/path the OpenAPI document does not
//!   declare, a rejected duplicate operation set) and producing output would
//!   silently yield an incomplete client.
//! - Everything else ([`ProviderError`], [`BuildError`]) is recoverable per
//!   operation: the pipeline converts it into a
//!   [`ValidationIssue`](crate::validator::ValidationIssue) and keeps going
//!   with a smaller operation set.

use http::Method;
use thiserror::Error;

/// Errors raised while building or querying the marker registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Map-shaped arguments must be keyed by strings.
    #[error("marker `{marker}`: map arguments must use string keys, found {found}")]
    UnsupportedKeyType { marker: String, found: String },

    /// A list or map shape wraps a shape that cannot be resolved.
    #[error("marker `{marker}`: unsupported nested argument shape {found}")]
    UnsupportedNestedShape { marker: String, found: String },

    /// The same name/target pair was registered twice with different definitions.
    #[error("marker `{marker}` is already registered for {target} with a different definition")]
    ConflictingDefinition { marker: String, target: String },

    /// Marker names must be non-empty and must not carry the `+` sigil.
    #[error("invalid marker name `{0}`")]
    InvalidName(String),
}

/// Errors raised while parsing a single annotation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerError {
    #[error("annotation `{0}` does not start with the `+` sigil")]
    MissingSigil(String),

    #[error("annotation `{0}` has no namespace/feature separator")]
    MissingFeature(String),

    #[error("annotation `{text}` has a malformed option suffix")]
    MalformedOption { text: String },

    #[error("unsupported HTTP verb `{verb}` in `{text}`")]
    UnsupportedVerb { verb: String, text: String },

    #[error("annotation `{0}` requires a path payload")]
    MissingPayload(String),

    #[error("payload `{payload}` is not a valid {expected}")]
    InvalidPayload { payload: String, expected: String },
}

/// Errors returned by a [`SchemaProvider`](crate::spec::SchemaProvider).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The document declares no operation for this verb and path.
    #[error("operation {verb} {path} is not declared")]
    OperationNotFound { verb: Method, path: String },

    /// No component schema with this name exists.
    #[error("component schema `{0}` is not declared")]
    ComponentNotFound(String),
}

/// Typed failures of the field-model builder.
///
/// Both "not found" and "indeterminate" are reported to the caller instead of
/// producing an empty model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("no schema found for {verb} {path}")]
    SchemaNotFound { verb: Method, path: String },

    #[error("schema for `{type_name}` is an object without properties or value schema")]
    Indeterminate { type_name: String },

    #[error("schema for `{type_name}` is an array of objects without properties")]
    ArrayOfAmbiguousObjects { type_name: String },

    #[error("every property of `{type_name}` was skipped; no fields remain")]
    EmptyFields { type_name: String },
}

/// Conditions that abort the whole generation run.
#[derive(Debug, Error)]
pub enum FatalError {
    /// An annotation references a verb/path pair the OpenAPI document does not declare.
    #[error("resource `{resource}`: annotation `{marker}` references {verb} {path}, which the OpenAPI document does not declare")]
    UnknownOperation {
        resource: String,
        marker: String,
        verb: Method,
        path: String,
    },

    /// The resource path matches neither a collection nor an item operation.
    #[error("resource `{resource}`: path `{path}` matches no operation in the OpenAPI document")]
    UnknownResourcePath { resource: String, path: String },

    /// More than one operation-set marker under the `reject` policy.
    #[error("resource `{resource}` declares more than one operation-set marker (`{marker}`)")]
    DuplicateOperationSet { resource: String, marker: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Source facts could not be extracted.
    #[error("failed to extract source facts: {0:#}")]
    Extraction(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_error_names_resource_and_marker() {
        let err = FatalError::UnknownOperation {
            resource: "Widget".to_string(),
            marker: "+clientgen:extraMethod:POST=/widgets/{id}/restart".to_string(),
            verb: Method::POST,
            path: "/widgets/{id}/restart".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Widget"));
        assert!(msg.contains("+clientgen:extraMethod:POST=/widgets/{id}/restart"));
        assert!(msg.contains("POST /widgets/{id}/restart"));
    }

    #[test]
    fn test_registry_error_converts_into_fatal() {
        let err: FatalError = RegistryError::InvalidName(String::new()).into();
        assert!(matches!(err, FatalError::Registry(_)));
    }
}
