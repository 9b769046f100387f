use crate::markers::WaitTimeout;
use http::Method;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

pub(crate) fn serialize_method<S: Serializer>(method: &Method, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(method.as_str())
}

/// A CRUD operation. Declaration order is the canonical `CLRUD` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Operation {
    Create,
    List,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::List,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn letter(self) -> char {
        match self {
            Operation::Create => 'C',
            Operation::List => 'L',
            Operation::Read => 'R',
            Operation::Update => 'U',
            Operation::Delete => 'D',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        Operation::ALL.into_iter().find(|op| op.letter() == c)
    }

    /// Accepts a single letter (`C`) or the full name (`Create`).
    pub fn from_ident(ident: &str) -> Option<Self> {
        let mut chars = ident.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Self::from_letter(c);
        }
        Operation::ALL
            .into_iter()
            .find(|op| op.to_string() == ident)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Create => "Create",
            Operation::List => "List",
            Operation::Read => "Read",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
        };
        f.write_str(s)
    }
}

/// CRUD operations supported by a resource and the path they were declared on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationSet {
    pub operations: BTreeSet<Operation>,
    /// Resource path as declared: the collection path or an item template.
    pub path: String,
    /// Annotation (or wiring field) the set came from.
    pub marker: String,
}

impl OperationSet {
    pub fn new(operations: impl IntoIterator<Item = Operation>, path: &str, marker: &str) -> Self {
        OperationSet {
            operations: operations.into_iter().collect(),
            path: path.to_string(),
            marker: marker.to_string(),
        }
    }

    /// Letters in canonical order, e.g. `CLRUD`.
    pub fn letters(&self) -> String {
        self.operations.iter().map(|op| op.letter()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// A non-CRUD method of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraMethodSpec {
    #[serde(serialize_with = "serialize_method")]
    pub verb: Method,
    pub path: String,
    /// Set for asynchronous methods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub async_wait: Option<WaitTimeout>,
    #[serde(skip)]
    pub marker: String,
}

impl ExtraMethodSpec {
    pub fn is_async(&self) -> bool {
        self.async_wait.is_some()
    }
}

/// A `requestUrl`/`responseUrl` override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlOverride {
    #[serde(serialize_with = "serialize_method")]
    pub verb: Method,
    pub path: String,
    #[serde(skip)]
    pub marker: String,
}

/// Single-purpose markers kept for older annotation sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegacyMarkers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upsert: Option<String>,
}

impl LegacyMarkers {
    pub fn is_empty(&self) -> bool {
        self.details.is_none() && self.upsert.is_none()
    }
}

/// Everything declared about one resource before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_set: Option<OperationSet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_methods: Vec<ExtraMethodSpec>,
    #[serde(skip_serializing_if = "LegacyMarkers::is_empty")]
    pub legacy: LegacyMarkers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_url: Option<UrlOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_url: Option<UrlOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(name: &str) -> Self {
        ResourceDescriptor {
            name: name.to_string(),
            operation_set: None,
            extra_methods: Vec::new(),
            legacy: LegacyMarkers::default(),
            request_url: None,
            response_url: None,
            origin: None,
        }
    }

    /// Add an extra method unless one with the same verb and path exists.
    pub fn push_extra_method(&mut self, spec: ExtraMethodSpec) -> bool {
        let exists = self
            .extra_methods
            .iter()
            .any(|m| m.verb == spec.verb && m.path == spec.path);
        if !exists {
            self.extra_methods.push(spec);
        }
        !exists
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_idents() {
        assert_eq!(Operation::from_ident("C"), Some(Operation::Create));
        assert_eq!(Operation::from_ident("Delete"), Some(Operation::Delete));
        assert_eq!(Operation::from_ident("X"), None);
        assert_eq!(Operation::from_ident("Remove"), None);
    }

    #[test]
    fn test_letters_use_canonical_order() {
        let set = OperationSet::new(
            [Operation::Delete, Operation::Read, Operation::Create],
            "/w",
            "m",
        );
        assert_eq!(set.letters(), "CRD");
    }

    #[test]
    fn test_extra_methods_dedupe_on_verb_and_path() {
        let mut d = ResourceDescriptor::new("Widget");
        let spec = ExtraMethodSpec {
            verb: Method::POST,
            path: "/w/{id}/restart".to_string(),
            async_wait: None,
            marker: "a".to_string(),
        };
        assert!(d.push_extra_method(spec.clone()));
        assert!(!d.push_extra_method(ExtraMethodSpec {
            marker: "b".to_string(),
            ..spec
        }));
        assert_eq!(d.extra_methods.len(), 1);
    }
}
