//! # Source Facts
//!
//! The engine never reads source files directly. A [`FactExtractor`] turns
//! whatever the front end understands into two flat lists:
//!
//! - [`AnnotationFact`]: one annotation line attached to a declaration.
//! - [`WiringFact`]: one resource recovered from hand-written registration
//!   code (base path, CRUD letters, documented extra methods).
//!
//! [`RustSourceExtractor`] reads Rust crates with `syn`; [`StaticFacts`]
//! serves facts built in memory.

mod rust;

pub use rust::RustSourceExtractor;

use crate::markers::Target;
use serde::Serialize;

/// One annotation line and the declaration it is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationFact {
    /// Type name, `Struct.field`, or the file path for package annotations.
    pub declaration: String,
    pub target: Target,
    /// Annotation text, starting with `+`.
    pub text: String,
    /// Source file the annotation was read from.
    pub origin: String,
}

/// A resource registered by hand in wiring code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WiringFact {
    /// Resource type named in the field's generic argument.
    pub resource: String,
    /// Field that holds the resource handle.
    pub field: String,
    /// String literal passed to the field initialiser.
    pub base_path: Option<String>,
    /// Bare operation identifiers passed to the initialiser (`C`, `Read`, ...).
    pub operations: Vec<String>,
    /// Doc-comment lines of the field.
    pub comments: Vec<String>,
    pub origin: String,
}

/// Produces source facts for one generation run.
pub trait FactExtractor {
    fn annotations(&self) -> anyhow::Result<Vec<AnnotationFact>>;

    fn wiring(&self) -> anyhow::Result<Vec<WiringFact>>;
}

/// Facts supplied directly, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticFacts {
    annotations: Vec<AnnotationFact>,
    wiring: Vec<WiringFact>,
}

impl StaticFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a type-level annotation to `declaration`.
    #[must_use]
    pub fn with_type(self, declaration: &str, text: &str) -> Self {
        self.with_annotation(AnnotationFact {
            declaration: declaration.to_string(),
            target: Target::Type,
            text: text.to_string(),
            origin: "<memory>".to_string(),
        })
    }

    /// Add a package-level annotation for the in-memory origin.
    #[must_use]
    pub fn with_package(self, text: &str) -> Self {
        self.with_annotation(AnnotationFact {
            declaration: "<memory>".to_string(),
            target: Target::Package,
            text: text.to_string(),
            origin: "<memory>".to_string(),
        })
    }

    #[must_use]
    pub fn with_annotation(mut self, fact: AnnotationFact) -> Self {
        self.annotations.push(fact);
        self
    }

    #[must_use]
    pub fn with_wiring(mut self, fact: WiringFact) -> Self {
        self.wiring.push(fact);
        self
    }
}

impl FactExtractor for StaticFacts {
    fn annotations(&self) -> anyhow::Result<Vec<AnnotationFact>> {
        Ok(self.annotations.clone())
    }

    fn wiring(&self) -> anyhow::Result<Vec<WiringFact>> {
        Ok(self.wiring.clone())
    }
}
