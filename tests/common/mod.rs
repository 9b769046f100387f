#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use clientgen::config::Policy;
use clientgen::generator::{generate_model, GenerationModel};
use clientgen::resource::{collect, ResourceDescriptor};
use clientgen::markers::MarkerRegistry;
use clientgen::source::StaticFacts;
use clientgen::spec::{load_provider, OpenApiProvider};
use clientgen::FatalError;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const NS: &str = "clientgen";

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn accounts() -> OpenApiProvider {
    load_provider(&fixture_path("accounts.yaml")).unwrap()
}

/// In-memory facts: one `(declaration, annotation)` pair per line.
pub fn facts(annotations: &[(&str, &str)]) -> StaticFacts {
    annotations
        .iter()
        .fold(StaticFacts::new(), |facts, (decl, text)| facts.with_type(decl, text))
}

pub fn descriptors(facts: &StaticFacts, policy: &Policy) -> Result<BTreeMap<String, ResourceDescriptor>, FatalError> {
    let registry = MarkerRegistry::with_defaults(NS)?;
    Ok(collect(facts, &registry, NS, policy)?.descriptors)
}

/// Annotations to generation model against the accounts fixture.
pub fn generate(annotations: &[(&str, &str)], policy: &Policy) -> Result<GenerationModel, FatalError> {
    let provider = accounts();
    let descriptors = descriptors(&facts(annotations), policy)?;
    generate_model(&provider, &descriptors, policy)
}
