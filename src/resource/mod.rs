//! # Resource Descriptors
//!
//! Builds one [`ResourceDescriptor`] per resource from source facts:
//!
//! 1. [`assemble`] folds type and package annotations into descriptors.
//! 2. [`apply_legacy`] gives resources without an operation set the one
//!    implied by `details`/`upsert`.
//! 3. [`recover`] turns hand-written wiring into descriptors.
//! 4. [`merge`] combines both; annotations win, extra methods are unioned.
//!
//! [`collect`] runs all four.

mod assembly;
mod descriptor;
mod wiring;

pub use assembly::{apply_legacy, assemble, Assembly};
pub use descriptor::*;
pub(crate) use descriptor::serialize_method;
pub use wiring::{merge, recover};

use crate::config::Policy;
use crate::error::FatalError;
use crate::linter::LintIssue;
use crate::markers::MarkerRegistry;
use crate::source::FactExtractor;
use std::collections::BTreeMap;

/// Descriptors ready for validation, keyed (and ordered) by resource name.
#[derive(Debug, Default)]
pub struct Collected {
    pub descriptors: BTreeMap<String, ResourceDescriptor>,
    pub lints: Vec<LintIssue>,
}

/// Extract facts and build the final descriptor set.
pub fn collect(
    extractor: &dyn FactExtractor,
    registry: &MarkerRegistry,
    namespace: &str,
    policy: &Policy,
) -> Result<Collected, FatalError> {
    let annotations = extractor.annotations().map_err(FatalError::Extraction)?;
    let wiring_facts = extractor.wiring().map_err(FatalError::Extraction)?;

    let Assembly {
        mut descriptors,
        skipped,
        mut lints,
    } = assemble(&annotations, registry, namespace, policy)?;

    // Legacy sets count as annotated ones, so they must exist before wiring merges in.
    for descriptor in descriptors.values_mut() {
        apply_legacy(descriptor, namespace);
    }

    let (wired, wiring_lints) = recover(&wiring_facts, registry, namespace, policy.default_wait);
    lints.extend(wiring_lints);
    merge(&mut descriptors, wired, &skipped);

    tracing::debug!(
        resources = descriptors.len(),
        lints = lints.len(),
        "assembled resource descriptors"
    );
    Ok(Collected { descriptors, lints })
}
