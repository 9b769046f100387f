use super::assembly::{extra_methods, parse_own};
use super::descriptor::{Operation, OperationSet, ResourceDescriptor};
use crate::linter::{LintIssue, LintSeverity};
use crate::markers::{Feature, MarkerRegistry, Target, WaitTimeout};
use crate::source::WiringFact;
use std::collections::{BTreeMap, BTreeSet};

/// Turn wiring facts into descriptors, one per resource.
///
/// The base path and operation letters come from the field initialiser;
/// extra methods come from annotations in the field's doc comment. Several
/// fields holding the same resource are folded together.
pub fn recover(
    facts: &[WiringFact],
    registry: &MarkerRegistry,
    namespace: &str,
    default_wait: WaitTimeout,
) -> (Vec<ResourceDescriptor>, Vec<LintIssue>) {
    let mut lints = Vec::new();
    let mut out: BTreeMap<String, ResourceDescriptor> = BTreeMap::new();

    for fact in facts {
        let location = format!("{}:{}", fact.origin, fact.field);
        let mut descriptor = ResourceDescriptor::new(&fact.resource);
        descriptor.origin = Some(fact.origin.clone());

        let mut ops = BTreeSet::new();
        for ident in &fact.operations {
            match Operation::from_ident(ident) {
                Some(op) => {
                    ops.insert(op);
                }
                None => lints.push(LintIssue::new(
                    &location,
                    LintSeverity::Warning,
                    "unknown_operation_letter",
                    format!("wiring for `{}` passes unknown operation `{ident}`", fact.resource),
                )),
            }
        }
        if let Some(base) = fact.base_path.as_deref().filter(|p| !p.trim().is_empty()) {
            descriptor.operation_set = Some(OperationSet::new(
                ops,
                base,
                &format!("wiring:{}", fact.field),
            ));
        }

        for line in fact.comments.iter().filter(|l| l.starts_with('+')) {
            let Some(m) = parse_own(line, namespace, &location, &mut lints) else {
                continue;
            };
            if registry.lookup(&m.raw, Target::Field).is_none() {
                continue;
            }
            if !matches!(m.feature, Feature::ExtraMethod | Feature::AsyncExtraMethod) {
                continue;
            }
            let path = match m.require_payload() {
                Ok(path) => path,
                Err(err) => {
                    lints.push(LintIssue::new(
                        &location,
                        LintSeverity::Error,
                        "missing_payload",
                        err.to_string(),
                    ));
                    continue;
                }
            };
            for spec in extra_methods(&m, path, default_wait, &location, &mut lints) {
                descriptor.push_extra_method(spec);
            }
        }

        match out.get_mut(&fact.resource) {
            Some(existing) => merge_into(existing, descriptor),
            None => {
                out.insert(fact.resource.clone(), descriptor);
            }
        }
    }

    (out.into_values().collect(), lints)
}

fn merge_into(target: &mut ResourceDescriptor, other: ResourceDescriptor) {
    if target.operation_set.is_none() {
        target.operation_set = other.operation_set;
    }
    for spec in other.extra_methods {
        target.push_extra_method(spec);
    }
}

/// Merge wiring descriptors into the annotated ones.
///
/// Annotations win on conflict: an annotated operation set is kept, and the
/// wiring set is only adopted when the annotations declared none. Extra
/// methods are unioned. Wiring-only resources are added unless they have no
/// base path or were skipped by annotation.
pub fn merge(
    annotated: &mut BTreeMap<String, ResourceDescriptor>,
    wiring: Vec<ResourceDescriptor>,
    skipped: &BTreeSet<String>,
) {
    for descriptor in wiring {
        if skipped.contains(&descriptor.name) {
            continue;
        }
        match annotated.get_mut(&descriptor.name) {
            Some(existing) => merge_into(existing, descriptor),
            None if descriptor.operation_set.is_some() => {
                tracing::debug!(resource = %descriptor.name, "resource synthesised from wiring");
                annotated.insert(descriptor.name.clone(), descriptor);
            }
            None => {
                tracing::debug!(resource = %descriptor.name, "wiring without base path ignored");
            }
        }
    }
}
