use super::descriptor::{
    ExtraMethodSpec, Operation, OperationSet, ResourceDescriptor, UrlOverride,
};
use crate::config::{OperationSetPolicy, Policy};
use crate::error::FatalError;
use crate::linter::{LintIssue, LintSeverity};
use crate::markers::{Feature, MarkerRegistry, MarkerValue, ParsedMarker, Target, WaitTimeout};
use crate::source::AnnotationFact;
use std::collections::{BTreeMap, BTreeSet};

/// Descriptors assembled from annotations.
#[derive(Debug, Default)]
pub struct Assembly {
    pub descriptors: BTreeMap<String, ResourceDescriptor>,
    /// Resources dropped by a `skip` marker. Wiring must not bring them back.
    pub skipped: BTreeSet<String>,
    pub lints: Vec<LintIssue>,
}

/// Parse an annotation that belongs to `namespace`.
///
/// Returns `None` for foreign annotations. Malformed annotations of our
/// namespace are reported and skipped.
pub(crate) fn parse_own(
    text: &str,
    namespace: &str,
    location: &str,
    lints: &mut Vec<LintIssue>,
) -> Option<ParsedMarker> {
    match ParsedMarker::parse(text) {
        Ok(m) if m.namespace == namespace => Some(m),
        Ok(_) => None,
        Err(err) => {
            if text.trim_start().starts_with(&format!("+{namespace}:")) {
                lints.push(LintIssue::new(
                    location,
                    LintSeverity::Error,
                    "malformed_annotation",
                    err.to_string(),
                ));
            }
            None
        }
    }
}

/// Expand an `extraMethod`/`asyncExtraMethod` annotation into one spec per verb.
pub(crate) fn extra_methods(
    marker: &ParsedMarker,
    path: &str,
    default_wait: WaitTimeout,
    location: &str,
    lints: &mut Vec<LintIssue>,
) -> Vec<ExtraMethodSpec> {
    let verbs = match marker.verbs() {
        Ok(verbs) => verbs,
        Err(err) => {
            lints.push(LintIssue::new(
                location,
                LintSeverity::Error,
                "unsupported_verb",
                err.to_string(),
            ));
            return Vec::new();
        }
    };

    let mut wait = None;
    if let Some(option) = &marker.option {
        if option.name == "wait" {
            wait = Some(WaitTimeout::parse(&option.value).unwrap_or_else(|| {
                lints.push(
                    LintIssue::new(
                        location,
                        LintSeverity::Warning,
                        "unsupported_wait",
                        format!(
                            "`{}` uses unsupported wait timeout `{}`; using {default_wait}",
                            marker.raw, option.value
                        ),
                    )
                    .with_suggestion("Use one of 30s, 1m, 2m, 5m, 10m, 15m, 20m, 30m, 1h, 2h"),
                );
                default_wait
            }));
        } else {
            lints.push(LintIssue::new(
                location,
                LintSeverity::Warning,
                "unknown_option",
                format!("`{}` has unknown option `{}`", marker.raw, option.name),
            ));
        }
    }
    if marker.feature == Feature::AsyncExtraMethod && wait.is_none() {
        wait = Some(default_wait);
    }

    verbs
        .into_iter()
        .map(|verb| ExtraMethodSpec {
            verb,
            path: path.to_string(),
            async_wait: wait,
            marker: marker.raw.clone(),
        })
        .collect()
}

fn with_base_path(base: Option<&String>, path: &str) -> String {
    match base {
        Some(prefix) if !path.starts_with(prefix.as_str()) => {
            format!("{}{}", prefix.trim_end_matches('/'), path)
        }
        _ => path.to_string(),
    }
}

/// Fold annotation facts into one descriptor per annotated type.
///
/// Only `Type` and `Package` facts are used; field annotations belong to the
/// wiring front end.
pub fn assemble(
    facts: &[AnnotationFact],
    registry: &MarkerRegistry,
    namespace: &str,
    policy: &Policy,
) -> Result<Assembly, FatalError> {
    let mut assembly = Assembly::default();

    let mut base_paths: BTreeMap<&str, String> = BTreeMap::new();
    for fact in facts.iter().filter(|f| f.target == Target::Package) {
        let Some(m) = parse_own(&fact.text, namespace, &fact.origin, &mut assembly.lints) else {
            continue;
        };
        if m.feature == Feature::BasePath && registry.lookup(&m.raw, Target::Package).is_some() {
            if let Some(prefix) = m.payload {
                base_paths.insert(&fact.origin, prefix);
            }
        }
    }

    let mut by_type: BTreeMap<&str, Vec<&AnnotationFact>> = BTreeMap::new();
    for fact in facts.iter().filter(|f| f.target == Target::Type) {
        by_type.entry(&fact.declaration).or_default().push(fact);
    }

    for (name, facts) in by_type {
        let mut descriptor = ResourceDescriptor::new(name);
        descriptor.origin = facts.first().map(|f| f.origin.clone());
        let mut recognised = false;
        let mut skip = false;

        for fact in facts {
            let location = format!("{}:{name}", fact.origin);
            let lints = &mut assembly.lints;
            let Some(m) = parse_own(&fact.text, namespace, &location, lints) else {
                continue;
            };
            let Some(def) = registry.lookup(&m.raw, Target::Type) else {
                continue;
            };

            if m.feature == Feature::Skip {
                match def.parse_value(m.payload.as_deref()) {
                    Ok(MarkerValue::Bool(false)) => {}
                    Ok(_) => skip = true,
                    Err(err) => lints.push(LintIssue::new(
                        &location,
                        LintSeverity::Error,
                        "invalid_payload",
                        err.to_string(),
                    )),
                }
                continue;
            }

            let payload = match m.require_payload() {
                Ok(payload) => payload,
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
            let path = with_base_path(base_paths.get(fact.origin.as_str()), payload);

            match &m.feature {
                Feature::Ops => {
                    let mut ops = BTreeSet::new();
                    for c in m.args.as_deref().unwrap_or_default().chars() {
                        match Operation::from_letter(c) {
                            Some(op) => {
                                ops.insert(op);
                            }
                            None => lints.push(LintIssue::new(
                                &location,
                                LintSeverity::Error,
                                "unknown_operation_letter",
                                format!("`{}` uses unknown operation letter `{c}`", m.raw),
                            )),
                        }
                    }
                    recognised = true;
                    let set = OperationSet::new(ops, &path, &m.raw);
                    match descriptor.operation_set.as_ref() {
                        None => descriptor.operation_set = Some(set),
                        Some(existing) => {
                            let severity = if policy.operation_set == OperationSetPolicy::Reject {
                                LintSeverity::Error
                            } else {
                                LintSeverity::Warning
                            };
                            lints.push(
                                LintIssue::new(
                                    &location,
                                    severity,
                                    "duplicate_operation_set",
                                    format!(
                                        "`{}` repeats the operation set already declared by `{}`",
                                        m.raw, existing.marker
                                    ),
                                )
                                .with_suggestion("Declare a single ops marker per resource"),
                            );
                            match policy.operation_set {
                                OperationSetPolicy::FirstWins => {}
                                OperationSetPolicy::LastWins => descriptor.operation_set = Some(set),
                                OperationSetPolicy::Reject => {
                                    return Err(FatalError::DuplicateOperationSet {
                                        resource: name.to_string(),
                                        marker: m.raw.clone(),
                                    });
                                }
                            }
                        }
                    }
                }
                Feature::ExtraMethod | Feature::AsyncExtraMethod => {
                    recognised = true;
                    for spec in extra_methods(&m, &path, policy.default_wait, &location, lints) {
                        descriptor.push_extra_method(spec);
                    }
                }
                Feature::RequestUrl | Feature::ResponseUrl => {
                    let verb = match m.verbs() {
                        Ok(verbs) if verbs.len() == 1 => verbs.into_iter().next(),
                        Ok(_) => {
                            lints.push(LintIssue::new(
                                &location,
                                LintSeverity::Error,
                                "unsupported_verb",
                                format!("`{}` must name exactly one verb", m.raw),
                            ));
                            None
                        }
                        Err(err) => {
                            lints.push(LintIssue::new(
                                &location,
                                LintSeverity::Error,
                                "unsupported_verb",
                                err.to_string(),
                            ));
                            None
                        }
                    };
                    let Some(verb) = verb else { continue };
                    recognised = true;
                    let slot = if m.feature == Feature::RequestUrl {
                        &mut descriptor.request_url
                    } else {
                        &mut descriptor.response_url
                    };
                    if slot.is_none() {
                        *slot = Some(UrlOverride {
                            verb,
                            path,
                            marker: m.raw.clone(),
                        });
                    } else {
                        lints.push(LintIssue::new(
                            &location,
                            LintSeverity::Warning,
                            "duplicate_url_override",
                            format!("`{}` ignored; an override is already declared", m.raw),
                        ));
                    }
                }
                Feature::Details => {
                    recognised = true;
                    descriptor.legacy.details.get_or_insert(path);
                }
                Feature::Upsert => {
                    recognised = true;
                    descriptor.legacy.upsert.get_or_insert(path);
                }
                Feature::Skip | Feature::BasePath | Feature::Unknown(_) => {}
            }
        }

        if skip {
            tracing::debug!(resource = %name, "resource skipped by annotation");
            assembly.skipped.insert(name.to_string());
            continue;
        }
        if !recognised {
            continue;
        }
        assembly.descriptors.insert(name.to_string(), descriptor);
    }

    Ok(assembly)
}

/// Give resources without an operation-set marker the set implied by their
/// legacy markers: `details` means Read, `upsert` means Create and Update.
pub fn apply_legacy(descriptor: &mut ResourceDescriptor, namespace: &str) {
    if descriptor.operation_set.is_some() {
        if !descriptor.legacy.is_empty() {
            tracing::debug!(
                resource = %descriptor.name,
                "legacy markers ignored; an operation set is declared"
            );
        }
        return;
    }

    let mut ops = BTreeSet::new();
    if descriptor.legacy.details.is_some() {
        ops.insert(Operation::Read);
    }
    if descriptor.legacy.upsert.is_some() {
        ops.insert(Operation::Create);
        ops.insert(Operation::Update);
    }
    let (feature, path) = match (&descriptor.legacy.upsert, &descriptor.legacy.details) {
        (Some(path), _) => ("upsert", path),
        (None, Some(path)) => ("details", path),
        (None, None) => return,
    };
    let marker = format!("+{namespace}:{feature}={path}");
    descriptor.operation_set = Some(OperationSet::new(ops, path, &marker));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FactExtractor, StaticFacts};
    use http::Method;

    fn run(facts: StaticFacts, policy: &Policy) -> Result<Assembly, FatalError> {
        let registry = MarkerRegistry::with_defaults("clientgen").unwrap();
        assemble(&facts.annotations().unwrap(), &registry, "clientgen", policy)
    }

    #[test]
    fn test_assemble_ops_and_extra_methods() {
        let facts = StaticFacts::new()
            .with_type("Widget", "+clientgen:ops:CRUD=/widgets")
            .with_type("Widget", "+clientgen:extraMethod:POST|PUT=/widgets/{id}/restart")
            .with_type("Widget", "+clientgen:asyncExtraMethod:POST[wait(10m)]=/widgets/{id}/rebuild");
        let assembly = run(facts, &Policy::default()).unwrap();
        let widget = &assembly.descriptors["Widget"];

        let set = widget.operation_set.as_ref().unwrap();
        assert_eq!(set.letters(), "CRUD");
        assert_eq!(set.path, "/widgets");

        assert_eq!(widget.extra_methods.len(), 3);
        assert_eq!(widget.extra_methods[0].verb, Method::POST);
        assert_eq!(widget.extra_methods[1].verb, Method::PUT);
        assert!(!widget.extra_methods[0].is_async());
        assert_eq!(
            widget.extra_methods[2].async_wait.map(|w| w.seconds()),
            Some(600)
        );
        assert!(assembly.lints.is_empty());
    }

    #[test]
    fn test_unannotated_and_foreign_types_are_dropped() {
        let facts = StaticFacts::new()
            .with_type("Plain", "+other:ops:CRUD=/plain")
            .with_type("Unknown", "+clientgen:frobnicate=/x");
        let assembly = run(facts, &Policy::default()).unwrap();
        assert!(assembly.descriptors.is_empty());
    }

    #[test]
    fn test_duplicate_operation_set_policies() {
        let facts = || {
            StaticFacts::new()
                .with_type("Widget", "+clientgen:ops:CR=/widgets")
                .with_type("Widget", "+clientgen:ops:LD=/widgets")
        };

        let first = run(facts(), &Policy::default()).unwrap();
        assert_eq!(
            first.descriptors["Widget"].operation_set.as_ref().unwrap().letters(),
            "CR"
        );
        assert_eq!(first.lints.len(), 1);
        assert_eq!(first.lints[0].kind, "duplicate_operation_set");

        let last_policy = Policy {
            operation_set: OperationSetPolicy::LastWins,
            ..Policy::default()
        };
        let last = run(facts(), &last_policy).unwrap();
        assert_eq!(
            last.descriptors["Widget"].operation_set.as_ref().unwrap().letters(),
            "LD"
        );

        let reject_policy = Policy {
            operation_set: OperationSetPolicy::Reject,
            ..Policy::default()
        };
        assert!(matches!(
            run(facts(), &reject_policy),
            Err(FatalError::DuplicateOperationSet { .. })
        ));
    }

    #[test]
    fn test_unsupported_wait_falls_back_to_default() {
        let facts = StaticFacts::new()
            .with_type("Widget", "+clientgen:asyncExtraMethod:POST[wait(3m)]=/widgets/{id}/rebuild")
            .with_type("Widget", "+clientgen:extraMethod:POST[wait(1h)]=/widgets/{id}/sync");
        let assembly = run(facts, &Policy::default()).unwrap();
        let widget = &assembly.descriptors["Widget"];
        assert_eq!(widget.extra_methods[0].async_wait, Some(WaitTimeout::default()));
        assert_eq!(
            widget.extra_methods[1].async_wait.map(|w| w.literal()),
            Some("1h")
        );
        assert_eq!(assembly.lints.len(), 1);
        assert_eq!(assembly.lints[0].kind, "unsupported_wait");
        assert_eq!(assembly.lints[0].severity, LintSeverity::Warning);
    }

    #[test]
    fn test_unknown_letter_is_reported_and_ignored() {
        let facts = StaticFacts::new().with_type("Widget", "+clientgen:ops:CXR=/widgets");
        let assembly = run(facts, &Policy::default()).unwrap();
        assert_eq!(
            assembly.descriptors["Widget"].operation_set.as_ref().unwrap().letters(),
            "CR"
        );
        assert_eq!(assembly.lints[0].kind, "unknown_operation_letter");
    }

    #[test]
    fn test_path_marker_without_payload_is_reported() {
        let facts = StaticFacts::new()
            .with_type("Widget", "+clientgen:ops:CR")
            .with_type("Widget", "+clientgen:extraMethod:POST=/widgets/{id}/restart");
        let assembly = run(facts, &Policy::default()).unwrap();
        let widget = &assembly.descriptors["Widget"];
        assert!(widget.operation_set.is_none());
        assert_eq!(widget.extra_methods.len(), 1);
        assert_eq!(assembly.lints.len(), 1);
        assert_eq!(assembly.lints[0].kind, "missing_payload");
        assert_eq!(assembly.lints[0].severity, LintSeverity::Error);
        assert!(assembly.lints[0].message.contains("+clientgen:ops:CR"));
    }

    #[test]
    fn test_legacy_markers_never_override_explicit_set() {
        let facts = StaticFacts::new()
            .with_type("Widget", "+clientgen:details=/widgets/{id}")
            .with_type("Widget", "+clientgen:ops:L=/widgets")
            .with_type("Gadget", "+clientgen:details=/gadgets/{id}")
            .with_type("Gadget", "+clientgen:upsert=/gadgets");
        let mut assembly = run(facts, &Policy::default()).unwrap();
        for d in assembly.descriptors.values_mut() {
            apply_legacy(d, "clientgen");
        }
        assert_eq!(
            assembly.descriptors["Widget"].operation_set.as_ref().unwrap().letters(),
            "L"
        );
        let gadget = assembly.descriptors["Gadget"].operation_set.as_ref().unwrap();
        assert_eq!(gadget.letters(), "CRU");
        assert_eq!(gadget.path, "/gadgets");
    }

    #[test]
    fn test_package_base_path_and_skip() {
        let facts = StaticFacts::new()
            .with_package("+clientgen:basePath=/v1")
            .with_type("Widget", "+clientgen:ops:R=/widgets/{id}")
            .with_type("Already", "+clientgen:ops:R=/v1/already")
            .with_type("Hidden", "+clientgen:ops:R=/hidden")
            .with_type("Hidden", "+clientgen:skip")
            .with_type("Shown", "+clientgen:ops:R=/shown")
            .with_type("Shown", "+clientgen:skip=false");
        let assembly = run(facts, &Policy::default()).unwrap();
        assert_eq!(
            assembly.descriptors["Widget"].operation_set.as_ref().unwrap().path,
            "/v1/widgets/{id}"
        );
        assert_eq!(
            assembly.descriptors["Already"].operation_set.as_ref().unwrap().path,
            "/v1/already"
        );
        assert!(!assembly.descriptors.contains_key("Hidden"));
        assert!(assembly.skipped.contains("Hidden"));
        assert!(assembly.descriptors.contains_key("Shown"));
    }

    #[test]
    fn test_url_overrides() {
        let facts = StaticFacts::new()
            .with_type("Widget", "+clientgen:ops:R=/widgets")
            .with_type("Widget", "+clientgen:responseUrl:GET=/widgets/{id}/full")
            .with_type("Widget", "+clientgen:requestUrl:POST|PUT=/widgets");
        let assembly = run(facts, &Policy::default()).unwrap();
        let widget = &assembly.descriptors["Widget"];
        assert_eq!(widget.response_url.as_ref().unwrap().path, "/widgets/{id}/full");
        assert!(widget.request_url.is_none());
        assert_eq!(assembly.lints[0].kind, "unsupported_verb");
    }
}
