use super::model::{
    ExtraMethodModel, GeneratedType, GenerationModel, ModelKind, OperationModel, ResourceModel,
};
use crate::config::Policy;
use crate::error::{BuildError, FatalError};
use crate::linter::LintIssue;
use crate::markers::MarkerRegistry;
use crate::model::{last_literal_segment, to_camel_case, unique_name, ModelBody, ModelBuilder};
use crate::resource::{collect, ExtraMethodSpec, Operation, ResourceDescriptor};
use crate::source::FactExtractor;
use crate::spec::{SchemaPart, SchemaProvider};
use crate::validator::{GateOutcome, IssueReason, Route, ValidationGate, ValidationIssue};
use http::Method;
use std::collections::{BTreeMap, BTreeSet};

/// Recoverable build failures as issue reasons.
fn issue_reason(err: &BuildError) -> IssueReason {
    match err {
        BuildError::SchemaNotFound { .. } => IssueReason::MissingSchema,
        BuildError::Indeterminate { .. } => IssueReason::AmbiguousSchema,
        BuildError::ArrayOfAmbiguousObjects { .. } => IssueReason::ArrayOfAmbiguousObjects,
        BuildError::EmptyFields { .. } => IssueReason::EmptyFields,
    }
}

fn verb_name(verb: &Method) -> String {
    to_camel_case(&verb.as_str().to_ascii_lowercase())
}

/// Drives validation and model building for a set of resource descriptors.
pub struct Generator<'a> {
    provider: &'a dyn SchemaProvider,
    policy: &'a Policy,
    builder: ModelBuilder<'a>,
    /// Top-level model names handed out so far.
    names: BTreeSet<String>,
}

/// Where a top-level model is read from.
struct ModelSource {
    op: Option<Operation>,
    route: Route,
    part: SchemaPart,
}

impl ModelSource {
    fn label(&self) -> String {
        match self.op {
            Some(op) => op.to_string(),
            None => self.route.to_string(),
        }
    }
}

impl<'a> Generator<'a> {
    pub fn new(provider: &'a dyn SchemaProvider, policy: &'a Policy) -> Self {
        Generator {
            provider,
            policy,
            builder: ModelBuilder::new(provider, policy.alias_components),
            names: BTreeSet::new(),
        }
    }

    /// Validate and build every descriptor, in name order.
    ///
    /// Fails on the first fatal error; everything else ends up as an issue
    /// on the resource it belongs to.
    pub fn generate<'d>(
        mut self,
        descriptors: impl IntoIterator<Item = &'d ResourceDescriptor>,
    ) -> Result<GenerationModel, FatalError> {
        let mut sorted: Vec<&ResourceDescriptor> = descriptors.into_iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let gate = ValidationGate::new(self.provider, self.policy);
        let mut gated = Vec::with_capacity(sorted.len());
        for descriptor in sorted {
            let outcome = gate.check_resource(descriptor)?;
            gated.push((descriptor, outcome));
        }

        let mut resources = Vec::with_capacity(gated.len());
        for (descriptor, outcome) in gated {
            resources.push(self.build_resource(descriptor, outcome));
        }

        let issues: Vec<ValidationIssue> = resources
            .iter()
            .flat_map(|r| r.issues.iter().cloned())
            .collect();
        let (registry, aliases) = self.builder.into_parts();
        tracing::info!(
            resources = resources.len(),
            types = registry.len(),
            aliases = aliases.len(),
            issues = issues.len(),
            "generation model built"
        );
        Ok(GenerationModel {
            resources,
            types: registry.types(),
            aliases,
            issues,
        })
    }

    fn build(
        &mut self,
        name: &str,
        kind: ModelKind,
        source: &ModelSource,
    ) -> Result<Option<GeneratedType>, BuildError> {
        let present = self
            .provider
            .operation_schema(&source.route.verb, &source.route.path, source.part)
            .ok()
            .flatten()
            .is_some();
        if !present {
            return Ok(None);
        }
        let name = unique_name(&mut self.names, name);
        let body = self
            .builder
            .build_operation(&name, &source.route.verb, &source.route.path, source.part)?;
        Ok(Some(GeneratedType {
            name,
            kind,
            source: source.label(),
            body,
        }))
    }

    /// Response model: the item response, else the list row, else the
    /// Create or Update response. A response URL override takes precedence.
    fn response_source(&self, descriptor: &ResourceDescriptor, outcome: &GateOutcome) -> Option<ModelSource> {
        if let Some(url) = &descriptor.response_url {
            return Some(ModelSource {
                op: None,
                route: Route {
                    verb: url.verb.clone(),
                    path: url.path.clone(),
                },
                part: SchemaPart::Response,
            });
        }
        [
            (Operation::Read, SchemaPart::Response),
            (Operation::List, SchemaPart::UnwrappedResponse),
            (Operation::Create, SchemaPart::Response),
            (Operation::Update, SchemaPart::Response),
        ]
        .into_iter()
        .find_map(|(op, part)| {
            outcome.routes.get(&op).map(|route| ModelSource {
                op: Some(op),
                route: route.clone(),
                part,
            })
        })
    }

    fn request_source(&self, descriptor: &ResourceDescriptor, outcome: &GateOutcome) -> Option<ModelSource> {
        if let Some(url) = &descriptor.request_url {
            return Some(ModelSource {
                op: None,
                route: Route {
                    verb: url.verb.clone(),
                    path: url.path.clone(),
                },
                part: SchemaPart::Request,
            });
        }
        [Operation::Create, Operation::Update]
            .into_iter()
            .find_map(|op| {
                outcome.routes.get(&op).map(|route| ModelSource {
                    op: Some(op),
                    route: route.clone(),
                    part: SchemaPart::Request,
                })
            })
    }

    /// Build a model and turn a failure into an exclusion of its source operation.
    fn build_or_exclude(
        &mut self,
        resource: &str,
        name: &str,
        kind: ModelKind,
        source: Option<ModelSource>,
        outcome: &mut GateOutcome,
    ) -> Option<GeneratedType> {
        let source = source?;
        match self.build(name, kind, &source) {
            Ok(generated) => generated,
            Err(err) => {
                tracing::debug!(resource, model = name, %err, "model build failed");
                match source.op {
                    Some(op) => outcome.exclude(resource, op, issue_reason(&err), err.to_string()),
                    None => outcome.issues.push(ValidationIssue::new(
                        resource,
                        source.label(),
                        issue_reason(&err),
                        err.to_string(),
                    )),
                }
                outcome.cascade(resource);
                None
            }
        }
    }

    fn build_resource(&mut self, descriptor: &ResourceDescriptor, mut outcome: GateOutcome) -> ResourceModel {
        let name = descriptor.name.as_str();
        let mut types = Vec::new();

        let source = self.response_source(descriptor, &outcome);
        let response = self.build_or_exclude(name, name, ModelKind::ResponseModel, source, &mut outcome);
        let source = self.request_source(descriptor, &outcome);
        let request = self.build_or_exclude(
            name,
            &format!("{name}Request"),
            ModelKind::RequestBody,
            source,
            &mut outcome,
        );

        // Filters are only generated for resources that can both list and read.
        let search_params = if outcome.operations.contains(&Operation::List)
            && outcome.operations.contains(&Operation::Read)
        {
            self.search_params(name, &outcome)
        } else {
            None
        };

        let response_name = response.as_ref().map(|t| t.name.clone());
        let request_name = request.as_ref().map(|t| t.name.clone());
        let search_name = search_params.as_ref().map(|t| t.name.clone());
        types.extend(search_params);
        types.extend(request);
        types.extend(response);

        let operations = outcome
            .routes
            .iter()
            .map(|(op, route)| OperationModel {
                operation: *op,
                route: route.clone(),
                summary: self.provider.operation_summary(&route.verb, &route.path),
                request: match op {
                    Operation::Create | Operation::Update => request_name.clone(),
                    _ => None,
                },
                response: match op {
                    Operation::Delete => None,
                    _ => response_name.clone(),
                },
                search_params: match op {
                    Operation::List => search_name.clone(),
                    _ => None,
                },
            })
            .collect();

        let mut extra_methods = Vec::with_capacity(outcome.extra_methods.len());
        for method in &outcome.extra_methods {
            if let Some((model, generated)) = self.extra_method(name, method, &mut outcome.issues) {
                types.extend(generated);
                extra_methods.push(model);
            }
        }

        for skipped in self.builder.take_skipped() {
            outcome.issues.push(ValidationIssue::new(
                name,
                format!("{}.{}", skipped.type_name, skipped.property),
                IssueReason::SkippedProperty,
                format!("property skipped: {:?}", skipped.reason),
            ));
        }

        let kept: String = outcome.operations.iter().map(|o| o.letter()).collect();
        tracing::debug!(resource = name, ops = %kept, "resource built");

        ResourceModel {
            name: name.to_string(),
            path: descriptor.operation_set.as_ref().map(|s| s.path.clone()),
            operations,
            extra_methods,
            types,
            request_url: descriptor.request_url.as_ref().map(|u| Route {
                verb: u.verb.clone(),
                path: u.path.clone(),
            }),
            response_url: descriptor.response_url.as_ref().map(|u| Route {
                verb: u.verb.clone(),
                path: u.path.clone(),
            }),
            issues: outcome.issues,
        }
    }

    fn search_params(&mut self, resource: &str, outcome: &GateOutcome) -> Option<GeneratedType> {
        let route = outcome.routes.get(&Operation::Read)?;
        let resolved = self
            .provider
            .operation_schema(&route.verb, &route.path, SchemaPart::Response)
            .ok()
            .flatten()?;
        let fields = self.builder.search_params(&resolved.schema);
        if fields.is_empty() {
            return None;
        }
        Some(GeneratedType {
            name: unique_name(&mut self.names, &format!("{resource}SearchParams")),
            kind: ModelKind::SearchParams,
            source: Operation::List.to_string(),
            body: ModelBody::Fields {
                fields,
                additional_properties: None,
            },
        })
    }

    /// Models of one extra method, or `None` when either fails to build.
    fn extra_method(
        &mut self,
        resource: &str,
        method: &ExtraMethodSpec,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<(ExtraMethodModel, Vec<GeneratedType>)> {
        let route = Route {
            verb: method.verb.clone(),
            path: method.path.clone(),
        };
        let stem = format!(
            "{resource}{}{}",
            verb_name(&method.verb),
            to_camel_case(last_literal_segment(&method.path).unwrap_or_default())
        );

        let mut generated = Vec::new();
        let mut names = [None, None];
        for (slot, (suffix, kind, part)) in [
            ("Request", ModelKind::ExtraRequest, SchemaPart::Request),
            ("Response", ModelKind::ExtraResponse, SchemaPart::Response),
        ]
        .into_iter()
        .enumerate()
        {
            let source = ModelSource {
                op: None,
                route: route.clone(),
                part,
            };
            match self.build(&format!("{stem}{suffix}"), kind, &source) {
                Ok(Some(ty)) => {
                    names[slot] = Some(ty.name.clone());
                    generated.push(ty);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(resource, route = %route, %err, "extra method excluded");
                    issues.push(ValidationIssue::new(
                        resource,
                        route.to_string(),
                        issue_reason(&err),
                        err.to_string(),
                    ));
                    return None;
                }
            }
        }
        let [request, response] = names;

        let model = ExtraMethodModel {
            summary: self.provider.operation_summary(&route.verb, &route.path),
            verb: route.verb,
            path: route.path,
            wait: method.async_wait,
            request,
            response,
        };
        Some((model, generated))
    }
}

/// Run validation and model building over `descriptors`.
pub fn generate_model(
    provider: &dyn SchemaProvider,
    descriptors: &BTreeMap<String, ResourceDescriptor>,
    policy: &Policy,
) -> Result<GenerationModel, FatalError> {
    Generator::new(provider, policy).generate(descriptors.values())
}

/// A full run: facts, descriptors and lints, then the generation model.
#[derive(Debug)]
pub struct GenerationRun {
    pub model: GenerationModel,
    pub lints: Vec<LintIssue>,
}

/// Extract facts, assemble descriptors and build the generation model.
pub fn run_generation(
    extractor: &dyn FactExtractor,
    provider: &dyn SchemaProvider,
    registry: &MarkerRegistry,
    namespace: &str,
    policy: &Policy,
) -> Result<GenerationRun, FatalError> {
    let collected = collect(extractor, registry, namespace, policy)?;
    for lint in &collected.lints {
        tracing::warn!(location = %lint.location, kind = %lint.kind, "{}", lint.message);
    }
    let model = generate_model(provider, &collected.descriptors, policy)?;
    Ok(GenerationRun {
        model,
        lints: collected.lints,
    })
}
