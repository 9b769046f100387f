use super::{IssueReason, ValidationIssue};
use crate::config::{ArrayOfPrimitivesPolicy, Policy};
use crate::error::FatalError;
use crate::model::{classify, Shape};
use crate::resource::{ExtraMethodSpec, Operation, ResourceDescriptor};
use crate::spec::{ResolvedSchema, Schema, SchemaPart, SchemaProvider};
use http::Method;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Verbs checked when deciding whether a path is declared at all.
const ROUTE_VERBS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// The concrete `verb path` a CRUD operation is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    #[serde(serialize_with = "crate::resource::serialize_method")]
    pub verb: Method,
    pub path: String,
}

impl Route {
    fn new(verb: Method, path: &str) -> Self {
        Route {
            verb,
            path: path.to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.path)
    }
}

/// Result of gating one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateOutcome {
    /// Operations that survived.
    pub operations: BTreeSet<Operation>,
    /// Routes of the surviving operations.
    pub routes: BTreeMap<Operation, Route>,
    /// Extra methods that survived, in declaration order.
    pub extra_methods: Vec<ExtraMethodSpec>,
    pub issues: Vec<ValidationIssue>,
}

impl GateOutcome {
    /// Drop `op` and record why.
    pub fn exclude(&mut self, resource: &str, op: Operation, reason: IssueReason, message: String) {
        if self.operations.remove(&op) {
            self.routes.remove(&op);
            self.issues
                .push(ValidationIssue::new(resource, op.to_string(), reason, message));
        }
    }

    /// Apply the cascade rules after an exclusion:
    /// a Read lost to its shape takes List with it.
    pub fn cascade(&mut self, resource: &str) {
        let read_shape_loss = self.issues.iter().any(|i| {
            i.resource == resource && i.operation == Operation::Read.to_string() && i.reason.is_shape()
        });
        if read_shape_loss && self.operations.contains(&Operation::List) {
            self.exclude(
                resource,
                Operation::List,
                IssueReason::CascadedExclusion,
                "Read was excluded for its response shape; List shares it".to_string(),
            );
        }
    }
}

/// Checks every requested operation of a resource against the schema provider.
pub struct ValidationGate<'a> {
    provider: &'a dyn SchemaProvider,
    policy: &'a Policy,
}

struct Verdict {
    reason: IssueReason,
    message: String,
}

impl Verdict {
    fn new(reason: IssueReason, message: impl Into<String>) -> Self {
        Verdict {
            reason,
            message: message.into(),
        }
    }
}

fn is_path_param(segment: &str) -> bool {
    segment.len() > 2
        && segment.starts_with('{')
        && segment.ends_with('}')
        && !segment.contains('/')
}

impl<'a> ValidationGate<'a> {
    pub fn new(provider: &'a dyn SchemaProvider, policy: &'a Policy) -> Self {
        ValidationGate { provider, policy }
    }

    /// Split a resource path into its collection path and, when one is
    /// declared, its item path (`<collection>/{param}`).
    pub fn resource_paths(&self, path: &str) -> (String, Option<String>) {
        let trimmed = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        if let Some((parent, last)) = trimmed.rsplit_once('/') {
            if is_path_param(last) {
                let parent = if parent.is_empty() { "/" } else { parent };
                return (parent.to_string(), Some(trimmed.to_string()));
            }
        }
        let item = self.provider.paths().into_iter().find(|p| {
            p.strip_prefix(trimmed)
                .and_then(|rest| rest.strip_prefix('/'))
                .is_some_and(is_path_param)
        });
        (trimmed.to_string(), item)
    }

    fn declares_any(&self, path: &str) -> bool {
        ROUTE_VERBS
            .iter()
            .any(|verb| self.provider.has_operation(verb, path))
    }

    fn route(&self, op: Operation, collection: &str, item: Option<&str>) -> Result<Route, String> {
        let require_item = || item.ok_or_else(|| format!("no item path `{collection}/{{id}}` is declared"));
        let route = match op {
            Operation::Create => Route::new(Method::POST, collection),
            Operation::List => Route::new(Method::GET, collection),
            Operation::Read => Route::new(Method::GET, require_item()?),
            Operation::Delete => Route::new(Method::DELETE, require_item()?),
            Operation::Update => {
                let item = require_item()?;
                let verb = self
                    .policy
                    .update_methods
                    .iter()
                    .find(|verb| self.provider.has_operation(verb, item))
                    .ok_or_else(|| {
                        let verbs: Vec<String> =
                            self.policy.update_methods.iter().map(Method::to_string).collect();
                        format!("none of {} is declared at `{item}`", verbs.join(", "))
                    })?;
                Route::new(verb.clone(), item)
            }
        };
        if !self.provider.has_operation(&route.verb, &route.path) {
            return Err(format!("{route} is not declared"));
        }
        Ok(route)
    }

    fn schema(&self, route: &Route, part: SchemaPart) -> Result<Option<ResolvedSchema>, Verdict> {
        self.provider
            .operation_schema(&route.verb, &route.path, part)
            .map_err(|err| Verdict::new(IssueReason::MissingOperation, err.to_string()))
    }

    fn accepts_no_content(&self, route: &Route) -> bool {
        self.policy
            .no_content_statuses
            .iter()
            .any(|code| self.provider.has_status(&route.verb, &route.path, *code))
    }

    /// Create, Update and Delete need a response schema or a declared
    /// no-content status.
    fn check_mutation(&self, op: Operation, route: &Route) -> Result<(), Verdict> {
        if self.schema(route, SchemaPart::Response)?.is_some() || self.accepts_no_content(route) {
            return Ok(());
        }
        let statuses: Vec<String> = self
            .policy
            .no_content_statuses
            .iter()
            .map(u16::to_string)
            .collect();
        let message = format!(
            "{route} declares no response schema and none of the no-content statuses [{}]",
            statuses.join(", ")
        );
        Err(match op {
            Operation::Update => Verdict::new(IssueReason::BrokenUpdateContract, message),
            _ => Verdict::new(IssueReason::MissingSchema, message),
        })
    }

    fn check_read(&self, route: &Route) -> Result<Schema, Verdict> {
        let resolved = self
            .schema(route, SchemaPart::Response)?
            .ok_or_else(|| Verdict::new(IssueReason::MissingSchema, format!("{route} declares no response schema")))?;
        match classify(&resolved.schema) {
            Shape::Object => Ok(resolved.schema),
            Shape::AmbiguousObject => Err(Verdict::new(
                IssueReason::AmbiguousSchema,
                format!("{route} returns an object without properties"),
            )),
            Shape::Map => Err(Verdict::new(
                IssueReason::MapResponse,
                format!("{route} returns a map"),
            )),
            Shape::Primitive => Err(Verdict::new(
                IssueReason::PrimitiveResponse,
                format!("{route} returns a scalar"),
            )),
            Shape::Array(_) => Err(Verdict::new(
                IssueReason::AmbiguousSchema,
                format!("{route} returns an array for a single item"),
            )),
        }
    }

    fn check_list(&self, route: &Route) -> Result<Schema, Verdict> {
        let resolved = self
            .schema(route, SchemaPart::UnwrappedResponse)?
            .ok_or_else(|| Verdict::new(IssueReason::MissingSchema, format!("{route} declares no response schema")))?;
        if !resolved.unwrapped {
            return Err(match classify(&resolved.schema) {
                Shape::Map => Verdict::new(IssueReason::MapResponse, format!("{route} returns a map")),
                _ => Verdict::new(
                    IssueReason::AmbiguousSchema,
                    format!("{route} returns neither an array nor a list wrapper"),
                ),
            });
        }
        let item = resolved.schema;
        match classify(&item) {
            Shape::Object => Ok(item),
            Shape::AmbiguousObject => Err(Verdict::new(
                IssueReason::ArrayOfAmbiguousObjects,
                format!("{route} returns an array of objects without properties"),
            )),
            shape @ Shape::Array(_) if shape.is_array_of_ambiguous() => Err(Verdict::new(
                IssueReason::ArrayOfAmbiguousObjects,
                format!("{route} returns nested arrays of objects without properties"),
            )),
            Shape::Primitive => match self.policy.array_of_primitives {
                ArrayOfPrimitivesPolicy::Allow => Ok(item),
                ArrayOfPrimitivesPolicy::Exclude => Err(Verdict::new(
                    IssueReason::ArrayOfPrimitives,
                    format!("{route} returns an array of scalars"),
                )),
            },
            Shape::Map => Err(Verdict::new(
                IssueReason::MapResponse,
                format!("{route} returns an array of maps"),
            )),
            Shape::Array(_) => Err(Verdict::new(
                IssueReason::AmbiguousSchema,
                format!("{route} returns nested arrays"),
            )),
        }
    }

    /// An extra method may return nothing, but a returned body must have a shape.
    fn check_extra(&self, route: &Route) -> Result<(), Verdict> {
        let Some(resolved) = self.schema(route, SchemaPart::Response)? else {
            return Ok(());
        };
        match classify(&resolved.schema) {
            Shape::AmbiguousObject => Err(Verdict::new(
                IssueReason::AmbiguousSchema,
                format!("{route} returns an object without properties"),
            )),
            shape @ Shape::Array(_) if shape.is_array_of_ambiguous() => Err(Verdict::new(
                IssueReason::ArrayOfAmbiguousObjects,
                format!("{route} returns an array of objects without properties"),
            )),
            _ => Ok(()),
        }
    }

    fn check_extra_methods(&self, descriptor: &ResourceDescriptor, outcome: &mut GateOutcome) {
        for method in &descriptor.extra_methods {
            let route = Route::new(method.verb.clone(), &method.path);
            match self.check_extra(&route) {
                Ok(()) => outcome.extra_methods.push(method.clone()),
                Err(verdict) => outcome.issues.push(ValidationIssue::new(
                    &descriptor.name,
                    route.to_string(),
                    verdict.reason,
                    verdict.message,
                )),
            }
        }
    }

    /// Fail fast on annotations that name verbs or paths the document lacks.
    fn check_declared(&self, descriptor: &ResourceDescriptor) -> Result<(), FatalError> {
        let declared = descriptor
            .extra_methods
            .iter()
            .map(|m| (&m.verb, &m.path, &m.marker))
            .chain(
                [&descriptor.request_url, &descriptor.response_url]
                    .into_iter()
                    .flatten()
                    .map(|u| (&u.verb, &u.path, &u.marker)),
            );
        for (verb, path, marker) in declared {
            if !self.provider.has_operation(verb, path) {
                return Err(FatalError::UnknownOperation {
                    resource: descriptor.name.clone(),
                    marker: marker.clone(),
                    verb: verb.clone(),
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    fn note_informational(&self, descriptor: &ResourceDescriptor, outcome: &GateOutcome) {
        let routes = outcome
            .routes
            .values()
            .cloned()
            .chain(descriptor.extra_methods.iter().map(|m| Route::new(m.verb.clone(), &m.path)));
        for route in routes {
            if self.provider.operation_summary(&route.verb, &route.path).is_none() {
                tracing::warn!(resource = %descriptor.name, route = %route, "operation has no summary");
            }
        }

        for method in descriptor.extra_methods.iter().filter(|m| m.is_async()) {
            let route = Route::new(method.verb.clone(), &method.path);
            if self.provider.has_status(&route.verb, &route.path, 202) {
                continue;
            }
            let has_task_field = self
                .provider
                .operation_schema(&route.verb, &route.path, SchemaPart::Response)
                .ok()
                .flatten()
                .is_some_and(|r| {
                    self.policy
                        .async_task_fields
                        .iter()
                        .any(|f| r.schema.properties.contains_key(f))
                });
            if !has_task_field {
                tracing::warn!(
                    resource = %descriptor.name,
                    route = %route,
                    "async method declares neither 202 nor a task identifier field"
                );
            }
        }
    }

    /// Validate one resource.
    ///
    /// Returns the surviving operations and extra methods with one issue per
    /// exclusion. An undeclared extra method is fatal.
    pub fn check_resource(&self, descriptor: &ResourceDescriptor) -> Result<GateOutcome, FatalError> {
        self.check_declared(descriptor)?;
        let name = descriptor.name.as_str();
        let mut outcome = GateOutcome::default();

        let Some(set) = descriptor.operation_set.as_ref() else {
            self.check_extra_methods(descriptor, &mut outcome);
            self.note_informational(descriptor, &outcome);
            return Ok(outcome);
        };

        let (collection, item) = self.resource_paths(&set.path);
        let declared = self.declares_any(&collection)
            || item.as_deref().is_some_and(|p| self.declares_any(p));
        if !declared {
            return Err(FatalError::UnknownResourcePath {
                resource: descriptor.name.clone(),
                path: set.path.clone(),
            });
        }

        for op in set.operations.iter().copied() {
            outcome.operations.insert(op);
            let route = match self.route(op, &collection, item.as_deref()) {
                Ok(route) => route,
                Err(message) => {
                    outcome.exclude(name, op, IssueReason::MissingOperation, message);
                    continue;
                }
            };
            outcome.routes.insert(op, route.clone());
            let verdict = match op {
                Operation::Create | Operation::Update | Operation::Delete => {
                    self.check_mutation(op, &route)
                }
                Operation::Read => self.check_read(&route).map(drop),
                Operation::List => self.check_list(&route).map(drop),
            };
            if let Err(verdict) = verdict {
                outcome.exclude(name, op, verdict.reason, verdict.message);
            }
        }

        outcome.cascade(name);

        self.check_extra_methods(descriptor, &mut outcome);

        let kept: String = outcome.operations.iter().map(|o| o.letter()).collect();
        tracing::debug!(resource = %name, kept = %kept, excluded = outcome.issues.len(), "validated resource");
        self.note_informational(descriptor, &outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ExtraMethodSpec, OperationSet, UrlOverride};
    use crate::spec::{provider_from_str, OpenApiProvider};

    const STORE: &str = r##"
openapi: 3.1.0
info:
  title: Store
  version: "1"
paths:
  /widgets:
    get:
      summary: List widgets
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: "#/components/schemas/Widget"
    post:
      summary: Create widget
      responses:
        "201":
          description: created
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Widget"
  /widgets/{id}:
    get:
      summary: Get widget
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Widget"
    patch:
      summary: Patch widget
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Widget"
    delete:
      summary: Delete widget
      responses:
        "204":
          description: gone
  /widgets/{id}/restart:
    post:
      summary: Restart
      responses:
        "202":
          description: accepted
  /widgets/{id}/inspect:
    get:
      summary: Inspect
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Blob"
  /gizmos:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: "#/components/schemas/Widget"
  /gizmos/{id}:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Blob"
    put:
      responses:
        "200":
          description: ok
    delete:
      responses:
        "204":
          description: gone
  /blobs:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: array
                items:
                  type: object
  /blobs/{id}:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Blob"
  /tags:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: array
                items:
                  type: string
  /tags/{name}:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: string
    put:
      responses:
        "200":
          description: ok
    delete:
      responses:
        "200":
          description: ok
  /labels:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: object
                additionalProperties:
                  type: string
  /labels/{key}:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: object
                properties:
                  key:
                    type: string
components:
  schemas:
    Widget:
      type: object
      properties:
        name:
          type: string
    Blob:
      type: object
"##;

    fn provider() -> OpenApiProvider {
        provider_from_str(STORE, true).unwrap()
    }

    fn resource(name: &str, letters: &str, path: &str) -> ResourceDescriptor {
        let mut d = ResourceDescriptor::new(name);
        d.operation_set = Some(OperationSet::new(
            letters.chars().filter_map(Operation::from_letter),
            path,
            &format!("+clientgen:ops:{letters}={path}"),
        ));
        d
    }

    fn reasons(outcome: &GateOutcome) -> Vec<(String, IssueReason)> {
        outcome
            .issues
            .iter()
            .map(|i| (i.operation.clone(), i.reason))
            .collect()
    }

    #[test]
    fn test_full_crudl_survives() {
        let p = provider();
        let policy = Policy::default();
        let gate = ValidationGate::new(&p, &policy);
        let outcome = gate.check_resource(&resource("Widget", "CRUDL", "/widgets")).unwrap();
        assert_eq!(outcome.operations.len(), 5);
        assert!(outcome.issues.is_empty());
        assert_eq!(
            outcome.routes[&Operation::Update],
            Route::new(Method::PATCH, "/widgets/{id}")
        );
        assert_eq!(outcome.routes[&Operation::Create].to_string(), "POST /widgets");
    }

    #[test]
    fn test_item_path_is_accepted_as_resource_path() {
        let p = provider();
        let policy = Policy::default();
        let gate = ValidationGate::new(&p, &policy);
        assert_eq!(
            gate.resource_paths("/widgets/{id}"),
            ("/widgets".to_string(), Some("/widgets/{id}".to_string()))
        );
        assert_eq!(
            gate.resource_paths("/widgets/"),
            ("/widgets".to_string(), Some("/widgets/{id}".to_string()))
        );
        let outcome = gate.check_resource(&resource("Widget", "RD", "/widgets/{id}")).unwrap();
        assert_eq!(outcome.operations.len(), 2);
    }

    #[test]
    fn test_ambiguous_list_and_read_are_excluded() {
        let p = provider();
        let policy = Policy::default();
        let gate = ValidationGate::new(&p, &policy);
        let outcome = gate.check_resource(&resource("Blob", "LR", "/blobs")).unwrap();
        assert!(outcome.operations.is_empty());
        assert_eq!(
            reasons(&outcome),
            vec![
                ("List".to_string(), IssueReason::ArrayOfAmbiguousObjects),
                ("Read".to_string(), IssueReason::AmbiguousSchema),
            ]
        );
    }

    #[test]
    fn test_primitive_read_cascades_to_list() {
        let p = provider();
        let policy = Policy {
            array_of_primitives: ArrayOfPrimitivesPolicy::Allow,
            ..Policy::default()
        };
        let gate = ValidationGate::new(&p, &policy);
        let outcome = gate.check_resource(&resource("Tag", "LRUD", "/tags")).unwrap();
        assert!(outcome.operations.is_empty());
        assert_eq!(
            reasons(&outcome),
            vec![
                ("Read".to_string(), IssueReason::PrimitiveResponse),
                ("Update".to_string(), IssueReason::BrokenUpdateContract),
                ("Delete".to_string(), IssueReason::MissingSchema),
                ("List".to_string(), IssueReason::CascadedExclusion),
            ]
        );
    }

    #[test]
    fn test_ambiguous_read_cascades_to_list_but_not_delete() {
        let p = provider();
        let policy = Policy::default();
        let gate = ValidationGate::new(&p, &policy);
        let outcome = gate.check_resource(&resource("Gizmo", "LRUD", "/gizmos")).unwrap();
        assert_eq!(outcome.operations, BTreeSet::from([Operation::Delete]));
        assert_eq!(
            reasons(&outcome),
            vec![
                ("Read".to_string(), IssueReason::AmbiguousSchema),
                ("Update".to_string(), IssueReason::BrokenUpdateContract),
                ("List".to_string(), IssueReason::CascadedExclusion),
            ]
        );
        assert_eq!(
            outcome.routes[&Operation::Delete],
            Route::new(Method::DELETE, "/gizmos/{id}")
        );
    }

    #[test]
    fn test_extra_method_with_ambiguous_response_is_excluded() {
        let p = provider();
        let policy = Policy::default();
        let gate = ValidationGate::new(&p, &policy);
        let mut d = resource("Widget", "R", "/widgets");
        for (verb, path) in [
            (Method::POST, "/widgets/{id}/restart"),
            (Method::GET, "/widgets/{id}/inspect"),
        ] {
            d.push_extra_method(ExtraMethodSpec {
                verb: verb.clone(),
                path: path.to_string(),
                async_wait: None,
                marker: format!("+clientgen:extraMethod:{verb}={path}"),
            });
        }

        let outcome = gate.check_resource(&d).unwrap();
        assert_eq!(outcome.operations, BTreeSet::from([Operation::Read]));
        let kept: Vec<&str> = outcome.extra_methods.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(kept, vec!["/widgets/{id}/restart"]);
        assert_eq!(
            reasons(&outcome),
            vec![("GET /widgets/{id}/inspect".to_string(), IssueReason::AmbiguousSchema)]
        );
    }

    #[test]
    fn test_array_of_primitives_excluded_by_default() {
        let p = provider();
        let policy = Policy::default();
        let gate = ValidationGate::new(&p, &policy);
        let outcome = gate.check_resource(&resource("Tag", "L", "/tags")).unwrap();
        assert_eq!(
            reasons(&outcome),
            vec![("List".to_string(), IssueReason::ArrayOfPrimitives)]
        );
    }

    #[test]
    fn test_custom_no_content_status_accepts_mutation() {
        let p = provider();
        let policy = Policy {
            no_content_statuses: vec![200, 204],
            ..Policy::default()
        };
        let gate = ValidationGate::new(&p, &policy);
        let outcome = gate.check_resource(&resource("Tag", "UD", "/tags")).unwrap();
        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.routes[&Operation::Update].verb, Method::PUT);
    }

    #[test]
    fn test_map_list_is_excluded_and_read_kept() {
        let p = provider();
        let policy = Policy::default();
        let gate = ValidationGate::new(&p, &policy);
        let outcome = gate.check_resource(&resource("Label", "LR", "/labels")).unwrap();
        assert_eq!(outcome.operations, BTreeSet::from([Operation::Read]));
        assert_eq!(
            reasons(&outcome),
            vec![("List".to_string(), IssueReason::MapResponse)]
        );
    }

    #[test]
    fn test_undeclared_operation_is_a_missing_operation() {
        let p = provider();
        let policy = Policy::default();
        let gate = ValidationGate::new(&p, &policy);
        let outcome = gate.check_resource(&resource("Label", "CR", "/labels")).unwrap();
        assert_eq!(
            reasons(&outcome),
            vec![("Create".to_string(), IssueReason::MissingOperation)]
        );
        assert!(!outcome.routes.contains_key(&Operation::Create));
    }

    #[test]
    fn test_unknown_resource_path_is_fatal() {
        let p = provider();
        let policy = Policy::default();
        let gate = ValidationGate::new(&p, &policy);
        let err = gate.check_resource(&resource("Ghost", "R", "/ghosts")).unwrap_err();
        assert!(matches!(err, FatalError::UnknownResourcePath { .. }));
    }

    #[test]
    fn test_undeclared_extra_method_is_fatal() {
        let p = provider();
        let policy = Policy::default();
        let gate = ValidationGate::new(&p, &policy);

        let mut ok = resource("Widget", "R", "/widgets");
        ok.push_extra_method(ExtraMethodSpec {
            verb: Method::POST,
            path: "/widgets/{id}/restart".to_string(),
            async_wait: None,
            marker: "+clientgen:extraMethod:POST=/widgets/{id}/restart".to_string(),
        });
        assert!(gate.check_resource(&ok).is_ok());

        let mut bad = resource("Widget", "R", "/widgets");
        bad.push_extra_method(ExtraMethodSpec {
            verb: Method::POST,
            path: "/widgets/{id}/reboot".to_string(),
            async_wait: None,
            marker: "+clientgen:extraMethod:POST=/widgets/{id}/reboot".to_string(),
        });
        match gate.check_resource(&bad).unwrap_err() {
            FatalError::UnknownOperation { marker, path, .. } => {
                assert_eq!(path, "/widgets/{id}/reboot");
                assert!(marker.ends_with("/reboot"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undeclared_url_override_is_fatal() {
        let p = provider();
        let policy = Policy::default();
        let gate = ValidationGate::new(&p, &policy);
        let mut d = resource("Widget", "R", "/widgets");
        d.request_url = Some(UrlOverride {
            verb: Method::PUT,
            path: "/widgets/{id}".to_string(),
            marker: "+clientgen:requestUrl:PUT=/widgets/{id}".to_string(),
        });
        assert!(matches!(
            gate.check_resource(&d),
            Err(FatalError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn test_extra_methods_only_resource_passes() {
        let p = provider();
        let policy = Policy::default();
        let gate = ValidationGate::new(&p, &policy);
        let mut d = ResourceDescriptor::new("Restarter");
        d.push_extra_method(ExtraMethodSpec {
            verb: Method::POST,
            path: "/widgets/{id}/restart".to_string(),
            async_wait: Some(Default::default()),
            marker: "+clientgen:asyncExtraMethod:POST=/widgets/{id}/restart".to_string(),
        });
        let outcome = gate.check_resource(&d).unwrap();
        assert!(outcome.operations.is_empty());
        assert!(outcome.issues.is_empty());
    }
}
