use crate::alias::AliasDecision;
use crate::markers::WaitTimeout;
use crate::model::{CompositeType, ModelBody};
use crate::resource::{serialize_method, Operation};
use crate::validator::{Route, ValidationIssue};
use http::Method;
use serde::Serialize;
use std::sync::Arc;

/// Role of a top-level generated type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    SearchParams,
    RequestBody,
    ResponseModel,
    ExtraRequest,
    ExtraResponse,
}

/// A top-level type owned by one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedType {
    pub name: String,
    pub kind: ModelKind,
    /// Operation the schema was taken from, e.g. `Read` or `POST /widgets/{id}/restart`.
    pub source: String,
    #[serde(flatten)]
    pub body: ModelBody,
}

/// A surviving CRUD operation bound to its route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationModel {
    pub operation: Operation,
    #[serde(flatten)]
    pub route: Route,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// List filters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_params: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraMethodModel {
    #[serde(serialize_with = "serialize_method")]
    pub verb: Method,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitTimeout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl ExtraMethodModel {
    pub fn is_async(&self) -> bool {
        self.wait.is_some()
    }
}

/// Everything the emitter needs for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceModel {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Surviving operations in `CLRUD` order.
    pub operations: Vec<OperationModel>,
    pub extra_methods: Vec<ExtraMethodModel>,
    pub types: Vec<GeneratedType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_url: Option<Route>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_url: Option<Route>,
    pub issues: Vec<ValidationIssue>,
}

impl ResourceModel {
    pub fn supports(&self, op: Operation) -> bool {
        self.operations.iter().any(|o| o.operation == op)
    }

    /// Surviving operations as letters, e.g. `"LRUD"`.
    pub fn letters(&self) -> String {
        self.operations.iter().map(|o| o.operation.letter()).collect()
    }

    pub fn operation(&self, op: Operation) -> Option<&OperationModel> {
        self.operations.iter().find(|o| o.operation == op)
    }

    pub fn generated(&self, kind: ModelKind) -> impl Iterator<Item = &GeneratedType> {
        self.types.iter().filter(move |t| t.kind == kind)
    }
}

/// Output of one generation run, handed to the emitter as JSON.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationModel {
    /// Resources in name order.
    pub resources: Vec<ResourceModel>,
    /// Nested and component types, de-duplicated, in name order.
    pub types: Vec<Arc<CompositeType>>,
    pub aliases: Vec<AliasDecision>,
    /// Every issue of every resource.
    pub issues: Vec<ValidationIssue>,
}

impl GenerationModel {
    pub fn resource(&self, name: &str) -> Option<&ResourceModel> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn type_named(&self, name: &str) -> Option<&CompositeType> {
        self.types.iter().find(|t| t.name == name).map(Arc::as_ref)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
