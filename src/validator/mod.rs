//! # Validation Gate
//!
//! Decides which requested operations a resource keeps. Every exclusion is
//! recorded as a [`ValidationIssue`]; nothing is dropped silently.

mod gate;

pub use gate::{GateOutcome, Route, ValidationGate};

use serde::Serialize;
use std::fmt;

/// Why an operation was excluded or a property left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueReason {
    AmbiguousSchema,
    MissingSchema,
    MapResponse,
    ArrayOfAmbiguousObjects,
    BrokenUpdateContract,
    PrimitiveResponse,
    ArrayOfPrimitives,
    EmptyFields,
    MissingOperation,
    CascadedExclusion,
    SkippedProperty,
}

impl IssueReason {
    /// Reasons that describe the shape of a response rather than its absence.
    pub fn is_shape(self) -> bool {
        matches!(
            self,
            IssueReason::AmbiguousSchema
                | IssueReason::MapResponse
                | IssueReason::PrimitiveResponse
                | IssueReason::EmptyFields
        )
    }
}

impl fmt::Display for IssueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueReason::AmbiguousSchema => "ambiguous_schema",
            IssueReason::MissingSchema => "missing_schema",
            IssueReason::MapResponse => "map_response",
            IssueReason::ArrayOfAmbiguousObjects => "array_of_ambiguous_objects",
            IssueReason::BrokenUpdateContract => "broken_update_contract",
            IssueReason::PrimitiveResponse => "primitive_response",
            IssueReason::ArrayOfPrimitives => "array_of_primitives",
            IssueReason::EmptyFields => "empty_fields",
            IssueReason::MissingOperation => "missing_operation",
            IssueReason::CascadedExclusion => "cascaded_exclusion",
            IssueReason::SkippedProperty => "skipped_property",
        };
        f.write_str(s)
    }
}

/// A recoverable problem found while validating or building a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub resource: String,
    /// CRUD operation name, `VERB /path` for extra methods, or `Type.property`.
    pub operation: String,
    pub reason: IssueReason,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        resource: impl Into<String>,
        operation: impl Into<String>,
        reason: IssueReason,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            resource: resource.into(),
            operation: operation.into(),
            reason,
            message: message.into(),
        }
    }
}

pub fn print_issues(issues: &[ValidationIssue]) {
    if issues.is_empty() {
        return;
    }
    eprintln!("\n⚠️  {} operation(s) or propert(ies) excluded:\n", issues.len());
    for issue in issues {
        eprintln!(
            "[{}] {} {}: {}",
            issue.reason, issue.resource, issue.operation, issue.message
        );
    }
    eprintln!();
}
