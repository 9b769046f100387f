#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Unit tests for the annotation linter

use crate::config::{OperationSetPolicy, Policy};
use crate::linter::{has_errors, lint_annotations, LintIssue, LintSeverity};
use crate::markers::MarkerRegistry;
use crate::source::{RustSourceExtractor, StaticFacts, WiringFact};

fn lint(facts: &StaticFacts) -> Vec<LintIssue> {
    lint_with(facts, &Policy::default())
}

fn lint_with(facts: &StaticFacts, policy: &Policy) -> Vec<LintIssue> {
    let registry = MarkerRegistry::with_defaults("clientgen").expect("registry");
    lint_annotations(facts, &registry, "clientgen", policy).expect("lint")
}

fn kinds(issues: &[LintIssue]) -> Vec<&str> {
    issues.iter().map(|i| i.kind.as_str()).collect()
}

#[test]
fn test_lint_clean_annotations() {
    let facts = StaticFacts::new()
        .with_package("+clientgen:basePath=/v1")
        .with_type("Widget", "+clientgen:ops:CRUD=/widgets")
        .with_type("Widget", "+clientgen:skip=false")
        .with_type("Widget", "+other:anything=goes");
    let issues = lint(&facts);
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
}

#[test]
fn test_lint_unknown_marker() {
    let facts = StaticFacts::new().with_type("Widget", "+clientgen:frobnicate=/x");
    let issues = lint(&facts);
    assert_eq!(kinds(&issues), vec!["unknown_marker"]);
    assert_eq!(issues[0].severity, LintSeverity::Error);
}

#[test]
fn test_lint_wrong_target() {
    let facts = StaticFacts::new().with_type("Widget", "+clientgen:basePath=/v1");
    let issues = lint(&facts);
    assert_eq!(kinds(&issues), vec!["wrong_target"]);
    assert!(issues[0]
        .suggestion
        .as_deref()
        .unwrap()
        .contains("package"));
}

#[test]
fn test_lint_invalid_payload() {
    let facts = StaticFacts::new()
        .with_type("Widget", "+clientgen:ops:R=/widgets")
        .with_type("Widget", "+clientgen:skip=maybe");
    let issues = lint(&facts);
    assert!(kinds(&issues).contains(&"invalid_payload"));
    assert!(has_errors(&issues));
}

#[test]
fn test_lint_relative_path() {
    let facts = StaticFacts::new().with_type("Widget", "+clientgen:ops:R=widgets");
    let issues = lint(&facts);
    assert_eq!(kinds(&issues), vec!["relative_path"]);
    assert_eq!(issues[0].severity, LintSeverity::Warning);
    assert!(!has_errors(&issues));
}

#[test]
fn test_lint_reports_assembly_issues() {
    let facts = StaticFacts::new()
        .with_type("Widget", "+clientgen:ops:CR=/widgets")
        .with_type("Widget", "+clientgen:ops:D=/widgets")
        .with_type("Widget", "+clientgen:asyncExtraMethod:POST[wait(7m)]=/widgets/{id}/x")
        .with_type("Widget", "+clientgen:extraMethod:FETCH=/widgets/{id}/y");
    let issues = lint(&facts);
    let kinds = kinds(&issues);
    assert!(kinds.contains(&"duplicate_operation_set"));
    assert!(kinds.contains(&"unsupported_wait"));
    assert!(kinds.contains(&"unsupported_verb"));
    // errors sort first
    assert_eq!(issues[0].severity, LintSeverity::Error);
}

#[test]
fn test_lint_reject_policy_reports_error() {
    let facts = StaticFacts::new()
        .with_type("Widget", "+clientgen:ops:CR=/widgets")
        .with_type("Widget", "+clientgen:ops:D=/widgets");
    let policy = Policy {
        operation_set: OperationSetPolicy::Reject,
        ..Policy::default()
    };
    let issues = lint_with(&facts, &policy);
    assert_eq!(kinds(&issues), vec!["duplicate_operation_set"]);
    assert_eq!(issues[0].severity, LintSeverity::Error);
}

#[test]
fn test_lint_wiring_comments() {
    let facts = StaticFacts::new().with_wiring(WiringFact {
        resource: "Widget".to_string(),
        field: "widgets".to_string(),
        base_path: Some("/widgets".to_string()),
        operations: vec!["R".to_string()],
        comments: vec![
            "+clientgen:ops:CRUD=/widgets".to_string(),
            "+clientgen:extraMethod:POST=/widgets/{id}/restart".to_string(),
        ],
        origin: "client.rs".to_string(),
    });
    let issues = lint(&facts);
    assert_eq!(kinds(&issues), vec!["wrong_target"]);
    assert_eq!(issues[0].location, "client.rs:widgets");
}

#[test]
fn test_lint_rust_sources() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("models.rs");
    std::fs::write(
        &path,
        r#"
/// +clientgen:ops:CRUD=/widgets
/// +clientgen:ops:L=/widgets
pub struct Widget;
"#,
    )
    .expect("write source");
    let extractor = RustSourceExtractor::new(vec![path], vec![]);
    let registry = MarkerRegistry::with_defaults("clientgen").expect("registry");
    let issues =
        lint_annotations(&extractor, &registry, "clientgen", &Policy::default()).expect("lint");
    assert_eq!(kinds(&issues), vec!["duplicate_operation_set"]);
    assert!(issues[0].location.ends_with("models.rs:Widget"));
}
