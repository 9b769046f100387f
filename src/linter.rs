//! # Annotation Linter Module
//!
//! Reports annotation problems without generating anything.
//!
//! ## Checks Performed
//!
//! 1. **Unknown markers** - the feature is not registered in the namespace
//! 2. **Wrong target** - a marker registered for types used on a field, etc.
//! 3. **Invalid payloads** - payload does not match the marker's argument shape
//! 4. **Relative paths** - path payloads must start with `/`
//! 5. Everything descriptor assembly reports: malformed annotations,
//!    duplicate operation sets, unknown operation letters, unsupported verbs
//!    and unsupported wait timeouts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clientgen::linter::{lint_annotations, print_lint_issues};
//!
//! let issues = lint_annotations(&extractor, &registry, "clientgen", &policy)?;
//! print_lint_issues(&issues);
//! ```

use crate::config::Policy;
use crate::error::FatalError;
use crate::markers::{Feature, MarkerRegistry, ParsedMarker, Target};
use crate::resource;
use crate::source::FactExtractor;
use serde::Serialize;
use std::fmt;

#[cfg(test)]
mod tests;

/// Severity level for lint issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    /// Error - the annotation is ignored or the run would abort
    Error,
    /// Warning - a fallback was applied
    Warning,
    /// Info - Best practice suggestion
    Info,
}

impl fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LintSeverity::Error => "error",
            LintSeverity::Warning => "warning",
            LintSeverity::Info => "info",
        };
        f.write_str(s)
    }
}

/// A lint issue found in the annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintIssue {
    /// Where the issue occurred (e.g., "src/models.rs:Widget")
    pub location: String,
    /// Severity of the issue
    pub severity: LintSeverity,
    /// Type of lint issue (e.g., "duplicate_operation_set", "unsupported_wait")
    pub kind: String,
    /// Human-readable description of the problem
    pub message: String,
    /// Optional suggestion for how to fix it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl LintIssue {
    /// Create a new lint issue
    pub fn new(
        location: impl Into<String>,
        severity: LintSeverity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LintIssue {
            location: location.into(),
            severity,
            kind: kind.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion for fixing the issue
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

fn lint_marker(
    text: &str,
    target: Target,
    location: &str,
    registry: &MarkerRegistry,
    namespace: &str,
    issues: &mut Vec<LintIssue>,
) {
    let Ok(m) = ParsedMarker::parse(text) else {
        // reported by descriptor assembly
        return;
    };
    if m.namespace != namespace {
        return;
    }

    let Some(def) = registry.lookup(&m.raw, target) else {
        let elsewhere: Vec<String> = [Target::Package, Target::Type, Target::Field]
            .into_iter()
            .filter(|t| *t != target && registry.lookup(&m.raw, *t).is_some())
            .map(|t| t.to_string())
            .collect();
        let issue = if elsewhere.is_empty() {
            LintIssue::new(
                location,
                LintSeverity::Error,
                "unknown_marker",
                format!("`{}` is not a registered {namespace} marker", m.marker_name()),
            )
        } else {
            LintIssue::new(
                location,
                LintSeverity::Error,
                "wrong_target",
                format!(
                    "`{}` cannot be attached to a {target}",
                    m.marker_name()
                ),
            )
            .with_suggestion(format!("Attach it to a {}", elsewhere.join(" or ")))
        };
        issues.push(issue);
        return;
    };

    if let Err(err) = def.parse_value(m.payload.as_deref()) {
        issues.push(LintIssue::new(
            location,
            LintSeverity::Error,
            "invalid_payload",
            err.to_string(),
        ));
        return;
    }

    let takes_path = !matches!(m.feature, Feature::Skip | Feature::Unknown(_));
    if let Some(payload) = m.payload.as_deref().filter(|_| takes_path) {
        if !payload.starts_with('/') {
            issues.push(
                LintIssue::new(
                    location,
                    LintSeverity::Warning,
                    "relative_path",
                    format!("`{}` declares a path that does not start with `/`", m.raw),
                )
                .with_suggestion(format!("Use `/{payload}`")),
            );
        }
    }
}

/// Lint every annotation and wiring comment the extractor finds.
pub fn lint_annotations(
    extractor: &dyn FactExtractor,
    registry: &MarkerRegistry,
    namespace: &str,
    policy: &Policy,
) -> anyhow::Result<Vec<LintIssue>> {
    let mut issues = Vec::new();

    for fact in extractor.annotations()? {
        let location = match fact.target {
            Target::Package => fact.origin.clone(),
            _ => format!("{}:{}", fact.origin, fact.declaration),
        };
        lint_marker(&fact.text, fact.target, &location, registry, namespace, &mut issues);
    }
    for fact in extractor.wiring()? {
        let location = format!("{}:{}", fact.origin, fact.field);
        for line in fact.comments.iter().filter(|l| l.starts_with('+')) {
            lint_marker(line, Target::Field, &location, registry, namespace, &mut issues);
        }
    }

    match resource::collect(extractor, registry, namespace, policy) {
        Ok(collected) => issues.extend(collected.lints),
        Err(FatalError::DuplicateOperationSet { resource, marker }) => {
            issues.push(LintIssue::new(
                resource,
                LintSeverity::Error,
                "duplicate_operation_set",
                format!("`{marker}` repeats an operation set; rejected by policy"),
            ));
        }
        Err(err) => return Err(err.into()),
    }

    issues.sort_by(|a, b| {
        (a.severity, &a.location, &a.kind).cmp(&(b.severity, &b.location, &b.kind))
    });
    Ok(issues)
}

/// `true` if any issue is an error.
pub fn has_errors(issues: &[LintIssue]) -> bool {
    issues.iter().any(|i| i.severity == LintSeverity::Error)
}

/// Print lint issues in a formatted way
pub fn print_lint_issues(issues: &[LintIssue]) {
    if issues.is_empty() {
        println!("✅ No lint issues found!");
        return;
    }

    let count = |severity| issues.iter().filter(|i| i.severity == severity).count();
    println!("\n📋 Lint Results:");
    println!(
        "   {} error(s), {} warning(s), {} info(s)\n",
        count(LintSeverity::Error),
        count(LintSeverity::Warning),
        count(LintSeverity::Info)
    );

    for (severity, heading) in [
        (LintSeverity::Error, "❌ Errors (must fix):"),
        (LintSeverity::Warning, "⚠️  Warnings (should fix):"),
        (LintSeverity::Info, "ℹ️  Info (best practices):"),
    ] {
        let group: Vec<_> = issues.iter().filter(|i| i.severity == severity).collect();
        if group.is_empty() {
            continue;
        }
        println!("{heading}");
        for issue in group {
            println!("   [{}] {}", issue.kind, issue.location);
            println!("      {}", issue.message);
            if let Some(suggestion) = &issue.suggestion {
                println!("      💡 Suggestion: {}", suggestion);
            }
        }
        println!();
    }
}
