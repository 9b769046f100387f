//! Generator configuration
//!
//! Runs can be configured with a `clientgen.toml` file that sits alongside the
//! OpenAPI document (or is passed with `--config`). Command-line flags override
//! the file.
//!
//! ```toml
//! namespace = "clientgen"
//! spec = "openapi.yaml"
//! resources = ["src/models"]
//! wiring = ["src/client.rs"]
//! output = "target/clientgen/model.json"
//!
//! [policy]
//! operation_set = "first-wins"      # first-wins | last-wins | reject
//! array_of_primitives = "exclude"   # exclude | allow
//! alias_components = true
//! update_methods = ["PUT", "PATCH"]
//! no_content_statuses = [204]
//! default_wait = "5m"
//! list_wrapper_keys = ["items", "data", "results"]
//! async_task_fields = ["task_id", "operation_id", "job_id"]
//! ```

use crate::markers::{WaitTimeout, DEFAULT_NAMESPACE};
use crate::spec::DEFAULT_LIST_WRAPPER_KEYS;
use anyhow::Context;
use http::Method;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "clientgen.toml";

/// What to do when a resource carries more than one operation-set marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OperationSetPolicy {
    /// Keep the first marker, ignore the rest.
    #[default]
    FirstWins,
    /// Keep the last marker.
    LastWins,
    /// Abort the run.
    Reject,
}

/// Whether a List response that is an array of scalars keeps its List operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ArrayOfPrimitivesPolicy {
    #[default]
    Exclude,
    Allow,
}

/// The `[policy]` table as written. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub operation_set: Option<OperationSetPolicy>,
    pub array_of_primitives: Option<ArrayOfPrimitivesPolicy>,
    pub alias_components: Option<bool>,
    pub update_methods: Option<Vec<String>>,
    pub no_content_statuses: Option<Vec<u16>>,
    pub default_wait: Option<String>,
    pub list_wrapper_keys: Option<Vec<String>>,
    pub async_task_fields: Option<Vec<String>>,
}

/// Contents of `clientgen.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub namespace: Option<String>,
    pub spec: Option<PathBuf>,
    pub resources: Vec<PathBuf>,
    pub wiring: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub policy: PolicyConfig,
}

impl GeneratorConfig {
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Make relative paths relative to `base` (the directory of the config file).
    #[must_use]
    pub fn rebase(mut self, base: &Path) -> Self {
        let join = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.spec = self.spec.map(join);
        self.output = self.output.map(join);
        self.resources = self.resources.into_iter().map(join).collect();
        self.wiring = self.wiring.into_iter().map(join).collect();
        self
    }
}

/// Resolved policy knobs used by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub operation_set: OperationSetPolicy,
    pub array_of_primitives: ArrayOfPrimitivesPolicy,
    pub alias_components: bool,
    /// Verbs tried, in order, for the Update operation.
    pub update_methods: Vec<Method>,
    /// Status codes that confirm a success response carries no body.
    pub no_content_statuses: Vec<u16>,
    pub default_wait: WaitTimeout,
    pub list_wrapper_keys: Vec<String>,
    /// Response field names that identify an asynchronous task handle.
    pub async_task_fields: Vec<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            operation_set: OperationSetPolicy::default(),
            array_of_primitives: ArrayOfPrimitivesPolicy::default(),
            alias_components: true,
            update_methods: vec![Method::PUT, Method::PATCH],
            no_content_statuses: vec![204],
            default_wait: WaitTimeout::default(),
            list_wrapper_keys: DEFAULT_LIST_WRAPPER_KEYS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            async_task_fields: ["task_id", "operation_id", "job_id"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl PolicyConfig {
    /// Fill unset keys with defaults and validate the rest.
    pub fn resolve(&self) -> anyhow::Result<Policy> {
        let defaults = Policy::default();

        let update_methods = match &self.update_methods {
            None => defaults.update_methods,
            Some(verbs) => verbs
                .iter()
                .map(|v| {
                    let upper = v.to_ascii_uppercase();
                    match upper.as_str() {
                        "PUT" => Ok(Method::PUT),
                        "PATCH" => Ok(Method::PATCH),
                        "POST" => Ok(Method::POST),
                        _ => anyhow::bail!("unsupported update method `{v}` (expected PUT, PATCH or POST)"),
                    }
                })
                .collect::<anyhow::Result<Vec<_>>>()?,
        };
        if update_methods.is_empty() {
            anyhow::bail!("policy.update_methods must not be empty");
        }

        let default_wait = match &self.default_wait {
            None => defaults.default_wait,
            Some(literal) => WaitTimeout::parse(literal)
                .with_context(|| format!("unsupported policy.default_wait `{literal}`"))?,
        };

        Ok(Policy {
            operation_set: self.operation_set.unwrap_or(defaults.operation_set),
            array_of_primitives: self
                .array_of_primitives
                .unwrap_or(defaults.array_of_primitives),
            alias_components: self.alias_components.unwrap_or(defaults.alias_components),
            update_methods,
            no_content_statuses: self
                .no_content_statuses
                .clone()
                .unwrap_or(defaults.no_content_statuses),
            default_wait,
            list_wrapper_keys: self
                .list_wrapper_keys
                .clone()
                .unwrap_or(defaults.list_wrapper_keys),
            async_task_fields: self
                .async_task_fields
                .clone()
                .unwrap_or(defaults.async_task_fields),
        })
    }
}

/// Load a configuration file.
///
/// Returns `Ok(None)` if the file does not exist, and `Err` if it exists but
/// fails to parse. Relative paths inside the file are rebased onto its
/// directory.
pub fn load_config(config_path: &Path) -> anyhow::Result<Option<GeneratorConfig>> {
    if !config_path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

    let config: GeneratorConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config: {}", config_path.display()))?;

    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(Some(config.rebase(base)))
}

/// Look for `clientgen.toml` in the same directory as the OpenAPI document.
pub fn auto_detect_config_path(spec_path: &Path) -> Option<PathBuf> {
    let spec_dir = spec_path.parent()?;
    let config_path = spec_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Resolve the config path
///
/// Priority:
/// 1. Explicitly provided path (via CLI)
/// 2. Auto-detected alongside the OpenAPI document
/// 3. None (no config)
pub fn resolve_config_path(explicit_path: Option<&Path>, spec_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }
    spec_path.and_then(auto_detect_config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
namespace = "acme"
spec = "openapi.yaml"
resources = ["src/models"]

[policy]
operation_set = "reject"
array_of_primitives = "allow"
alias_components = false
update_methods = ["patch"]
default_wait = "10m"
"#;
        let config: GeneratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.namespace(), "acme");
        assert_eq!(config.resources, vec![PathBuf::from("src/models")]);

        let policy = config.policy.resolve().unwrap();
        assert_eq!(policy.operation_set, OperationSetPolicy::Reject);
        assert_eq!(policy.array_of_primitives, ArrayOfPrimitivesPolicy::Allow);
        assert!(!policy.alias_components);
        assert_eq!(policy.update_methods, vec![Method::PATCH]);
        assert_eq!(policy.default_wait.literal(), "10m");
        assert_eq!(policy.no_content_statuses, vec![204]);
    }

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.namespace(), "clientgen");
        let policy = config.policy.resolve().unwrap();
        assert_eq!(policy, Policy::default());
        assert_eq!(policy.operation_set, OperationSetPolicy::FirstWins);
        assert_eq!(policy.array_of_primitives, ArrayOfPrimitivesPolicy::Exclude);
    }

    #[test]
    fn test_invalid_policy_values() {
        let bad_wait = PolicyConfig {
            default_wait: Some("3m".to_string()),
            ..PolicyConfig::default()
        };
        assert!(bad_wait.resolve().is_err());

        let bad_verb = PolicyConfig {
            update_methods: Some(vec!["DELETE".to_string()]),
            ..PolicyConfig::default()
        };
        assert!(bad_verb.resolve().is_err());

        assert!(toml::from_str::<GeneratorConfig>("unknown_key = 1").is_err());
    }

    #[test]
    fn test_load_and_auto_detect() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("openapi.yaml");
        assert_eq!(auto_detect_config_path(&spec), None);

        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "resources = [\"models\"]\n").unwrap();
        assert_eq!(auto_detect_config_path(&spec), Some(config_path.clone()));
        assert_eq!(
            resolve_config_path(None, Some(&spec)),
            Some(config_path.clone())
        );

        let config = load_config(&config_path).unwrap().unwrap();
        assert_eq!(config.resources, vec![dir.path().join("models")]);
        assert!(load_config(&dir.path().join("missing.toml")).unwrap().is_none());
    }
}
