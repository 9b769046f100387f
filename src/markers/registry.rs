use crate::error::{MarkerError, RegistryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declaration kind an annotation may be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Inner (`//!`) doc comment of a source file.
    Package,
    /// Doc comment of a type declaration.
    Type,
    /// Doc comment of a struct field in a wiring file.
    Field,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Target::Package => "package",
            Target::Type => "type",
            Target::Field => "field",
        };
        f.write_str(s)
    }
}

/// Declared argument shape of a marker payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgShape {
    String,
    Int,
    Bool,
    /// Accepted verbatim.
    Any,
    List { item: Box<ArgShape> },
    Map { key: Box<ArgShape>, value: Box<ArgShape> },
    /// The payload may be absent.
    Optional { inner: Box<ArgShape> },
}

impl ArgShape {
    pub fn list(item: ArgShape) -> Self {
        ArgShape::List {
            item: Box::new(item),
        }
    }

    pub fn map(key: ArgShape, value: ArgShape) -> Self {
        ArgShape::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn optional(inner: ArgShape) -> Self {
        ArgShape::Optional {
            inner: Box::new(inner),
        }
    }

    /// Check that nested shapes are usable. Map keys must be strings and
    /// `Optional` only makes sense at the top level.
    fn validate(&self, marker: &str, top_level: bool) -> Result<(), RegistryError> {
        match self {
            ArgShape::String | ArgShape::Int | ArgShape::Bool | ArgShape::Any => Ok(()),
            ArgShape::List { item } => item.validate(marker, false),
            ArgShape::Map { key, value } => {
                if **key != ArgShape::String {
                    return Err(RegistryError::UnsupportedKeyType {
                        marker: marker.to_string(),
                        found: key.to_string(),
                    });
                }
                value.validate(marker, false)
            }
            ArgShape::Optional { inner } => {
                if !top_level || matches!(**inner, ArgShape::Optional { .. }) {
                    return Err(RegistryError::UnsupportedNestedShape {
                        marker: marker.to_string(),
                        found: self.to_string(),
                    });
                }
                inner.validate(marker, false)
            }
        }
    }

    fn parse(&self, raw: &str) -> Result<MarkerValue, MarkerError> {
        let invalid = || MarkerError::InvalidPayload {
            payload: raw.to_string(),
            expected: self.to_string(),
        };
        match self {
            ArgShape::String => Ok(MarkerValue::String(raw.to_string())),
            ArgShape::Any => Ok(MarkerValue::Any(raw.to_string())),
            ArgShape::Int => raw.trim().parse().map(MarkerValue::Int).map_err(|_| invalid()),
            ArgShape::Bool => match raw.trim() {
                "true" => Ok(MarkerValue::Bool(true)),
                "false" => Ok(MarkerValue::Bool(false)),
                _ => Err(invalid()),
            },
            ArgShape::List { item } => raw
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| item.parse(s))
                .collect::<Result<Vec<_>, _>>()
                .map(MarkerValue::List),
            ArgShape::Map { value, .. } => {
                let mut out = BTreeMap::new();
                for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    let (k, v) = pair.split_once(':').ok_or_else(invalid)?;
                    out.insert(k.trim().to_string(), value.parse(v.trim())?);
                }
                Ok(MarkerValue::Map(out))
            }
            ArgShape::Optional { inner } => inner.parse(raw),
        }
    }
}

impl fmt::Display for ArgShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgShape::String => f.write_str("string"),
            ArgShape::Int => f.write_str("int"),
            ArgShape::Bool => f.write_str("bool"),
            ArgShape::Any => f.write_str("any"),
            ArgShape::List { item } => write!(f, "list<{item}>"),
            ArgShape::Map { key, value } => write!(f, "map<{key}, {value}>"),
            ArgShape::Optional { inner } => write!(f, "optional<{inner}>"),
        }
    }
}

/// A parsed marker payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MarkerValue {
    /// No payload was given for an optional marker.
    Absent,
    String(String),
    Int(i64),
    Bool(bool),
    Any(String),
    List(Vec<MarkerValue>),
    Map(BTreeMap<String, MarkerValue>),
}

impl MarkerValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MarkerValue::String(s) | MarkerValue::Any(s) => Some(s),
            _ => None,
        }
    }
}

/// One registered marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerDefinition {
    pub name: String,
    pub target: Target,
    pub shape: ArgShape,
    pub description: String,
}

impl MarkerDefinition {
    /// Parse a payload according to [`MarkerDefinition::shape`].
    pub fn parse_value(&self, raw: Option<&str>) -> Result<MarkerValue, MarkerError> {
        match (raw.map(str::trim).filter(|s| !s.is_empty()), &self.shape) {
            (None, ArgShape::Optional { .. }) => Ok(MarkerValue::Absent),
            (None, _) => Err(MarkerError::MissingPayload(self.name.clone())),
            (Some(raw), shape) => shape.parse(raw),
        }
    }
}

/// Name/target → definition map for every annotation the engine understands.
///
/// Built once before discovery and passed by reference afterwards.
#[derive(Debug, Clone, Default)]
pub struct MarkerRegistry {
    definitions: BTreeMap<(String, Target), MarkerDefinition>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in markers of `namespace`.
    pub fn with_defaults(namespace: &str) -> Result<Self, RegistryError> {
        let mut reg = Self::new();
        let ns = |feature: &str| format!("{namespace}:{feature}");

        reg.register(
            &ns("ops"),
            Target::Type,
            ArgShape::String,
            "CRUD operation set (letters C, L, R, U, D) and resource path",
        )?;
        for target in [Target::Type, Target::Field] {
            reg.register(
                &ns("extraMethod"),
                target,
                ArgShape::String,
                "non-CRUD method: verb list and path template",
            )?;
            reg.register(
                &ns("asyncExtraMethod"),
                target,
                ArgShape::String,
                "asynchronous non-CRUD method with an optional wait option",
            )?;
        }
        reg.register(
            &ns("requestUrl"),
            Target::Type,
            ArgShape::String,
            "operation whose request body types the resource request model",
        )?;
        reg.register(
            &ns("responseUrl"),
            Target::Type,
            ArgShape::String,
            "operation whose response types the resource model",
        )?;
        reg.register(
            &ns("details"),
            Target::Type,
            ArgShape::String,
            "legacy: resource supports Read at this path",
        )?;
        reg.register(
            &ns("upsert"),
            Target::Type,
            ArgShape::String,
            "legacy: resource supports Create and Update at this path",
        )?;
        reg.register(
            &ns("basePath"),
            Target::Package,
            ArgShape::String,
            "path prefix applied to every path declared in the file",
        )?;
        reg.register(
            &ns("skip"),
            Target::Type,
            ArgShape::optional(ArgShape::Bool),
            "exclude the type from generation",
        )?;
        Ok(reg)
    }

    /// Register a marker. Re-registering an identical definition is a no-op.
    pub fn register(
        &mut self,
        name: &str,
        target: Target,
        shape: ArgShape,
        description: &str,
    ) -> Result<(), RegistryError> {
        if name.is_empty() || name.starts_with('+') || name.contains('=') {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        shape.validate(name, true)?;

        let def = MarkerDefinition {
            name: name.to_string(),
            target,
            shape,
            description: description.to_string(),
        };
        let key = (name.to_string(), target);
        match self.definitions.get(&key) {
            Some(existing) if *existing == def => Ok(()),
            Some(_) => Err(RegistryError::ConflictingDefinition {
                marker: name.to_string(),
                target: target.to_string(),
            }),
            None => {
                self.definitions.insert(key, def);
                Ok(())
            }
        }
    }

    /// Find the definition an annotation refers to.
    ///
    /// Accepts full annotation text (`+ns:feature:ARGS[opt(v)]=payload`) or a
    /// bare name. The longest registered `:`-prefix wins. A marker registered
    /// only for another target is reported as not found.
    pub fn lookup(&self, text: &str, target: Target) -> Option<&MarkerDefinition> {
        let text = text.trim();
        let text = text.strip_prefix('+').unwrap_or(text);
        let name = text.split_once('=').map_or(text, |(n, _)| n);
        let name = name.split_once('[').map_or(name, |(n, _)| n).trim();

        let mut candidate = name;
        loop {
            if let Some(def) = self.definitions.get(&(candidate.to_string(), target)) {
                return Some(def);
            }
            candidate = candidate.rsplit_once(':')?.0;
        }
    }

    pub fn definitions(&self) -> impl Iterator<Item = &MarkerDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MarkerRegistry {
        MarkerRegistry::with_defaults("clientgen").unwrap()
    }

    #[test]
    fn test_lookup_strips_sigil_option_and_payload() {
        let reg = registry();
        let def = reg
            .lookup(
                "+clientgen:asyncExtraMethod:POST[wait(10m)]=/widgets/{id}/rebuild",
                Target::Type,
            )
            .unwrap();
        assert_eq!(def.name, "clientgen:asyncExtraMethod");
    }

    #[test]
    fn test_lookup_uses_longest_prefix() {
        let mut reg = registry();
        reg.register("clientgen:ops:special", Target::Type, ArgShape::Any, "x")
            .unwrap();
        assert_eq!(
            reg.lookup("+clientgen:ops:special=/a", Target::Type).unwrap().name,
            "clientgen:ops:special"
        );
        assert_eq!(
            reg.lookup("+clientgen:ops:CRUD=/a", Target::Type).unwrap().name,
            "clientgen:ops"
        );
    }

    #[test]
    fn test_lookup_with_wrong_target_is_not_found() {
        let reg = registry();
        assert!(reg.lookup("+clientgen:ops:CRUD=/a", Target::Field).is_none());
        assert!(reg.lookup("+clientgen:basePath=/v1", Target::Package).is_some());
        assert!(reg.lookup("+clientgen:basePath=/v1", Target::Type).is_none());
        assert!(reg.lookup("+other:ops:CRUD=/a", Target::Type).is_none());
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut reg = registry();
        let before = reg.len();
        reg.register(
            "clientgen:ops",
            Target::Type,
            ArgShape::String,
            "CRUD operation set (letters C, L, R, U, D) and resource path",
        )
        .unwrap();
        assert_eq!(reg.len(), before);
    }

    #[test]
    fn test_conflicting_definition_fails() {
        let mut reg = registry();
        let err = reg
            .register("clientgen:ops", Target::Type, ArgShape::Int, "other")
            .unwrap_err();
        assert!(matches!(err, RegistryError::ConflictingDefinition { .. }));
    }

    #[test]
    fn test_map_keys_must_be_strings() {
        let mut reg = MarkerRegistry::new();
        let err = reg
            .register(
                "ns:labels",
                Target::Type,
                ArgShape::map(ArgShape::Int, ArgShape::String),
                "labels",
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedKeyType { .. }));
        reg.register(
            "ns:labels",
            Target::Type,
            ArgShape::map(ArgShape::String, ArgShape::list(ArgShape::Int)),
            "labels",
        )
        .unwrap();
    }

    #[test]
    fn test_nested_optional_is_rejected() {
        let mut reg = MarkerRegistry::new();
        let err = reg
            .register(
                "ns:x",
                Target::Type,
                ArgShape::list(ArgShape::optional(ArgShape::Int)),
                "x",
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedNestedShape { .. }));
    }

    #[test]
    fn test_invalid_names() {
        let mut reg = MarkerRegistry::new();
        for name in ["", "+ns:x", "ns:x=1"] {
            assert!(matches!(
                reg.register(name, Target::Type, ArgShape::Any, ""),
                Err(RegistryError::InvalidName(_))
            ));
        }
    }

    #[test]
    fn test_parse_value_by_shape() {
        let def = |shape| MarkerDefinition {
            name: "ns:x".to_string(),
            target: Target::Type,
            shape,
            description: String::new(),
        };
        assert_eq!(
            def(ArgShape::optional(ArgShape::Bool)).parse_value(None).unwrap(),
            MarkerValue::Absent
        );
        assert_eq!(
            def(ArgShape::optional(ArgShape::Bool))
                .parse_value(Some("true"))
                .unwrap(),
            MarkerValue::Bool(true)
        );
        assert_eq!(
            def(ArgShape::list(ArgShape::Int))
                .parse_value(Some("1; 2;3"))
                .unwrap(),
            MarkerValue::List(vec![
                MarkerValue::Int(1),
                MarkerValue::Int(2),
                MarkerValue::Int(3)
            ])
        );
        let map = def(ArgShape::map(ArgShape::String, ArgShape::Int))
            .parse_value(Some("a:1,b:2"))
            .unwrap();
        let MarkerValue::Map(m) = map else {
            panic!("expected map");
        };
        assert_eq!(m.get("b"), Some(&MarkerValue::Int(2)));
        assert!(def(ArgShape::String).parse_value(None).is_err());
        assert!(def(ArgShape::Int).parse_value(Some("ten")).is_err());
    }
}
