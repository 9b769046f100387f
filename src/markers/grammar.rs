use crate::error::MarkerError;
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// `+<name>[<option>]=<payload>`; the name carries namespace, feature and arguments.
#[allow(clippy::expect_used)]
static ANNOTATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+(?P<name>[^=\[\]]+?)(?:\[(?P<option>[^\]]*)\])?(?:=(?P<payload>.*))?$")
        .expect("annotation regex should be valid")
});

/// `<option>(<value>)` inside the bracket suffix.
#[allow(clippy::expect_used)]
static OPTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<key>[A-Za-z][A-Za-z0-9_]*)\((?P<value>[^()]*)\)$")
        .expect("option regex should be valid")
});

/// HTTP verbs accepted in extra-method and URL-override annotations.
pub const SUPPORTED_VERBS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Recognised annotation features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    Ops,
    ExtraMethod,
    AsyncExtraMethod,
    RequestUrl,
    ResponseUrl,
    Details,
    Upsert,
    BasePath,
    Skip,
    Unknown(String),
}

impl Feature {
    fn classify(name: &str) -> Self {
        match name {
            "ops" => Feature::Ops,
            "extraMethod" => Feature::ExtraMethod,
            "asyncExtraMethod" => Feature::AsyncExtraMethod,
            "requestUrl" => Feature::RequestUrl,
            "responseUrl" => Feature::ResponseUrl,
            "details" => Feature::Details,
            "upsert" => Feature::Upsert,
            "basePath" => Feature::BasePath,
            "skip" => Feature::Skip,
            other => Feature::Unknown(other.to_string()),
        }
    }
}

/// Bracketed option suffix, e.g. `[wait(10m)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerOption {
    pub name: String,
    pub value: String,
}

/// One annotation split into its grammar parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMarker {
    /// Annotation text as written, used in diagnostics.
    pub raw: String,
    pub namespace: String,
    pub feature: Feature,
    /// Everything after the feature segment, e.g. `CRUD` or `POST|PUT`.
    pub args: Option<String>,
    pub option: Option<MarkerOption>,
    pub payload: Option<String>,
}

impl ParsedMarker {
    pub fn parse(text: &str) -> Result<Self, MarkerError> {
        let text = text.trim();
        if !text.starts_with('+') {
            return Err(MarkerError::MissingSigil(text.to_string()));
        }
        let caps = ANNOTATION_REGEX
            .captures(text)
            .ok_or_else(|| MarkerError::MalformedOption {
                text: text.to_string(),
            })?;

        let name = caps.name("name").map_or("", |m| m.as_str()).trim();
        let mut segments = name.splitn(3, ':');
        let namespace = segments.next().unwrap_or_default().trim();
        let feature = segments
            .next()
            .map(str::trim)
            .filter(|f| !namespace.is_empty() && !f.is_empty())
            .ok_or_else(|| MarkerError::MissingFeature(text.to_string()))?;
        let args = segments
            .next()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        let option = match caps.name("option") {
            None => None,
            Some(m) => {
                let opt = OPTION_REGEX.captures(m.as_str().trim()).ok_or_else(|| {
                    MarkerError::MalformedOption {
                        text: text.to_string(),
                    }
                })?;
                Some(MarkerOption {
                    name: opt["key"].to_string(),
                    value: opt["value"].trim().to_string(),
                })
            }
        };

        let payload = caps
            .name("payload")
            .map(|m| m.as_str().trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(ParsedMarker {
            raw: text.to_string(),
            namespace: namespace.to_string(),
            feature: Feature::classify(feature),
            args,
            option,
            payload,
        })
    }

    /// `<namespace>:<feature>` as registered in the marker registry.
    pub fn marker_name(&self) -> String {
        let feature = match &self.feature {
            Feature::Ops => "ops",
            Feature::ExtraMethod => "extraMethod",
            Feature::AsyncExtraMethod => "asyncExtraMethod",
            Feature::RequestUrl => "requestUrl",
            Feature::ResponseUrl => "responseUrl",
            Feature::Details => "details",
            Feature::Upsert => "upsert",
            Feature::BasePath => "basePath",
            Feature::Skip => "skip",
            Feature::Unknown(name) => name,
        };
        format!("{}:{feature}", self.namespace)
    }

    /// The verb list in [`ParsedMarker::args`], split on `|`.
    pub fn verbs(&self) -> Result<Vec<Method>, MarkerError> {
        let Some(args) = self.args.as_deref() else {
            return Err(MarkerError::UnsupportedVerb {
                verb: String::new(),
                text: self.raw.clone(),
            });
        };
        let mut verbs: Vec<Method> = Vec::new();
        for verb in args.split('|').map(str::trim) {
            let upper = verb.to_ascii_uppercase();
            if !SUPPORTED_VERBS.contains(&upper.as_str()) {
                return Err(MarkerError::UnsupportedVerb {
                    verb: verb.to_string(),
                    text: self.raw.clone(),
                });
            }
            let method = Method::from_bytes(upper.as_bytes()).map_err(|_| {
                MarkerError::UnsupportedVerb {
                    verb: verb.to_string(),
                    text: self.raw.clone(),
                }
            })?;
            if !verbs.contains(&method) {
                verbs.push(method);
            }
        }
        Ok(verbs)
    }

    /// The payload, or [`MarkerError::MissingPayload`].
    pub fn require_payload(&self) -> Result<&str, MarkerError> {
        self.payload
            .as_deref()
            .ok_or_else(|| MarkerError::MissingPayload(self.raw.clone()))
    }
}

/// Supported `[wait(...)]` literals and their length in seconds.
pub const WAIT_TIMEOUTS: [(&str, u64); 10] = [
    ("30s", 30),
    ("1m", 60),
    ("2m", 120),
    ("5m", 300),
    ("10m", 600),
    ("15m", 900),
    ("20m", 1200),
    ("30m", 1800),
    ("1h", 3600),
    ("2h", 7200),
];

/// Wait timeout of an asynchronous extra method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WaitTimeout {
    literal: &'static str,
    seconds: u64,
}

impl WaitTimeout {
    /// Parse one of the [`WAIT_TIMEOUTS`] literals.
    pub fn parse(literal: &str) -> Option<Self> {
        let literal = literal.trim();
        WAIT_TIMEOUTS
            .iter()
            .find(|(l, _)| *l == literal)
            .map(|&(literal, seconds)| WaitTimeout { literal, seconds })
    }

    pub fn literal(&self) -> &'static str {
        self.literal
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }
}

impl Default for WaitTimeout {
    fn default() -> Self {
        WaitTimeout {
            literal: "5m",
            seconds: 300,
        }
    }
}

impl fmt::Display for WaitTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ops_marker() {
        let m = ParsedMarker::parse("+clientgen:ops:CRUD=/widgets").unwrap();
        assert_eq!(m.namespace, "clientgen");
        assert_eq!(m.feature, Feature::Ops);
        assert_eq!(m.args.as_deref(), Some("CRUD"));
        assert_eq!(m.payload.as_deref(), Some("/widgets"));
        assert_eq!(m.option, None);
        assert_eq!(m.marker_name(), "clientgen:ops");
    }

    #[test]
    fn test_parse_option_suffix() {
        let m = ParsedMarker::parse("+clientgen:asyncExtraMethod:POST[wait(10m)]=/widgets/{id}/rebuild")
            .unwrap();
        assert_eq!(m.feature, Feature::AsyncExtraMethod);
        assert_eq!(
            m.option,
            Some(MarkerOption {
                name: "wait".to_string(),
                value: "10m".to_string()
            })
        );
        assert_eq!(m.payload.as_deref(), Some("/widgets/{id}/rebuild"));
    }

    #[test]
    fn test_multi_verb_list() {
        let m = ParsedMarker::parse("+clientgen:extraMethod:POST|put=/widgets/{id}/restart").unwrap();
        assert_eq!(m.verbs().unwrap(), vec![Method::POST, Method::PUT]);
    }

    #[test]
    fn test_unsupported_verb() {
        let m = ParsedMarker::parse("+clientgen:extraMethod:FETCH=/x").unwrap();
        assert!(matches!(m.verbs(), Err(MarkerError::UnsupportedVerb { .. })));
        let m = ParsedMarker::parse("+clientgen:extraMethod=/x").unwrap();
        assert!(m.verbs().is_err());
    }

    #[test]
    fn test_grammar_errors() {
        assert!(matches!(
            ParsedMarker::parse("clientgen:ops:CRUD=/a"),
            Err(MarkerError::MissingSigil(_))
        ));
        assert!(matches!(
            ParsedMarker::parse("+ops=/a"),
            Err(MarkerError::MissingFeature(_))
        ));
        assert!(matches!(
            ParsedMarker::parse("+clientgen:asyncExtraMethod:POST[wait 10m]=/a"),
            Err(MarkerError::MalformedOption { .. })
        ));
        assert!(matches!(
            ParsedMarker::parse("+clientgen:asyncExtraMethod:POST[wait(10m)=/a"),
            Err(MarkerError::MalformedOption { .. })
        ));
    }

    #[test]
    fn test_skip_without_payload() {
        let m = ParsedMarker::parse("+clientgen:skip").unwrap();
        assert_eq!(m.feature, Feature::Skip);
        assert_eq!(m.payload, None);
        assert!(m.require_payload().is_err());
    }

    #[test]
    fn test_wait_timeouts() {
        assert_eq!(WaitTimeout::parse("10m").unwrap().seconds(), 600);
        assert_eq!(WaitTimeout::parse("2h").unwrap().literal(), "2h");
        assert_eq!(WaitTimeout::parse("3m"), None);
        assert_eq!(WaitTimeout::default().seconds(), 300);
    }
}
