//! Deterministic naming for generated types and fields.

use std::collections::BTreeSet;

const KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn",
];

/// Convert a snake/kebab/dotted string to CamelCase
///
/// Existing capitals inside a word are kept, so `widgetID` becomes `WidgetID`.
///
/// ```rust,ignore
/// assert_eq!(to_camel_case("user_profile"), "UserProfile");
/// ```
pub fn to_camel_case(s: &str) -> String {
    s.split(|c: char| !c.is_ascii_alphanumeric())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Convert a string to snake_case
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else if ch == '-' || ch == ' ' || ch == '.' {
            if !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
        } else {
            result.push(ch);
        }
    }

    result
}

fn sanitize_rust_identifier(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

/// Snake-case a property key and make it a valid Rust identifier.
pub fn field_name(key: &str) -> String {
    // Replace invalid identifier characters with underscores and ensure it doesn't start with a digit.
    let mut s: String = to_snake_case(key)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.is_empty() {
        s = "_".to_string();
    }
    if s.starts_with(|c: char| c.is_ascii_digit()) {
        s.insert(0, '_');
    }
    sanitize_rust_identifier(&s)
}

/// Collapse runs of the same delimiter (`_`, `-`, `.`) so that `policy__id`
/// and `policy_id` compare equal.
pub fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        let is_delim = matches!(ch, '_' | '-' | '.');
        if is_delim && out.ends_with(ch) {
            continue;
        }
        out.push(ch);
    }
    out
}

/// Return `name`, or `name_N` for the first free `N`, and mark it taken.
pub fn unique_name(seen: &mut BTreeSet<String>, name: &str) -> String {
    if seen.insert(name.to_string()) {
        return name.to_string();
    }
    let mut counter = 1;
    loop {
        let candidate = format!("{name}_{counter}");
        if seen.insert(candidate.clone()) {
            tracing::warn!(name, %candidate, "duplicate generated name");
            return candidate;
        }
        counter += 1;
    }
}

/// Last literal (non-`{param}`) segment of a path template.
pub fn last_literal_segment(path: &str) -> Option<&str> {
    path.split('/')
        .rev()
        .find(|seg| !seg.is_empty() && !(seg.starts_with('{') && seg.ends_with('}')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("user_profile"), "UserProfile");
        assert_eq!(to_camel_case("policy-id"), "PolicyId");
        assert_eq!(to_camel_case("widgetID"), "WidgetID");
        assert_eq!(to_camel_case("a.b c"), "ABC");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("createdAt"), "created_at");
        assert_eq!(to_snake_case("HTTPStatus"), "http_status");
        assert_eq!(to_snake_case("policy-id"), "policy_id");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("ipV4"), "ip_v4");
    }

    #[test]
    fn test_field_name_sanitises() {
        assert_eq!(field_name("type"), "r#type");
        assert_eq!(field_name("2fa"), "_2fa");
        assert_eq!(field_name("x/y"), "x_y");
        assert_eq!(field_name(""), "_");
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("policy__id"), "policy_id");
        assert_eq!(normalize_key("a--b..c"), "a-b.c");
        assert_eq!(normalize_key("a_-b"), "a_-b");
    }

    #[test]
    fn test_unique_name() {
        let mut seen = BTreeSet::new();
        assert_eq!(unique_name(&mut seen, "foo"), "foo");
        assert_eq!(unique_name(&mut seen, "foo"), "foo_1");
        assert_eq!(unique_name(&mut seen, "foo"), "foo_2");
    }

    #[test]
    fn test_last_literal_segment() {
        assert_eq!(last_literal_segment("/widgets/{id}/restart"), Some("restart"));
        assert_eq!(last_literal_segment("/widgets/{id}"), Some("widgets"));
        assert_eq!(last_literal_segment("/"), None);
    }
}
