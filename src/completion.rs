//! Tab completion of identifiers and member paths.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;

use crate::functions::Registry;
use crate::parser::{is_ident_char, is_ident_start};

const KEYWORDS: &[&str] = &["const", "false", "let", "null", "true", "undefined", "var"];

/// Candidates for the trailing word of an input, and the word itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub completions: Vec<String>,
    pub completed: String,
}

/// Completes the identifier or dotted path at the end of `code`.
///
/// Member paths are resolved by plain lookup; nothing is evaluated, so
/// completing never changes the context.
pub fn complete(bindings: &BTreeMap<String, Value>, functions: &Registry, code: &str) -> Completion {
    let completed = trailing_path(code);
    let completions = match completed.rsplit_once('.') {
        Some((head, partial)) => member_candidates(bindings, head, partial),
        None => bindings
            .keys()
            .cloned()
            .chain(functions.names().map(str::to_string))
            .chain(KEYWORDS.iter().map(|k| k.to_string()))
            .filter(|name| name.starts_with(completed))
            .sorted()
            .dedup()
            .collect(),
    };
    Completion {
        completions,
        completed: completed.to_string(),
    }
}

fn member_candidates(bindings: &BTreeMap<String, Value>, head: &str, partial: &str) -> Vec<String> {
    let mut segments = head.split('.');
    let Some(mut value) = segments.next().and_then(|root| bindings.get(root)) else {
        return Vec::new();
    };
    for segment in segments {
        match value.get(segment) {
            Some(next) => value = next,
            None => return Vec::new(),
        }
    }
    let keys: Vec<&str> = match value {
        Value::Object(map) => map.keys().map(String::as_str).collect(),
        Value::Array(_) | Value::String(_) => vec!["length"],
        _ => Vec::new(),
    };
    keys.into_iter()
        .filter(|key| key.starts_with(partial))
        .map(|key| format!("{head}.{key}"))
        .sorted()
        .dedup()
        .collect()
}

/// Longest suffix of `code` made of identifier characters and dots that
/// starts like an identifier.
fn trailing_path(code: &str) -> &str {
    let start = code
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c) || *c == '.')
        .last()
        .map_or(code.len(), |(i, _)| i);
    let mut path = &code[start..];
    // a path cannot begin with a digit or a dot, e.g. `1.5` or `.x`
    while let Some(c) = path.chars().next() {
        if is_ident_start(c) {
            break;
        }
        path = &path[c.len_utf8()..];
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bindings() -> BTreeMap<String, Value> {
        let mut b = BTreeMap::new();
        b.insert("user".to_string(), json!({"name": "ada", "nick": "a", "tags": ["x"]}));
        b.insert("unused".to_string(), json!(1));
        b
    }

    #[test]
    fn completes_identifiers_from_bindings_and_builtins() {
        let c = complete(&bindings(), &Registry::with_builtins(), "1 + u");
        assert_eq!(c.completed, "u");
        assert_eq!(c.completions, vec!["undefined", "unique", "unused", "upper", "user"]);
    }

    #[test]
    fn completes_member_paths() {
        let c = complete(&bindings(), &Registry::with_builtins(), "user.n");
        assert_eq!(c.completed, "user.n");
        assert_eq!(c.completions, vec!["user.name", "user.nick"]);

        let c = complete(&bindings(), &Registry::with_builtins(), "user.tags.l");
        assert_eq!(c.completions, vec!["user.tags.length"]);
    }

    #[test]
    fn unknown_heads_complete_to_nothing() {
        let c = complete(&bindings(), &Registry::with_builtins(), "nobody.x");
        assert!(c.completions.is_empty());
    }

    #[test]
    fn numeric_prefixes_are_skipped() {
        assert_eq!(trailing_path("x = 12"), "");
        assert_eq!(trailing_path("(a.b"), "a.b");
        assert_eq!(trailing_path("1.5"), "");
    }
}
