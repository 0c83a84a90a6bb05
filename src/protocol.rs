//! Request and reply messages exchanged with clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::parser::{is_ident_char, is_ident_start};

/// A decoded client request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Request {
    pub fn new(command: &str, context: Option<&str>, code: Option<&str>) -> Self {
        Self {
            command: command.to_string(),
            context: context.map(str::to_string),
            code: code.map(str::to_string),
        }
    }
}

/// The commands a server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Evaluate,
    Complete,
    UniqueContext,
}

impl Command {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "evaluate" => Some(Command::Evaluate),
            "complete" => Some(Command::Complete),
            "uniqueContext" => Some(Command::UniqueContext),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultKind {
    Success,
    Error,
    SyntaxError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    UnknownCommand,
    MalformedRequest,
    InvalidPrefix,
    Exhausted,
}

/// A reply, tagged by `command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Reply {
    Evaluate {
        result: ResultKind,
        value: String,
    },
    Complete {
        completions: Vec<String>,
        completed: String,
    },
    UniqueContext {
        context: String,
    },
    Error {
        error: ErrorKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request: Option<String>,
    },
}

impl Reply {
    pub fn error(error: ErrorKind, message: impl Into<String>, request: Option<&str>) -> Self {
        Reply::Error {
            error,
            message: message.into(),
            request: request.map(str::to_string),
        }
    }
}

/// Renders an evaluation result the way an interactive inspector would:
/// strings single-quoted, objects as `{ key: value }`, arrays as `[ a, b ]`.
pub fn inspect(value: &Value) -> String {
    let mut out = String::new();
    write_inspect(&mut out, value);
    out
}

fn write_inspect(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => write_quoted(out, s),
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Array(items) => {
            out.push_str("[ ");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_inspect(out, item);
            }
            out.push_str(" ]");
        }
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Object(map) => {
            out.push_str("{ ");
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if is_plain_key(key) {
                    out.push_str(key);
                } else {
                    write_quoted(out, key);
                }
                out.push_str(": ");
                write_inspect(out, item);
            }
            out.push_str(" }");
        }
        other => out.push_str(&other.to_string()),
    }
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_char)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn inspect_matches_repl_style() {
        assert_eq!(inspect(&json!("it's")), r"'it\'s'");
        assert_eq!(inspect(&json!([1, "a", null])), "[ 1, 'a', null ]");
        assert_eq!(inspect(&json!({"a": 1, "b c": {}})), "{ a: 1, 'b c': {} }");
        assert_eq!(inspect(&json!([])), "[]");
    }

    #[test]
    fn replies_are_tagged_by_command() {
        let reply = Reply::UniqueContext { context: "test1".into() };
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"command": "uniqueContext", "context": "test1"})
        );
        let reply = Reply::Evaluate {
            result: ResultKind::SyntaxError,
            value: "x\n".into(),
        };
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"command": "evaluate", "result": "syntaxError", "value": "x\n"})
        );
    }

    #[test]
    fn request_fields_are_optional() {
        let req: Request = serde_json::from_str(r#"{"command": "evaluate"}"#).unwrap();
        assert_eq!(req, Request::new("evaluate", None, None));
    }
}
