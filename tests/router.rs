use std::sync::Arc;

use pretty_assertions::assert_eq;
use replique::protocol::{ErrorKind, Reply, Request, ResultKind};
use replique::{Globals, Router};
use serde_json::json;

fn router() -> Router {
    Router::new(Arc::new(Globals::default()))
}

fn evaluate(router: &mut Router, context: Option<&str>, code: &str) -> Reply {
    router.reply(&Request::new("evaluate", context, Some(code)))
}

#[test]
fn evaluate_formats_values() {
    let mut r = router();
    assert_eq!(
        evaluate(&mut r, None, "{name: 'ada', langs: ['en', 'fr']}"),
        Reply::Evaluate {
            result: ResultKind::Success,
            value: "{ langs: [ 'en', 'fr' ], name: 'ada' }\n".into(),
        }
    );
}

#[test]
fn evaluate_reports_runtime_and_syntax_errors() {
    let mut r = router();
    assert_eq!(
        evaluate(&mut r, None, "missing"),
        Reply::Evaluate {
            result: ResultKind::Error,
            value: "ReferenceError: missing is not defined\n".into(),
        }
    );
    let Reply::Evaluate { result, .. } = evaluate(&mut r, None, "1 +") else {
        panic!("expected evaluate reply");
    };
    assert_eq!(result, ResultKind::SyntaxError);
}

#[test]
fn state_persists_per_named_context() {
    let mut r = router();
    evaluate(&mut r, Some("left"), "let n = 1");
    evaluate(&mut r, Some("left"), "n = n + 1");
    assert_eq!(
        evaluate(&mut r, Some("left"), "n"),
        Reply::Evaluate {
            result: ResultKind::Success,
            value: "2\n".into(),
        }
    );
    let Reply::Evaluate { result, .. } = evaluate(&mut r, Some("right"), "n") else {
        panic!("expected evaluate reply");
    };
    assert_eq!(result, ResultKind::Error);
}

#[test]
fn complete_uses_context_bindings() {
    let mut r = router();
    evaluate(&mut r, Some("c"), "config = {port: 1, path: '/'}");
    assert_eq!(
        r.reply(&Request::new("complete", Some("c"), Some("config.p"))),
        Reply::Complete {
            completions: vec!["config.path".into(), "config.port".into()],
            completed: "config.p".into(),
        }
    );
    let Reply::Complete { completions, .. } = r.reply(&Request::new("complete", None, Some("conf"))) else {
        panic!("expected complete reply");
    };
    assert!(completions.is_empty(), "default context saw {completions:?}");
}

#[test]
fn unique_context_replies_with_name() {
    let mut r = router();
    let reply = r.reply(&Request::new("uniqueContext", Some("repl"), None));
    assert_eq!(serde_json::to_value(&reply).unwrap(), json!({"command": "uniqueContext", "context": "repl1"}));
    assert!(r.contexts().contains("repl1"));
}

#[test]
fn unique_context_with_bad_prefix_is_an_error_reply() {
    let mut r = router();
    let reply = r.reply(&Request::new("uniqueContext", Some("v2"), None));
    let Reply::Error { error, request, .. } = reply else {
        panic!("expected error reply");
    };
    assert_eq!(error, ErrorKind::InvalidPrefix);
    assert_eq!(request.as_deref(), Some("uniqueContext"));
    assert!(r.contexts().is_empty());
}

#[test]
fn unknown_command_is_rejected_without_touching_contexts() {
    let mut r = router();
    let reply = r.reply_value(json!({"command": "delete", "context": "x"}));
    assert_eq!(
        serde_json::to_value(&reply).unwrap(),
        json!({
            "command": "error",
            "error": "unknownCommand",
            "message": "unknown command \"delete\"",
            "request": "delete",
        })
    );
    assert!(r.contexts().is_empty());
}
