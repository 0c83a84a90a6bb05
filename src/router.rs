use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::engine::Outcome;
use crate::errors::RegistryError;
use crate::globals::Globals;
use crate::protocol::{inspect, Command, ErrorKind, Reply, Request, ResultKind};
use crate::registry::ContextRegistry;

/// Dispatches requests to the contexts it owns.
///
/// Every request is handled to completion before the next one, so the
/// registry needs no locking of its own.
pub struct Router {
    contexts: ContextRegistry,
}

impl Router {
    pub fn new(globals: Arc<Globals>) -> Self {
        Self {
            contexts: ContextRegistry::new(globals),
        }
    }

    pub fn contexts(&self) -> &ContextRegistry {
        &self.contexts
    }

    /// Handles a parsed JSON document that is expected to be a request.
    pub fn reply_value(&mut self, raw: Value) -> Reply {
        match serde_json::from_value::<Request>(raw) {
            Ok(request) => self.reply(&request),
            Err(e) => {
                warn!(error = %e, "request does not match the request schema");
                Reply::error(ErrorKind::MalformedRequest, format!("invalid request: {e}"), None)
            }
        }
    }

    pub fn reply(&mut self, request: &Request) -> Reply {
        debug!(?request, "parsed request");
        let Some(command) = Command::parse(&request.command) else {
            warn!(command = %request.command, "unknown command");
            return Reply::error(
                ErrorKind::UnknownCommand,
                format!("unknown command {:?}", request.command),
                Some(&request.command),
            );
        };
        let code = request.code.as_deref().unwrap_or("");
        match command {
            Command::Evaluate => self.evaluate(request.context.as_deref(), code),
            Command::Complete => self.complete(request.context.as_deref(), code),
            Command::UniqueContext => self.unique_context(request.context.as_deref()),
        }
    }

    fn evaluate(&mut self, context: Option<&str>, code: &str) -> Reply {
        let outcome = self.contexts.get(context).evaluate(code);
        let (result, value) = match outcome {
            Outcome::Success(v) => (ResultKind::Success, format_value(&v)),
            Outcome::Error(msg) => (ResultKind::Error, format_message(&msg)),
            Outcome::SyntaxError(msg) => (ResultKind::SyntaxError, format_message(&msg)),
        };
        Reply::Evaluate { result, value }
    }

    fn complete(&mut self, context: Option<&str>, code: &str) -> Reply {
        let completion = self.contexts.get(context).complete(code);
        Reply::Complete {
            completions: completion.completions,
            completed: completion.completed,
        }
    }

    fn unique_context(&mut self, prefix: Option<&str>) -> Reply {
        match self.contexts.unique_context(prefix) {
            Ok(context) => Reply::UniqueContext { context },
            Err(e) => {
                let kind = match e {
                    RegistryError::InvalidPrefix { .. } => ErrorKind::InvalidPrefix,
                    RegistryError::Exhausted { .. } => ErrorKind::Exhausted,
                };
                Reply::error(kind, e.to_string(), Some("uniqueContext"))
            }
        }
    }
}

fn format_value(value: &Value) -> String {
    format!("{}\n", inspect(value))
}

fn format_message(message: &str) -> String {
    format!("{message}\n")
}
