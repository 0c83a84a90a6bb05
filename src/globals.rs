//! Process-wide snapshot of the bindings every new context starts from.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{json, Map, Value};

use crate::errors::ServerError;
use crate::functions::Registry;

/// Immutable starting state for contexts, captured once at startup and
/// shared as `Arc<Globals>`.
#[derive(Clone)]
pub struct Globals {
    bindings: BTreeMap<String, Value>,
    functions: Registry,
}

impl Globals {
    /// Default bindings and builtins, overlaid with `extra`.
    pub fn capture(extra: Map<String, Value>) -> Self {
        let mut bindings = BTreeMap::new();
        bindings.insert("PI".to_string(), json!(std::f64::consts::PI));
        bindings.insert("E".to_string(), json!(std::f64::consts::E));
        bindings.insert(
            "replique".to_string(),
            json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }),
        );
        bindings.extend(extra);
        Self {
            bindings,
            functions: Registry::with_builtins(),
        }
    }

    /// Reads a JSON object from `path` and captures it on top of the defaults.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let fail = |reason: String| ServerError::Globals {
            path: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        match serde_json::from_str::<Value>(&text).map_err(|e| fail(e.to_string()))? {
            Value::Object(map) => Ok(Self::capture(map)),
            other => Err(fail(format!(
                "expected a JSON object, found {}",
                crate::comparison::type_name(&other)
            ))),
        }
    }

    pub fn bindings(&self) -> &BTreeMap<String, Value> {
        &self.bindings
    }

    pub fn functions(&self) -> &Registry {
        &self.functions
    }
}

impl Default for Globals {
    fn default() -> Self {
        Self::capture(Map::new())
    }
}
