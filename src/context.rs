use std::collections::BTreeMap;

use serde_json::Value;

use crate::completion::{self, Completion};
use crate::engine::{self, Outcome};
use crate::functions::Registry;
use crate::globals::Globals;

/// An isolated evaluation environment.
///
/// Bindings are copied from the global snapshot at creation and owned
/// exclusively by this context; the builtin table is shared read-only.
pub struct Context {
    id: u64,
    bindings: BTreeMap<String, Value>,
    functions: Registry,
}

impl Context {
    pub fn new(id: u64, globals: &Globals) -> Self {
        Self {
            id,
            bindings: globals.bindings().clone(),
            functions: globals.functions().clone(),
        }
    }

    /// Serial number assigned by the owning registry; unique per registry.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn evaluate(&mut self, code: &str) -> Outcome {
        engine::run(&mut self.bindings, &self.functions, code)
    }

    pub fn complete(&self, code: &str) -> Completion {
        completion::complete(&self.bindings, &self.functions, code)
    }

    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("bindings", &self.bindings.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evaluation_mutates_only_own_bindings() {
        let globals = Globals::default();
        let mut a = Context::new(1, &globals);
        let b = Context::new(2, &globals);
        assert!(a.evaluate("PI = 3").is_success());
        assert_eq!(a.binding("PI"), Some(&json!(3)));
        assert_eq!(b.binding("PI"), Some(&json!(std::f64::consts::PI)));
        assert_eq!(globals.bindings()["PI"], json!(std::f64::consts::PI));
    }
}
