//! Named evaluation contexts and collision-free unique naming.
//!
//! A unique name is an arbitrary prefix that does not end in a digit,
//! followed by a decimal id without leading zeros. The registry remembers,
//! per prefix, the highest numeric suffix it has seen, whether the name was
//! generated by [`ContextRegistry::unique_context`] or merely looked up
//! (and autovivified) through [`ContextRegistry::get`]. Generated ids always
//! exceed that maximum, so a generated name never lands on an existing one.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::errors::RegistryError;
use crate::globals::Globals;

/// Name used when a request does not specify a context.
pub const DEFAULT_CONTEXT: &str = "default";

/// Owns every context of a server, keyed by name.
pub struct ContextRegistry {
    globals: Arc<Globals>,
    /// Contexts keyed by name.
    contexts: BTreeMap<String, Context>,
    /// Highest numeric suffix seen per prefix.
    unique_ids: HashMap<String, u64>,
    /// Serial for the next created context.
    next_serial: u64,
}

impl ContextRegistry {
    pub fn new(globals: Arc<Globals>) -> Self {
        Self {
            globals,
            contexts: BTreeMap::new(),
            unique_ids: HashMap::new(),
            next_serial: 1,
        }
    }

    /// Returns the context called `name` (default `"default"`), creating it
    /// on first use.
    ///
    /// Names ending in digits raise the counter of their prefix on every
    /// call, so later unique names stay clear of them.
    pub fn get(&mut self, name: Option<&str>) -> &mut Context {
        let name = name.unwrap_or(DEFAULT_CONTEXT);
        if let Some((prefix, id)) = split_numbered(name) {
            self.observe(prefix, id);
        }
        let Self {
            globals,
            contexts,
            next_serial,
            ..
        } = self;
        contexts.entry(name.to_owned()).or_insert_with(|| {
            let context = Context::new(*next_serial, &*globals);
            *next_serial += 1;
            debug!(name, serial = context.id(), "autovivified context");
            context
        })
    }

    /// Creates a fresh context named `prefix` + next id and returns the name.
    ///
    /// # Errors
    ///
    /// `InvalidPrefix` if `prefix` ends in a digit, `Exhausted` if the id for
    /// `prefix` cannot be advanced. The registry is unchanged on error.
    pub fn unique_context(&mut self, prefix: Option<&str>) -> Result<String, RegistryError> {
        let prefix = prefix.unwrap_or("");
        if prefix.ends_with(|c: char| c.is_ascii_digit()) {
            return Err(RegistryError::InvalidPrefix {
                prefix: prefix.to_owned(),
            });
        }
        let id = match self.unique_ids.get(prefix) {
            None => 1,
            Some(&last) => last.checked_add(1).ok_or_else(|| RegistryError::Exhausted {
                prefix: prefix.to_owned(),
            })?,
        };
        let name = format!("{prefix}{id}");
        let context = Context::new(self.next_serial, &self.globals);
        self.next_serial += 1;
        debug!(name = %name, serial = context.id(), "created unique context");
        self.unique_ids.insert(prefix.to_owned(), id);
        self.contexts.insert(name.clone(), context);
        Ok(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.contexts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Context names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }

    fn observe(&mut self, prefix: &str, id: u64) {
        let highest = self.unique_ids.entry(prefix.to_owned()).or_insert(id);
        if *highest < id {
            *highest = id;
        }
    }
}

/// Splits `name` into a prefix and the value of its longest run of trailing
/// ASCII digits. Suffixes too large for `u64` saturate.
fn split_numbered(name: &str) -> Option<(&str, u64)> {
    let prefix = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &name[prefix.len()..];
    if digits.is_empty() {
        return None;
    }
    let id = digits.parse::<u64>().unwrap_or(u64::MAX);
    Some((prefix, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry() -> ContextRegistry {
        ContextRegistry::new(Arc::new(Globals::default()))
    }

    #[test]
    fn split_uses_the_whole_digit_run() {
        assert_eq!(split_numbered("test06"), Some(("test", 6)));
        assert_eq!(split_numbered("a1b22"), Some(("a1b", 22)));
        assert_eq!(split_numbered("42"), Some(("", 42)));
        assert_eq!(split_numbered("test1-"), None);
        assert_eq!(split_numbered(""), None);
    }

    #[test]
    fn oversized_suffix_saturates() {
        assert_eq!(split_numbered("x99999999999999999999999"), Some(("x", u64::MAX)));
    }

    #[test]
    fn saturated_prefix_is_exhausted_without_side_effects() {
        let mut reg = registry();
        reg.get(Some("x99999999999999999999999"));
        let before = reg.len();
        assert_eq!(
            reg.unique_context(Some("x")),
            Err(RegistryError::Exhausted { prefix: "x".into() })
        );
        assert_eq!(reg.len(), before);
    }

    #[test]
    fn zero_suffix_still_starts_unique_ids_at_one() {
        let mut reg = registry();
        reg.get(Some("n0"));
        assert_eq!(reg.unique_context(Some("n")).unwrap(), "n1");
    }

    #[test]
    fn lookup_of_existing_name_still_raises_counter() {
        let mut reg = registry();
        assert_eq!(reg.unique_context(Some("w")).unwrap(), "w1");
        reg.get(Some("w1"));
        assert_eq!(reg.unique_context(Some("w")).unwrap(), "w2");
    }

    #[test]
    fn names_are_sorted() {
        let mut reg = registry();
        reg.get(Some("b"));
        reg.get(None);
        reg.get(Some("a"));
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["a", "b", "default"]);
    }
}
