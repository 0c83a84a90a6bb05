use std::sync::Arc;

use proptest::prelude::*;
use replique::{ContextRegistry, Globals, Outcome, RegistryError};

fn registry() -> ContextRegistry {
    ContextRegistry::new(Arc::new(Globals::default()))
}

#[test]
fn default_name_and_absent_name_are_the_same_context() {
    let mut reg = registry();
    let a = reg.get(None).id();
    let b = reg.get(Some("default")).id();
    let other = reg.get(Some("other")).id();
    assert_eq!(a, b);
    assert_ne!(a, other);
    assert_eq!(reg.len(), 2);
}

#[test]
fn repeated_lookup_is_memoized() {
    let mut reg = registry();
    reg.get(Some("x")).evaluate("v = 41");
    let ctx = reg.get(Some("x"));
    assert_eq!(ctx.evaluate("v + 1"), Outcome::Success(serde_json::json!(42)));
}

#[test]
fn unique_names_without_prefix() {
    let mut reg = registry();
    assert_eq!(reg.unique_context(None).unwrap(), "1");
    assert_eq!(reg.unique_context(None).unwrap(), "2");
    let one = reg.get(Some("1")).id();
    let two = reg.get(Some("2")).id();
    assert_ne!(one, two);

    assert!(reg.get(Some("1")).evaluate("test = 1").is_success());
    let Outcome::Error(message) = reg.get(Some("2")).evaluate("test") else {
        panic!("binding leaked between contexts");
    };
    assert!(message.starts_with("ReferenceError"), "{message}");
}

#[test]
fn unique_names_with_prefix() {
    let mut reg = registry();
    assert_eq!(reg.unique_context(Some("test")).unwrap(), "test1");
    assert_eq!(reg.unique_context(Some("test")).unwrap(), "test2");
    assert_eq!(
        reg.unique_context(Some("1")),
        Err(RegistryError::InvalidPrefix { prefix: "1".into() })
    );
    assert_eq!(reg.unique_context(Some("test1-")).unwrap(), "test1-1");
}

#[test]
fn autovivified_names_advance_the_counter() {
    let mut reg = registry();
    reg.get(Some("test6"));
    assert_eq!(reg.unique_context(Some("test")).unwrap(), "test7");
}

#[test]
fn lower_autovivified_suffix_does_not_lower_counter() {
    let mut reg = registry();
    reg.get(Some("job9"));
    reg.get(Some("job3"));
    assert_eq!(reg.unique_context(Some("job")).unwrap(), "job10");
}

#[test]
fn invalid_prefix_leaves_registry_untouched() {
    let mut reg = registry();
    reg.unique_context(Some("a")).unwrap();
    let names: Vec<String> = reg.names().map(str::to_string).collect();
    assert!(reg.unique_context(Some("a7")).is_err());
    assert_eq!(reg.names().map(str::to_string).collect::<Vec<_>>(), names);
    assert_eq!(reg.unique_context(Some("a")).unwrap(), "a2");
}

#[test]
fn object_member_names_are_ordinary_names() {
    let mut reg = registry();
    for name in ["toString", "constructor", "hasOwnProperty", "__proto__"] {
        assert!(!reg.contains(name));
        let ctx = reg.get(Some(name));
        assert!(ctx.evaluate("1 + 1").is_success());
        assert!(reg.contains(name));
    }
}

#[test]
fn contexts_start_from_the_snapshot() {
    let mut extra = serde_json::Map::new();
    extra.insert("answer".into(), serde_json::json!(42));
    let mut reg = ContextRegistry::new(Arc::new(Globals::capture(extra)));
    reg.get(Some("a")).evaluate("answer = 0");
    assert_eq!(
        reg.get(Some("b")).evaluate("answer"),
        Outcome::Success(serde_json::json!(42))
    );
}

proptest! {
    #[test]
    fn unique_ids_strictly_increase(prefix in "[a-z_-]{0,6}", n in 1usize..20) {
        let mut reg = registry();
        for i in 1..=n {
            let name = reg.unique_context(Some(&prefix)).unwrap();
            prop_assert_eq!(name, format!("{prefix}{i}"));
        }
        prop_assert_eq!(reg.len(), n);
    }

    #[test]
    fn digit_terminated_prefixes_always_fail(prefix in "[a-z]{0,4}[0-9]") {
        let mut reg = registry();
        let is_invalid_prefix = matches!(
            reg.unique_context(Some(&prefix)),
            Err(RegistryError::InvalidPrefix { .. })
        );
        prop_assert!(is_invalid_prefix);
        prop_assert!(reg.is_empty());
    }

    /// Interleaving lookups and unique creation never yields a name that
    /// already existed.
    #[test]
    fn unique_names_never_collide(
        ops in prop::collection::vec(
            prop_oneof![
                ("[ab]", 0u64..30).prop_map(|(p, n)| (p, Some(n))),
                "[ab]".prop_map(|p| (p, None)),
            ],
            1..40,
        )
    ) {
        let mut reg = registry();
        for (prefix, lookup) in ops {
            match lookup {
                Some(n) => {
                    reg.get(Some(&format!("{prefix}{n}")));
                }
                None => {
                    let before = reg.len();
                    let name = reg.unique_context(Some(&prefix)).unwrap();
                    prop_assert_eq!(reg.len(), before + 1, "{} already existed", name);
                }
            }
        }
    }
}
